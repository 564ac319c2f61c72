//! Producer side of the shared-memory inference bridge
//!
//! This crate provides the half of the slot contract the real-time
//! application owes the bridge:
//! - Requests are written as one complete file (temp file + rename)
//! - A new request is only written once the previous response was taken
//! - Responses are read at their exact length and deleted after the read

use shm_bridge::{SlotConfig, temp_path_for};
use shm_infer_core::{BridgeError, Result, decode, encode};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::fs;
use tokio::time::sleep;
use tracing::debug;

/// Default interval between response polls
pub const DEFAULT_RESPONSE_POLL: Duration = Duration::from_millis(1);

/// Writes requests and collects responses through the slot files
#[derive(Debug, Clone)]
pub struct Producer {
    config: SlotConfig,
    request_tmp: PathBuf,
}

impl Producer {
    /// Create a producer for the given slots
    pub fn new(config: SlotConfig) -> Self {
        let request_tmp = temp_path_for(&config.request_path);
        Self {
            config,
            request_tmp,
        }
    }

    /// Get the slot configuration
    pub fn config(&self) -> &SlotConfig {
        &self.config
    }

    /// Encode and write one request vector
    pub async fn submit(&self, input: &[f32]) -> Result<()> {
        if input.len() != self.config.shape.input {
            return Err(BridgeError::ShapeMismatch {
                expected: self.config.shape.input,
                actual: input.len(),
            });
        }
        self.submit_raw(&encode(input)).await
    }

    /// Write raw bytes to the request slot as one complete file.
    ///
    /// No length check: the bridge ignores anything that is not exactly
    /// `input * 4` bytes.
    pub async fn submit_raw(&self, bytes: &[u8]) -> Result<()> {
        fs::write(&self.request_tmp, bytes).await.map_err(|e| {
            BridgeError::ChannelError(format!("Failed to write request temp: {}", e))
        })?;
        fs::rename(&self.request_tmp, &self.config.request_path)
            .await
            .map_err(|e| BridgeError::ChannelError(format!("Failed to submit request: {}", e)))?;
        debug!("Submitted {} byte request", bytes.len());
        Ok(())
    }

    /// Whether the request slot still holds an untaken request file
    pub async fn request_pending(&self) -> bool {
        fs::metadata(&self.config.request_path).await.is_ok()
    }

    /// Take the response if one is fully present, deleting it after the read
    pub async fn try_take_response(&self) -> Result<Option<Vec<f32>>> {
        let path = &self.config.response_path;
        let expected = self.config.shape.response_bytes();

        let data = match fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(BridgeError::ChannelError(format!(
                    "Failed to read response: {}",
                    e
                )));
            }
        };
        if data.len() != expected {
            return Ok(None);
        }

        match fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(BridgeError::ChannelError(format!(
                    "Failed to delete response: {}",
                    e
                )));
            }
        }

        decode(&data, self.config.shape.output).map(Some)
    }

    /// Poll for a response until `timeout` elapses
    pub async fn take_response_timeout(&self, timeout: Duration) -> Result<Vec<f32>> {
        let start = Instant::now();

        loop {
            if let Some(response) = self.try_take_response().await? {
                return Ok(response);
            }
            if start.elapsed() > timeout {
                return Err(BridgeError::ChannelError(
                    "Timeout waiting for response".to_string(),
                ));
            }
            sleep(DEFAULT_RESPONSE_POLL).await;
        }
    }

    /// Submit one request and wait for its response (strict ping-pong)
    pub async fn request(&self, input: &[f32], timeout: Duration) -> Result<Vec<f32>> {
        self.clear_response().await?;
        self.submit(input).await?;
        self.take_response_timeout(timeout).await
    }

    /// Remove any response left from an earlier request
    pub async fn clear_response(&self) -> Result<()> {
        match fs::remove_file(&self.config.response_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BridgeError::ChannelError(format!(
                "Failed to clear response: {}",
                e
            ))),
        }
    }
}

/// Acceptance rule for a control output: every value is zero or a normal float.
///
/// NaN, infinities and subnormals are rejected so a degenerate prediction
/// never reaches the controller.
pub fn is_normal_response(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_normal() || *v == 0.0)
}
