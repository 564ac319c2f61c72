//! File-backed slot channel

use crate::channel::Channel;
use async_trait::async_trait;
use shm_infer_core::{BridgeError, Result, Shape};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, trace};

/// Default RAM-backed directory for both slots
pub const DEFAULT_SLOT_DIR: &str = "/dev/shm";

/// Default request slot file name
pub const REQUEST_FILE_NAME: &str = "porydrive_input.dat";

/// Default response slot file name
pub const RESPONSE_FILE_NAME: &str = "porydrive_r.dat";

/// Configuration for the slot channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotConfig {
    /// Request slot written by the producer
    pub request_path: PathBuf,
    /// Response slot written by the bridge
    pub response_path: PathBuf,
    /// Expected vector sizes
    pub shape: Shape,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self::with_dir(DEFAULT_SLOT_DIR)
    }
}

impl SlotConfig {
    /// Both slots in `dir` with the default file names
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            request_path: dir.join(REQUEST_FILE_NAME),
            response_path: dir.join(RESPONSE_FILE_NAME),
            shape: Shape::default(),
        }
    }

    /// Create config with explicit paths
    pub fn with_paths(request_path: PathBuf, response_path: PathBuf) -> Self {
        Self {
            request_path,
            response_path,
            shape: Shape::default(),
        }
    }

    /// Override the vector shape
    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    /// Reject configurations where the slots would collide
    pub fn validate(&self) -> Result<()> {
        self.shape.validate()?;
        if self.request_path == self.response_path {
            return Err(BridgeError::ConfigError(format!(
                "Request and response slots share a path: {}",
                self.request_path.display()
            )));
        }
        if temp_path_for(&self.response_path) == self.request_path
            || temp_path_for(&self.request_path) == self.response_path
        {
            return Err(BridgeError::ConfigError(format!(
                "Slot temp files collide: {} / {}",
                self.request_path.display(),
                self.response_path.display()
            )));
        }
        Ok(())
    }
}

/// Sibling temp path a slot is staged in before the rename
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Channel over two files on a memory-backed filesystem
#[derive(Debug)]
pub struct SlotChannel {
    config: SlotConfig,
    response_tmp: PathBuf,
}

impl SlotChannel {
    /// Create a channel for the given slots
    pub fn new(config: SlotConfig) -> Self {
        let response_tmp = temp_path_for(&config.response_path);
        Self {
            config,
            response_tmp,
        }
    }

    /// Get the slot configuration
    pub fn config(&self) -> &SlotConfig {
        &self.config
    }

    /// Create slot directories and clear a stale response temp file.
    ///
    /// A pending request is left alone.
    pub async fn prepare(&self) -> Result<()> {
        for path in [&self.config.request_path, &self.config.response_path] {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir).await.map_err(|e| {
                    BridgeError::ChannelError(format!(
                        "Failed to create slot dir {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
            }
        }

        match fs::remove_file(&self.response_tmp).await {
            Ok(()) => debug!("Removed stale response temp {:?}", self.response_tmp),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(BridgeError::ChannelError(format!(
                    "Failed to remove stale {}: {}",
                    self.response_tmp.display(),
                    e
                )));
            }
        }

        info!(
            "Slots ready: request={:?} ({} bytes), response={:?} ({} bytes)",
            self.config.request_path,
            self.config.shape.request_bytes(),
            self.config.response_path,
            self.config.shape.response_bytes()
        );
        Ok(())
    }
}

#[async_trait]
impl Channel for SlotChannel {
    async fn try_take_request(&mut self) -> Result<Option<Vec<u8>>> {
        let path = &self.config.request_path;
        let expected = self.config.shape.request_bytes();

        let meta = match fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(BridgeError::ChannelError(format!(
                    "Failed to stat request: {}",
                    e
                )));
            }
        };

        if !meta.is_file() || meta.len() != expected as u64 {
            // Still being written, or not a request at all
            trace!("Request slot present but not ready ({} bytes)", meta.len());
            return Ok(None);
        }

        let data = match fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(BridgeError::ChannelError(format!(
                    "Failed to read request: {}",
                    e
                )));
            }
        };

        if data.len() != expected {
            // Rewritten between the size check and the read
            trace!("Request slot changed length during read ({} bytes)", data.len());
            return Ok(None);
        }

        match fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(BridgeError::ChannelError(format!(
                    "Failed to delete request: {}",
                    e
                )));
            }
        }

        Ok(Some(data))
    }

    async fn publish_response(&mut self, data: &[u8]) -> Result<()> {
        let expected = self.config.shape.response_bytes();
        if data.len() != expected {
            return Err(BridgeError::MalformedPayload {
                expected,
                actual: data.len(),
            });
        }

        fs::write(&self.response_tmp, data).await.map_err(|e| {
            BridgeError::ChannelError(format!("Failed to write response temp: {}", e))
        })?;

        if let Err(e) = fs::rename(&self.response_tmp, &self.config.response_path).await {
            let _ = fs::remove_file(&self.response_tmp).await;
            return Err(BridgeError::ChannelError(format!(
                "Failed to publish response: {}",
                e
            )));
        }

        Ok(())
    }
}
