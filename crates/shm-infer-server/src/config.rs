//! Bridge configuration

use shm_bridge::SlotConfig;
use shm_infer_core::{BridgeError, Result};
use std::time::Duration;

/// Sleep between polls. Lower means less latency and more idle CPU.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for the inference bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Request/response slots and vector shape
    pub channel: SlotConfig,
    /// Fixed sleep at the start of every tick
    pub poll_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel: SlotConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl BridgeConfig {
    /// Create config with custom slots
    pub fn with_channel(channel: SlotConfig) -> Self {
        Self {
            channel,
            ..Default::default()
        }
    }

    /// Override the poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Validate slots and timing
    pub fn validate(&self) -> Result<()> {
        self.channel.validate()?;
        if self.poll_interval.is_zero() {
            return Err(BridgeError::ConfigError(
                "Poll interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
