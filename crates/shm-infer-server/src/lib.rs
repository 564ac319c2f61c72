//! # shm-infer-server
//!
//! Polling inference bridge over shared-memory file slots.
//!
//! This crate provides:
//! - `BridgeConfig` for slot paths, vector shape and poll interval
//! - `PollLoop`, the single-threaded take -> decode -> predict -> encode -> publish loop
//! - `BridgeStats` tick counters
//! - `BridgeServer`, which wires a loaded `Engine` to the file slots

pub mod config;
pub mod poll;
pub mod stats;

pub use config::{BridgeConfig, DEFAULT_POLL_INTERVAL};
pub use poll::{LoopState, PollLoop, TickOutcome};
pub use stats::BridgeStats;

use shm_bridge::SlotChannel;
use shm_infer_core::{BridgeError, Result};
use shm_infer_engine::Engine;
use std::future::Future;
use tracing::info;

/// Inference bridge server
pub struct BridgeServer {
    /// Loaded prediction engine
    engine: Engine,
    /// Slot and timing configuration
    config: BridgeConfig,
}

impl BridgeServer {
    /// Create a new server, checking the engine against the configured shape
    pub fn new(engine: Engine, config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        if engine.shape() != config.channel.shape {
            return Err(BridgeError::ConfigError(format!(
                "Engine shape {:?} does not match slot shape {:?}",
                engine.shape(),
                config.channel.shape
            )));
        }
        Ok(Self { engine, config })
    }

    /// Get the bridge configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Serve until `shutdown` resolves, then return the tick counters
    pub async fn run_until<F>(self, shutdown: F) -> Result<BridgeStats>
    where
        F: Future<Output = ()>,
    {
        let channel = SlotChannel::new(self.config.channel.clone());
        channel.prepare().await?;

        info!(
            "Inference bridge serving (poll interval {:?})",
            self.config.poll_interval
        );

        let mut poll_loop = PollLoop::new(channel, self.engine, self.config.poll_interval);
        poll_loop.run_until(shutdown).await;
        Ok(poll_loop.into_stats())
    }

    /// Serve forever
    pub async fn run(self) -> Result<BridgeStats> {
        self.run_until(std::future::pending()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shm_bridge::SlotConfig;
    use shm_infer_core::Shape;
    use shm_infer_engine::FnPredictor;

    fn engine(shape: Shape) -> Engine {
        let output = shape.output;
        Engine::new(FnPredictor::new(shape, move |_: &[f32]| vec![0.0; output]), shape).unwrap()
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let config = BridgeConfig::default();
        let result = BridgeServer::new(engine(Shape::new(4, 1)), config);
        assert!(matches!(result, Err(BridgeError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_run_until_stops() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::with_channel(SlotConfig::with_dir(dir.path()));
        let server = BridgeServer::new(engine(Shape::default()), config).unwrap();

        let stats = server
            .run_until(tokio::time::sleep(std::time::Duration::from_millis(20)))
            .await
            .unwrap();
        assert_eq!(stats.served, 0);
        assert_eq!(stats.dropped, 0);
    }
}
