//! Poll loop controller
//!
//! Each tick sleeps for the poll interval, then runs one
//! take -> decode -> predict -> encode -> publish pass. Every step returns a
//! `Result`; any error ends the tick as `TickOutcome::Dropped` and the loop
//! carries on. Nothing inside a tick can stop the loop.

use crate::stats::BridgeStats;
use shm_bridge::Channel;
use shm_infer_core::{BridgeError, Result, decode, encode};
use shm_infer_engine::Engine;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, trace, warn};

/// Controller state within a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for a request
    Idle,
    /// Decoding, predicting, encoding or publishing a taken request
    Processing,
}

/// Result of one tick
#[derive(Debug)]
pub enum TickOutcome {
    /// No request was ready
    Idle,
    /// A request was answered with this response vector
    Served(Vec<f32>),
    /// The tick was abandoned; the request, if taken, is gone
    Dropped(BridgeError),
}

/// Single-threaded polling controller
pub struct PollLoop<C: Channel> {
    channel: C,
    engine: Engine,
    poll_interval: Duration,
    state: LoopState,
    stats: BridgeStats,
}

impl<C: Channel> PollLoop<C> {
    /// Create a loop over `channel` serving `engine`
    pub fn new(channel: C, engine: Engine, poll_interval: Duration) -> Self {
        Self {
            channel,
            engine,
            poll_interval,
            state: LoopState::Idle,
            stats: BridgeStats::default(),
        }
    }

    /// Current controller state
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Counters so far
    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    /// Consume the loop, returning its counters
    pub fn into_stats(self) -> BridgeStats {
        self.stats
    }

    /// Sleep for the poll interval, then poll once
    pub async fn tick(&mut self) -> TickOutcome {
        sleep(self.poll_interval).await;
        self.poll_once().await
    }

    /// Run one poll pass without sleeping
    pub async fn poll_once(&mut self) -> TickOutcome {
        let outcome = match self.process().await {
            Ok(None) => TickOutcome::Idle,
            Ok(Some(output)) => TickOutcome::Served(output),
            Err(e) => TickOutcome::Dropped(e),
        };

        if self.state == LoopState::Processing {
            trace!("Processing -> Idle");
            self.state = LoopState::Idle;
        }
        self.stats.record(&outcome);
        outcome
    }

    async fn process(&mut self) -> Result<Option<Vec<f32>>> {
        let Some(bytes) = self.channel.try_take_request().await? else {
            return Ok(None);
        };

        trace!("Idle -> Processing ({} bytes)", bytes.len());
        self.state = LoopState::Processing;

        let input = decode(&bytes, self.engine.shape().input)?;

        let engine = &self.engine;
        let output = catch_unwind(AssertUnwindSafe(|| engine.predict(&input)))
            .map_err(|_| BridgeError::PredictionError("predictor panicked".into()))??;

        self.channel.publish_response(&encode(&output)).await?;
        Ok(Some(output))
    }

    /// Run until `shutdown` resolves.
    ///
    /// Shutdown is only observed during the inter-tick sleep, so a taken
    /// request is always carried through to publish or drop.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = sleep(self.poll_interval) => {}
            }

            match self.poll_once().await {
                TickOutcome::Idle => {}
                TickOutcome::Served(output) => trace!("Served response {:?}", output),
                TickOutcome::Dropped(e) => warn!("Dropped tick ({}): {}", e.kind(), e),
            }
        }

        info!(
            "Poll loop stopped after {} ticks: served={} dropped={} {:?}",
            self.stats.ticks, self.stats.served, self.stats.dropped, self.stats.dropped_by_kind
        );
    }

    /// Run forever
    pub async fn run(&mut self) {
        self.run_until(std::future::pending()).await
    }
}
