//! Tick counters

use crate::poll::TickOutcome;
use std::collections::BTreeMap;

/// Counters for ticks since the loop started
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Completed ticks, idle ones included
    pub ticks: u64,
    /// Requests answered with a published response
    pub served: u64,
    /// Ticks abandoned after an error
    pub dropped: u64,
    /// Dropped ticks keyed by `BridgeError::kind`
    pub dropped_by_kind: BTreeMap<&'static str, u64>,
}

impl BridgeStats {
    /// Fold one tick outcome into the counters
    pub fn record(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Idle => {}
            TickOutcome::Served(_) => self.served += 1,
            TickOutcome::Dropped(err) => {
                self.dropped += 1;
                *self.dropped_by_kind.entry(err.kind()).or_insert(0) += 1;
            }
        }
    }
}
