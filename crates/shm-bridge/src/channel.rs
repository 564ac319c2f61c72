//! Channel abstraction for the poll loop
//!
//! Lets the poll loop run against the file slots in production and against
//! in-memory fakes in tests.

use async_trait::async_trait;
use shm_infer_core::Result;

/// Single-producer, single-consumer request/response mailbox
#[async_trait]
pub trait Channel: Send {
    /// Take the pending request if one is fully present.
    ///
    /// Returns `Ok(None)` when nothing is ready, including when the request
    /// slot exists with the wrong length. A returned request has been removed
    /// from the slot.
    async fn try_take_request(&mut self) -> Result<Option<Vec<u8>>>;

    /// Replace the response slot with `data` in one step visible to readers.
    async fn publish_response(&mut self, data: &[u8]) -> Result<()>;
}
