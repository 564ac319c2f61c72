//! Shared-memory channel for the inference bridge
//!
//! Two well-known files on a RAM-backed mount (`/dev/shm` by default) act as
//! single-slot mailboxes:
//!
//! - **Request slot**: written by the producer, consumed (read + deleted) by
//!   the bridge once it exists with the exact expected length
//! - **Response slot**: replaced by the bridge via temp file + rename, read by
//!   the producer
//!
//! There is no lock. The producer must not rewrite the request slot while a
//! previous request is outstanding; violating that may tear a read or delete
//! a fresh request.

pub mod channel;
pub mod slot;

pub use channel::Channel;
pub use slot::{SlotChannel, SlotConfig, temp_path_for};
