//! # shm-infer-core
//!
//! Core types for the shared-memory inference bridge.
//!
//! This crate provides the pieces every other bridge crate agrees on:
//! - Vector shape (input and output element counts)
//! - Binary codec for raw little-endian `f32` payloads
//! - Error taxonomy and the crate-wide `Result` alias

pub mod codec;
pub mod error;
pub mod shape;

pub use codec::{decode, encode};
pub use error::{BridgeError, Result};
pub use shape::{INPUT_SIZE, OUTPUT_SIZE, Shape};
