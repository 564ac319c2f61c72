//! # shm-infer-engine
//!
//! Prediction engine adapter for the inference bridge.
//!
//! This crate provides:
//! - `Predictor` trait for plugging in any `f32` vector -> vector model
//! - `Engine`, the shape-checked adapter the poll loop talks to
//! - `DenseModel`, a feed-forward network loaded from a JSON artifact

pub mod dense;
pub mod predictor;

pub use dense::{Activation, DenseLayer, DenseModel, resolve_artifact_path};
pub use predictor::{Engine, FnPredictor, Predictor};
