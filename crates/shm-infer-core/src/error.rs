//! Error types for the inference bridge

use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Bridge error types
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Byte buffer length is not `expected_count * 4`
    #[error("Malformed payload: expected {expected} bytes, got {actual}")]
    MalformedPayload { expected: usize, actual: usize },

    /// Vector length does not match the engine shape
    #[error("Shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Predictor artifact missing or malformed
    #[error("Artifact load failed: {0}")]
    ArtifactLoad(String),

    /// Slot file read/write/delete failure
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Predictor failed to produce an output
    #[error("Prediction error: {0}")]
    PredictionError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invalid bridge configuration
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl BridgeError {
    /// Whether the error must stop the process.
    ///
    /// Only startup failures are fatal. Everything raised inside a poll tick
    /// is recoverable and costs at most that tick.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::ArtifactLoad(_) | BridgeError::ConfigError(_)
        )
    }

    /// Short stable label for logs and drop counters
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::MalformedPayload { .. } => "malformed_payload",
            BridgeError::ShapeMismatch { .. } => "shape_mismatch",
            BridgeError::ArtifactLoad(_) => "artifact_load",
            BridgeError::ChannelError(_) => "channel",
            BridgeError::PredictionError(_) => "prediction",
            BridgeError::SerializationError(_) => "serialization",
            BridgeError::ConfigError(_) => "config",
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::SerializationError(err.to_string())
    }
}
