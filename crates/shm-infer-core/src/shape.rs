//! Request/response vector shape

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Element count of a request vector for the default controller model
pub const INPUT_SIZE: usize = 6;

/// Element count of a response vector for the default controller model
pub const OUTPUT_SIZE: usize = 2;

/// Width of one encoded element in bytes
pub const ELEMENT_BYTES: usize = std::mem::size_of::<f32>();

/// Fixed input/output element counts of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    /// Values per request vector
    pub input: usize,
    /// Values per response vector
    pub output: usize,
}

impl Default for Shape {
    fn default() -> Self {
        Self {
            input: INPUT_SIZE,
            output: OUTPUT_SIZE,
        }
    }
}

impl Shape {
    /// Create a shape with custom sizes
    pub fn new(input: usize, output: usize) -> Self {
        Self { input, output }
    }

    /// Exact byte length of an encoded request
    pub fn request_bytes(&self) -> usize {
        self.input * ELEMENT_BYTES
    }

    /// Exact byte length of an encoded response
    pub fn response_bytes(&self) -> usize {
        self.output * ELEMENT_BYTES
    }

    /// Reject empty vectors on either side
    pub fn validate(&self) -> Result<()> {
        if self.input == 0 || self.output == 0 {
            return Err(BridgeError::ConfigError(format!(
                "Vector sizes must be non-zero (input={}, output={})",
                self.input, self.output
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_byte_lengths() {
        let shape = Shape::default();
        assert_eq!(shape.request_bytes(), 24);
        assert_eq!(shape.response_bytes(), 8);
        assert!(shape.validate().is_ok());
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(Shape::new(0, 2).validate().is_err());
        assert!(Shape::new(6, 0).validate().is_err());
    }
}
