//! Binary codec for raw `f32` vectors
//!
//! Payloads are a contiguous run of little-endian IEEE-754 `f32` values with
//! no header, length prefix or checksum. The exact byte length is the only
//! validation; NaN, infinities and out-of-range values pass through untouched.

use crate::error::{BridgeError, Result};
use crate::shape::ELEMENT_BYTES;

/// Decode `bytes` into exactly `expected_count` values.
///
/// Fails with [`BridgeError::MalformedPayload`] unless
/// `bytes.len() == expected_count * 4`. Never decodes a prefix.
pub fn decode(bytes: &[u8], expected_count: usize) -> Result<Vec<f32>> {
    let expected = expected_count * ELEMENT_BYTES;
    if bytes.len() != expected {
        return Err(BridgeError::MalformedPayload {
            expected,
            actual: bytes.len(),
        });
    }

    Ok(bytes
        .chunks_exact(ELEMENT_BYTES)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Encode `values` as `values.len() * 4` little-endian bytes, in order.
pub fn encode(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * ELEMENT_BYTES);
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}
