//! Feed-forward network artifact
//!
//! The artifact is a JSON document describing a stack of fully-connected
//! layers:
//!
//! ```json
//! {
//!   "input_size": 6,
//!   "output_size": 2,
//!   "layers": [
//!     { "weights": [[...6 values...], ...], "bias": [...], "activation": "tanh" }
//!   ]
//! }
//! ```
//!
//! `weights` is row-major with one row per output unit of the layer.

use crate::predictor::Predictor;
use serde::{Deserialize, Serialize};
use shm_infer_core::{BridgeError, Result};
use std::path::{Path, PathBuf};

/// File name looked up when the artifact path is a directory
pub const MODEL_FILE_NAME: &str = "model.json";

/// Layer activation function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Tanh,
    Relu,
    Sigmoid,
}

impl Activation {
    #[inline]
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Linear => x,
            Activation::Tanh => x.tanh(),
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
        }
    }
}

/// One fully-connected layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    /// One row of input weights per output unit
    pub weights: Vec<Vec<f32>>,
    /// One bias per output unit
    pub bias: Vec<f32>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn units(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| {
                let sum: f32 = row.iter().zip(input).map(|(w, x)| w * x).sum();
                self.activation.apply(sum + bias)
            })
            .collect()
    }
}

/// Feed-forward network predictor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseModel {
    pub input_size: usize,
    pub output_size: usize,
    pub layers: Vec<DenseLayer>,
}

impl DenseModel {
    /// Parse and validate an artifact from raw JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let model: DenseModel = serde_json::from_slice(bytes)
            .map_err(|e| BridgeError::ArtifactLoad(format!("Invalid artifact JSON: {}", e)))?;
        model.validate()?;
        Ok(model)
    }

    /// Load and validate an artifact from a file or artifact directory
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = resolve_artifact_path(path.as_ref())?;
        let bytes = std::fs::read(&file).map_err(|e| {
            BridgeError::ArtifactLoad(format!("Failed to read {}: {}", file.display(), e))
        })?;
        Self::from_slice(&bytes)
    }

    /// Check that layer dimensions chain from input to output and all parameters are finite
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(invalid("artifact has no layers".into()));
        }

        let mut width = self.input_size;
        for (index, layer) in self.layers.iter().enumerate() {
            if layer.weights.len() != layer.units() {
                return Err(invalid(format!(
                    "layer {}: {} weight rows for {} biases",
                    index,
                    layer.weights.len(),
                    layer.units()
                )));
            }
            if let Some(row) = layer.weights.iter().position(|r| r.len() != width) {
                return Err(invalid(format!(
                    "layer {}: row {} has {} weights, expected {}",
                    index,
                    row,
                    layer.weights[row].len(),
                    width
                )));
            }
            let finite = layer.bias.iter().all(|v| v.is_finite())
                && layer.weights.iter().flatten().all(|v| v.is_finite());
            if !finite {
                return Err(invalid(format!("layer {}: non-finite parameter", index)));
            }
            width = layer.units();
        }

        if width != self.output_size {
            return Err(invalid(format!(
                "last layer has {} units, output_size is {}",
                width, self.output_size
            )));
        }
        Ok(())
    }
}

impl Predictor for DenseModel {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.output_size
    }

    fn predict(&self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() != self.input_size {
            return Err(BridgeError::ShapeMismatch {
                expected: self.input_size,
                actual: input.len(),
            });
        }

        let mut activations = input.to_vec();
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }
        Ok(activations)
    }
}

/// Resolve an artifact path: a JSON file, or a directory containing `model.json`
pub fn resolve_artifact_path(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        let file = path.join(MODEL_FILE_NAME);
        if file.is_file() {
            return Ok(file);
        }
        return Err(BridgeError::ArtifactLoad(format!(
            "Artifact directory {} has no {}",
            path.display(),
            MODEL_FILE_NAME
        )));
    }
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    Err(BridgeError::ArtifactLoad(format!(
        "Artifact not found: {}",
        path.display()
    )))
}

fn invalid(reason: String) -> BridgeError {
    BridgeError::ArtifactLoad(format!("Malformed artifact: {}", reason))
}
