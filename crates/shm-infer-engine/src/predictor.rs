//! Predictor trait and engine adapter

use crate::dense::{DenseModel, resolve_artifact_path};
use sha2::{Digest, Sha256};
use shm_infer_core::{BridgeError, Result, Shape};
use std::path::Path;
use tracing::info;

/// Trait for implementing prediction backends
///
/// The bridge treats a predictor as an opaque, read-only function from an
/// input vector to an output vector. Implementations must not mutate
/// observable state in `predict`.
pub trait Predictor: Send + Sync {
    /// Number of values the predictor consumes
    fn input_size(&self) -> usize;

    /// Number of values the predictor produces
    fn output_size(&self) -> usize;

    /// Run one inference
    fn predict(&self, input: &[f32]) -> Result<Vec<f32>>;
}

/// Predictor backed by a plain closure
pub struct FnPredictor<F> {
    shape: Shape,
    func: F,
}

impl<F> FnPredictor<F>
where
    F: Fn(&[f32]) -> Vec<f32> + Send + Sync,
{
    /// Wrap `func` as a predictor of the given shape
    pub fn new(shape: Shape, func: F) -> Self {
        Self { shape, func }
    }
}

impl<F> Predictor for FnPredictor<F>
where
    F: Fn(&[f32]) -> Vec<f32> + Send + Sync,
{
    fn input_size(&self) -> usize {
        self.shape.input
    }

    fn output_size(&self) -> usize {
        self.shape.output
    }

    fn predict(&self, input: &[f32]) -> Result<Vec<f32>> {
        Ok((self.func)(input))
    }
}

/// Shape-checked adapter around a loaded predictor
///
/// Loaded once at startup and never mutated afterwards.
pub struct Engine {
    predictor: Box<dyn Predictor>,
    shape: Shape,
    fingerprint: Option<String>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("shape", &self.shape)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Wrap a predictor, checking that its dimensions match `shape`
    pub fn new<P: Predictor + 'static>(predictor: P, shape: Shape) -> Result<Self> {
        shape.validate()?;
        if predictor.input_size() != shape.input || predictor.output_size() != shape.output {
            return Err(BridgeError::ArtifactLoad(format!(
                "Predictor shape {}->{} does not match configured {}->{}",
                predictor.input_size(),
                predictor.output_size(),
                shape.input,
                shape.output
            )));
        }

        Ok(Self {
            predictor: Box::new(predictor),
            shape,
            fingerprint: None,
        })
    }

    /// Load a dense-network artifact from a file or a directory holding `model.json`
    pub fn load(path: impl AsRef<Path>, shape: Shape) -> Result<Self> {
        let file = resolve_artifact_path(path.as_ref())?;
        let bytes = std::fs::read(&file).map_err(|e| {
            BridgeError::ArtifactLoad(format!("Failed to read {}: {}", file.display(), e))
        })?;

        let fingerprint = hex::encode(Sha256::digest(&bytes));
        let model = DenseModel::from_slice(&bytes)?;

        info!(
            "Loaded predictor artifact {} ({}->{}, {} layers, sha256={})",
            file.display(),
            model.input_size,
            model.output_size,
            model.layers.len(),
            fingerprint
        );

        let mut engine = Self::new(model, shape)?;
        engine.fingerprint = Some(fingerprint);
        Ok(engine)
    }

    /// Run one inference, enforcing the configured shape on both sides
    pub fn predict(&self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() != self.shape.input {
            return Err(BridgeError::ShapeMismatch {
                expected: self.shape.input,
                actual: input.len(),
            });
        }

        let output = self.predictor.predict(input)?;
        if output.len() != self.shape.output {
            return Err(BridgeError::ShapeMismatch {
                expected: self.shape.output,
                actual: output.len(),
            });
        }

        Ok(output)
    }

    /// Configured input/output shape
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Hex SHA-256 of the artifact bytes, if loaded from disk
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }
}
