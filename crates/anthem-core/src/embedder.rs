//! ArcFace embedding model via ONNX Runtime.
//!
//! Maps batches of aligned 112×112 face crops to 512-dimensional
//! L2-normalized embeddings using the w600k_r50 ArcFace model.

use crate::types::{ComputeBackend, Embedding, FaceCrop};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ARCFACE_INPUT_SIZE: usize = 112;
const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5; // symmetric normalization, NOT 128.0
const ARCFACE_EMBEDDING_DIM: usize = 512;
const ARCFACE_MODEL_VERSION: &str = "w600k_r50";

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("crop size mismatch: expected {expected}x{expected}, got {actual} bytes")]
    CropSizeMismatch { expected: usize, actual: usize },
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// ArcFace embedding extractor.
pub struct EmbeddingModel {
    session: Session,
    /// Apply input standardization before inference. On for crops coming
    /// straight from the extractor.
    standardize: bool,
}

impl EmbeddingModel {
    /// Load the ArcFace ONNX model from the given path.
    pub fn load(
        model_path: &str,
        standardize: bool,
        backend: ComputeBackend,
    ) -> Result<Self, EmbedderError> {
        if !Path::new(model_path).exists() {
            return Err(EmbedderError::ModelNotFound(model_path.to_string()));
        }

        let ComputeBackend::Cpu { intra_threads } = backend;
        let session = Session::builder()?
            .with_intra_threads(intra_threads)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            standardize,
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded ArcFace model"
        );

        Ok(Self { session, standardize })
    }

    /// Compute one embedding per crop.
    ///
    /// The whole batch runs in a single inference call; each output row is
    /// L2-normalized independently.
    pub fn embed(&mut self, crops: &[FaceCrop]) -> Result<Vec<Embedding>, EmbedderError> {
        if crops.is_empty() {
            return Ok(Vec::new());
        }

        let input = self.batch_tensor(crops)?;

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::InferenceFailed(format!("embedding extraction: {e}")))?;

        let expected = crops.len() * ARCFACE_EMBEDDING_DIM;
        if raw.len() != expected {
            return Err(EmbedderError::InferenceFailed(format!(
                "expected {expected} output values ({} × {ARCFACE_EMBEDDING_DIM}), got {}",
                crops.len(),
                raw.len()
            )));
        }

        Ok(raw
            .chunks_exact(ARCFACE_EMBEDDING_DIM)
            .map(|row| Embedding {
                values: l2_normalize(row),
                model_version: Some(ARCFACE_MODEL_VERSION.to_string()),
            })
            .collect())
    }

    /// Build an (N, 3, 112, 112) tensor from grayscale crops.
    fn batch_tensor(&self, crops: &[FaceCrop]) -> Result<Array4<f32>, EmbedderError> {
        let size = ARCFACE_INPUT_SIZE;
        let mut tensor = Array4::<f32>::zeros((crops.len(), 3, size, size));

        for (n, crop) in crops.iter().enumerate() {
            if crop.data.len() != size * size {
                return Err(EmbedderError::CropSizeMismatch {
                    expected: size,
                    actual: crop.data.len(),
                });
            }

            for y in 0..size {
                for x in 0..size {
                    let pixel = crop.data[y * size + x] as f32;
                    let value = if self.standardize {
                        (pixel - ARCFACE_MEAN) / ARCFACE_STD
                    } else {
                        pixel
                    };
                    // Grayscale → 3-channel: replicate Y across R, G, B.
                    tensor[[n, 0, y, x]] = value;
                    tensor[[n, 1, y, x]] = value;
                    tensor[[n, 2, y, x]] = value;
                }
            }
        }

        Ok(tensor)
    }
}

fn l2_normalize(raw: &[f32]) -> Vec<f32> {
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize_unit_norm() {
        let v = l2_normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let v = l2_normalize(&[0.0, 0.0]);
        assert_eq!(v, vec![0.0, 0.0]);
    }

    #[test]
    fn test_standardization_constants() {
        // Pixel 128 under symmetric normalization: (128 - 127.5) / 127.5
        let expected = (128.0 - ARCFACE_MEAN) / ARCFACE_STD;
        assert!((expected - 0.00392).abs() < 1e-4);
    }
}
