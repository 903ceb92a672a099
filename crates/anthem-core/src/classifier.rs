//! Serialized identity classifier.
//!
//! Loads an opaque model bundle produced by the offline training pipeline:
//! a linear one-vs-rest classifier over L2-normalized embeddings, plus
//! training metadata. The bundle is read once at startup and immutable
//! thereafter.

use crate::types::{Embedding, Identity};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default label reserved for "not a trained person / noise".
pub const DEFAULT_SENTINEL_LABEL: &str = "misc";

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("failed to read model bundle: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model bundle: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("malformed model: {0}")]
    Malformed(String),
    #[error("embedding dimension {got} does not match model dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Training metadata carried alongside the fitted model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Training parameters as recorded by the training script.
    pub parameters: serde_json::Value,
    /// Train/test accuracy.
    pub performance: Performance,
    /// Dataset the model was fitted on.
    pub dataset_path: String,
    /// Approximate serialized size, for logging.
    pub model_size_mb: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Performance {
    pub train: f64,
    pub test: f64,
}

/// Fitted linear one-vs-rest model: one weight vector + intercept per class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub classes: Vec<String>,
    pub weights: Vec<Vec<f32>>,
    pub intercepts: Vec<f32>,
}

/// The on-disk bundle: fitted model plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub model: LinearModel,
    pub metadata: ModelMetadata,
}

/// Identity classifier backed by a loaded model bundle.
#[derive(Debug)]
pub struct IdentityClassifier {
    model: LinearModel,
    sentinel: String,
    dim: usize,
}

impl IdentityClassifier {
    /// Load and validate a model bundle from a JSON file.
    pub fn load(path: &str, sentinel: &str) -> Result<Self, ClassifierError> {
        if !Path::new(path).exists() {
            return Err(ClassifierError::ModelNotFound(path.to_string()));
        }

        let raw = std::fs::read_to_string(path)?;
        let bundle: ModelBundle = serde_json::from_str(&raw)?;

        tracing::info!(
            path,
            classes = ?bundle.model.classes,
            train_accuracy = bundle.metadata.performance.train,
            test_accuracy = bundle.metadata.performance.test,
            dataset = %bundle.metadata.dataset_path,
            "loaded identity classifier"
        );

        Self::from_bundle(bundle, sentinel)
    }

    /// Validate an already-deserialized bundle.
    pub fn from_bundle(bundle: ModelBundle, sentinel: &str) -> Result<Self, ClassifierError> {
        let model = bundle.model;

        if model.classes.is_empty() {
            return Err(ClassifierError::Malformed("no classes".into()));
        }
        if model.weights.len() != model.classes.len()
            || model.intercepts.len() != model.classes.len()
        {
            return Err(ClassifierError::Malformed(format!(
                "{} classes, {} weight vectors, {} intercepts",
                model.classes.len(),
                model.weights.len(),
                model.intercepts.len()
            )));
        }

        let dim = model.weights[0].len();
        if dim == 0 || model.weights.iter().any(|w| w.len() != dim) {
            return Err(ClassifierError::Malformed(
                "weight vectors have inconsistent dimensions".into(),
            ));
        }

        Ok(Self {
            model,
            sentinel: sentinel.to_string(),
            dim,
        })
    }

    /// Classify an embedding to an identity.
    ///
    /// The input is L2-normalized (mirroring the training-time scaler)
    /// before scoring; the argmax class wins. The sentinel class maps to
    /// [`Identity::Unknown`].
    pub fn classify(&self, embedding: &Embedding) -> Result<Identity, ClassifierError> {
        if embedding.values.len() != self.dim {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.dim,
                got: embedding.values.len(),
            });
        }

        let norm: f32 = embedding.values.iter().map(|x| x * x).sum::<f32>().sqrt();
        let scale = if norm > 0.0 { 1.0 / norm } else { 0.0 };

        let mut best_idx = 0usize;
        let mut best_score = f32::NEG_INFINITY;

        for (idx, (weights, intercept)) in self
            .model
            .weights
            .iter()
            .zip(self.model.intercepts.iter())
            .enumerate()
        {
            let score: f32 = weights
                .iter()
                .zip(embedding.values.iter())
                .map(|(w, x)| w * x * scale)
                .sum::<f32>()
                + intercept;

            if score > best_score {
                best_score = score;
                best_idx = idx;
            }
        }

        let label = &self.model.classes[best_idx];
        tracing::debug!(label = %label, score = best_score, "classified embedding");

        if label == &self.sentinel {
            Ok(Identity::Unknown)
        } else {
            Ok(Identity::Known(label.clone()))
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.model.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn bundle(classes: &[&str], weights: Vec<Vec<f32>>, intercepts: Vec<f32>) -> ModelBundle {
        ModelBundle {
            model: LinearModel {
                classes: classes.iter().map(|s| s.to_string()).collect(),
                weights,
                intercepts,
            },
            metadata: ModelMetadata {
                parameters: serde_json::json!({"kernel": "linear"}),
                performance: Performance { train: 0.99, test: 0.95 },
                dataset_path: "/data/faces".into(),
                model_size_mb: Some(0.1),
            },
        }
    }

    fn embedding(values: Vec<f32>) -> Embedding {
        Embedding { values, model_version: None }
    }

    #[test]
    fn test_classify_argmax() {
        let b = bundle(
            &["alice", "bob"],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            vec![0.0, 0.0],
        );
        let clf = IdentityClassifier::from_bundle(b, "misc").unwrap();

        assert_eq!(
            clf.classify(&embedding(vec![1.0, 0.1])).unwrap(),
            Identity::Known("alice".into())
        );
        assert_eq!(
            clf.classify(&embedding(vec![0.1, 1.0])).unwrap(),
            Identity::Known("bob".into())
        );
    }

    #[test]
    fn test_classify_sentinel_maps_to_unknown() {
        let b = bundle(
            &["alice", "misc"],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            vec![0.0, 0.0],
        );
        let clf = IdentityClassifier::from_bundle(b, "misc").unwrap();

        assert_eq!(clf.classify(&embedding(vec![0.0, 1.0])).unwrap(), Identity::Unknown);
    }

    #[test]
    fn test_classify_input_normalized() {
        // Scaled input must classify identically to the unit vector.
        let b = bundle(
            &["alice", "bob"],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            vec![0.0, 0.0],
        );
        let clf = IdentityClassifier::from_bundle(b, "misc").unwrap();

        assert_eq!(
            clf.classify(&embedding(vec![100.0, 10.0])).unwrap(),
            Identity::Known("alice".into())
        );
    }

    #[test]
    fn test_intercept_breaks_tie() {
        let b = bundle(
            &["alice", "bob"],
            vec![vec![1.0, 0.0], vec![1.0, 0.0]],
            vec![0.0, 0.5],
        );
        let clf = IdentityClassifier::from_bundle(b, "misc").unwrap();

        assert_eq!(
            clf.classify(&embedding(vec![1.0, 0.0])).unwrap(),
            Identity::Known("bob".into())
        );
    }

    #[test]
    fn test_dimension_mismatch() {
        let b = bundle(&["alice"], vec![vec![1.0, 0.0]], vec![0.0]);
        let clf = IdentityClassifier::from_bundle(b, "misc").unwrap();

        let err = clf.classify(&embedding(vec![1.0, 0.0, 0.0])).unwrap_err();
        assert!(matches!(err, ClassifierError::DimensionMismatch { expected: 2, got: 3 }));
    }

    #[test]
    fn test_malformed_bundle_rejected() {
        let b = bundle(&["alice", "bob"], vec![vec![1.0]], vec![0.0]);
        assert!(IdentityClassifier::from_bundle(b, "misc").is_err());

        let b = bundle(&[], vec![], vec![]);
        assert!(IdentityClassifier::from_bundle(b, "misc").is_err());
    }

    #[test]
    fn test_load_from_json_file() {
        let b = bundle(
            &["alice", "misc"],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            vec![0.0, 0.0],
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identities.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(serde_json::to_string(&b).unwrap().as_bytes()).unwrap();

        let clf = IdentityClassifier::load(path.to_str().unwrap(), "misc").unwrap();
        assert_eq!(clf.classes(), &["alice".to_string(), "misc".to_string()]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = IdentityClassifier::load("/nonexistent/model.json", "misc").unwrap_err();
        assert!(matches!(err, ClassifierError::ModelNotFound(_)));
    }
}
