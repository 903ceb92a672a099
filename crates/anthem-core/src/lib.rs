//! anthem-core — Face detection, extraction, embedding, and classification.
//!
//! Two SCRFD detectors run via ONNX Runtime: a small, fast one that gates
//! the pipeline, and a heavier one that feeds aligned 112×112 crops into
//! an ArcFace embedding model. A serialized linear classifier maps
//! embeddings to trained identities.

pub mod alignment;
pub mod classifier;
pub mod detector;
pub mod embedder;
pub mod extractor;
pub mod scrfd;
pub mod types;

pub use classifier::{IdentityClassifier, ModelBundle};
pub use detector::FastFaceDetector;
pub use embedder::EmbeddingModel;
pub use extractor::PreciseFaceExtractor;
pub use scrfd::DetectorError;
pub use types::{BoundingBox, ComputeBackend, Embedding, FaceCrop, Identity};
