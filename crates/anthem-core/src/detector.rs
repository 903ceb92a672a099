//! Fast gating face detector.
//!
//! A small SCRFD model (e.g. det_500m) run at reduced resolution. This is
//! the cheap per-frame check that drives the detection gate; it only has
//! to answer "is a face plausibly present, and how big" — the precise
//! extractor re-detects before any embedding is computed.

use crate::scrfd::{DetectorError, ScrfdModel};
use crate::types::{BoundingBox, ComputeBackend};

const FAST_INPUT_SIZE: usize = 320;
const FAST_SCORE_THRESHOLD: f32 = 0.5;

/// Cheap per-frame face presence detector.
pub struct FastFaceDetector {
    model: ScrfdModel,
}

impl FastFaceDetector {
    /// Load the small SCRFD model. Fails fast if the file is missing.
    pub fn load(model_path: &str, backend: ComputeBackend) -> Result<Self, DetectorError> {
        let model = ScrfdModel::load(model_path, FAST_INPUT_SIZE, FAST_SCORE_THRESHOLD, backend)?;
        Ok(Self { model })
    }

    /// Detect faces in a grayscale frame.
    ///
    /// Boxes are clamped to frame bounds; degenerate boxes are dropped.
    pub fn detect(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<BoundingBox>, DetectorError> {
        let raw = self.model.detect(gray, width, height)?;
        Ok(raw
            .into_iter()
            .filter_map(|b| b.clamped(width, height))
            .collect())
    }
}
