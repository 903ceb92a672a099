//! Precise face extractor.
//!
//! The expensive half of the cascade: a heavier SCRFD model (e.g. det_10g)
//! at full resolution, followed by landmark alignment to a canonical
//! 112×112 crop. Only runs once the detection gate has seen enough
//! consecutive positive frames.

use crate::alignment;
use crate::scrfd::{DetectorError, ScrfdModel};
use crate::types::{ComputeBackend, FaceCrop};

const PRECISE_INPUT_SIZE: usize = 640;
// Low session-level threshold; the caller-facing confidence gate decides.
const PRECISE_SCORE_THRESHOLD: f32 = 0.3;

pub const DEFAULT_EXTRACT_CONFIDENCE: f32 = 0.95;

/// Detector + aligner producing at most one normalized face crop.
pub struct PreciseFaceExtractor {
    model: ScrfdModel,
    /// Minimum detection confidence; must be strictly exceeded.
    confidence_threshold: f32,
}

impl PreciseFaceExtractor {
    /// Load the heavy SCRFD model. Fails fast if the file is missing.
    pub fn load(
        model_path: &str,
        confidence_threshold: f32,
        backend: ComputeBackend,
    ) -> Result<Self, DetectorError> {
        let model = ScrfdModel::load(model_path, PRECISE_INPUT_SIZE, PRECISE_SCORE_THRESHOLD, backend)?;
        Ok(Self {
            model,
            confidence_threshold,
        })
    }

    /// Extract the best face from a grayscale frame.
    ///
    /// Selects the highest-confidence detection. Returns `Ok(None)` when no
    /// detection strictly exceeds the confidence threshold or the winner has
    /// no landmarks — a normal outcome, not an error.
    pub fn extract(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Option<FaceCrop>, DetectorError> {
        let detections = self.model.detect(gray, width, height)?;

        // detect() sorts by confidence descending.
        let Some(best) = detections.first() else {
            return Ok(None);
        };

        if best.confidence <= self.confidence_threshold {
            tracing::debug!(
                confidence = best.confidence,
                threshold = self.confidence_threshold,
                "best detection below extraction confidence bar"
            );
            return Ok(None);
        }

        let Some(landmarks) = best.landmarks.as_ref() else {
            tracing::warn!("confident detection without landmarks, cannot align");
            return Ok(None);
        };

        let data = alignment::align_face(gray, width, height, landmarks);

        Ok(Some(FaceCrop {
            data,
            size: alignment::ALIGNED_SIZE,
            confidence: best.confidence,
        }))
    }
}
