//! Deterministic per-frame preprocessing.
//!
//! Pure geometric/photometric transforms applied before detection: a top
//! crop (cameras that burn a timestamp banner into the image), an optional
//! 180° rotation (for upside-down mounts), and a brightness boost used
//! just before the precise extractor runs.

use crate::frame::Frame;

/// Configured geometric transform applied to every captured frame.
#[derive(Debug, Clone, Copy)]
pub struct FramePreprocessor {
    /// Rows removed from the top of the frame before rotation.
    pub top_crop: u32,
    /// Rotate the frame 180° (upside-down camera mount).
    pub rotate_180: bool,
}

impl Default for FramePreprocessor {
    fn default() -> Self {
        Self {
            top_crop: 0,
            rotate_180: true,
        }
    }
}

impl FramePreprocessor {
    /// Apply the configured transform. Total for well-formed frames; a
    /// top crop taller than the frame yields an empty frame rather than
    /// panicking.
    pub fn apply(&self, frame: &Frame) -> Frame {
        let cropped = crop_top(frame, self.top_crop);
        if self.rotate_180 {
            rotate_180(&cropped)
        } else {
            cropped
        }
    }
}

/// Remove `rows` rows from the top of the frame.
fn crop_top(frame: &Frame, rows: u32) -> Frame {
    let rows = rows.min(frame.height);
    let offset = (rows * frame.width) as usize;

    Frame {
        data: frame.data[offset..].to_vec(),
        width: frame.width,
        height: frame.height - rows,
        timestamp: frame.timestamp,
        sequence: frame.sequence,
    }
}

/// Rotate the frame 180° (reverse pixel order).
fn rotate_180(frame: &Frame) -> Frame {
    let mut data = frame.data.clone();
    data.reverse();

    Frame {
        data,
        width: frame.width,
        height: frame.height,
        timestamp: frame.timestamp,
        sequence: frame.sequence,
    }
}

/// Scale pixel brightness by `factor`, saturating at 255.
///
/// Applied to the preprocessed frame right before the precise extractor,
/// which was tuned on brighter input than the raw camera produces.
pub fn brighten(frame: &Frame, factor: f32) -> Frame {
    let data = frame
        .data
        .iter()
        .map(|&p| (p as f32 * factor).round().clamp(0.0, 255.0) as u8)
        .collect();

    Frame {
        data,
        width: frame.width,
        height: frame.height,
        timestamp: frame.timestamp,
        sequence: frame.sequence,
    }
}
