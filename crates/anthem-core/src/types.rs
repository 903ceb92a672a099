use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Clamp the box to frame bounds. Returns `None` if nothing with
    /// positive width and height remains inside the frame.
    pub fn clamped(&self, frame_width: u32, frame_height: u32) -> Option<BoundingBox> {
        let fw = frame_width as f32;
        let fh = frame_height as f32;

        let x1 = self.x.clamp(0.0, fw);
        let y1 = self.y.clamp(0.0, fh);
        let x2 = (self.x + self.width).clamp(0.0, fw);
        let y2 = (self.y + self.height).clamp(0.0, fh);

        if x2 - x1 <= 0.0 || y2 - y1 <= 0.0 {
            return None;
        }

        Some(BoundingBox {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence: self.confidence,
            landmarks: self.landmarks,
        })
    }
}

/// Select the box with strictly maximal area; ties keep the first-seen box.
///
/// Detection order is preserved from the detector output, so the result is
/// deterministic for a given detection list.
pub fn largest_box(boxes: &[BoundingBox]) -> Option<&BoundingBox> {
    let mut best: Option<&BoundingBox> = None;
    let mut max_area = 0.0f32;

    for b in boxes {
        let area = b.area();
        if area > max_area {
            max_area = area;
            best = Some(b);
        }
    }

    best.or_else(|| boxes.first())
}

/// Aligned 112×112 grayscale face crop, ready for embedding extraction.
#[derive(Debug, Clone)]
pub struct FaceCrop {
    /// Row-major grayscale pixels, `size * size` bytes.
    pub data: Vec<u8>,
    pub size: usize,
    /// Confidence of the detection the crop was extracted from.
    pub confidence: f32,
}

/// Face embedding vector (512-dimensional for ArcFace).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

/// Outcome of classifying an embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// One of the trained identities.
    Known(String),
    /// The reserved noise/"not a trained person" label.
    Unknown,
}

/// Compute backend for ONNX sessions, resolved once at startup.
#[derive(Debug, Clone, Copy)]
pub enum ComputeBackend {
    Cpu { intra_threads: usize },
}

impl Default for ComputeBackend {
    fn default() -> Self {
        ComputeBackend::Cpu { intra_threads: 2 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_box(x: f32, y: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox {
            x,
            y,
            width: w,
            height: h,
            confidence: 0.9,
            landmarks: None,
        }
    }

    #[test]
    fn test_largest_box_picks_max_area() {
        let boxes = vec![
            make_box(0.0, 0.0, 10.0, 10.0),
            make_box(0.0, 0.0, 5.0, 30.0),
            make_box(0.0, 0.0, 7.0, 7.0),
        ];
        let best = largest_box(&boxes).unwrap();
        assert_eq!((best.width, best.height), (5.0, 30.0));
        assert!((best.area() - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_largest_box_tie_keeps_first() {
        let boxes = vec![
            make_box(1.0, 1.0, 10.0, 10.0),
            make_box(2.0, 2.0, 10.0, 10.0),
        ];
        let best = largest_box(&boxes).unwrap();
        assert_eq!(best.x, 1.0);
    }

    #[test]
    fn test_largest_box_empty() {
        assert!(largest_box(&[]).is_none());
    }

    #[test]
    fn test_clamp_inside_frame_unchanged() {
        let b = make_box(10.0, 10.0, 50.0, 50.0);
        let c = b.clamped(640, 480).unwrap();
        assert_eq!(c.x, 10.0);
        assert_eq!(c.width, 50.0);
    }

    #[test]
    fn test_clamp_overhanging_edges() {
        let b = make_box(-20.0, -10.0, 100.0, 100.0);
        let c = b.clamped(640, 480).unwrap();
        assert_eq!(c.x, 0.0);
        assert_eq!(c.y, 0.0);
        assert_eq!(c.width, 80.0);
        assert_eq!(c.height, 90.0);
    }

    #[test]
    fn test_clamp_fully_outside() {
        let b = make_box(700.0, 500.0, 50.0, 50.0);
        assert!(b.clamped(640, 480).is_none());
    }
}
