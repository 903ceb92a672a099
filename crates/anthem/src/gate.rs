//! Detection gate: the hysteresis state machine.
//!
//! Fast detection is near-free, precise extraction is not. The gate
//! requires a sustained run of detecting frames before the expensive
//! cascade is allowed to fire, which suppresses single-frame detector
//! noise. One empty frame discards the whole streak — deliberately no
//! smoothing or decay.

use anthem_core::types::{largest_box, BoundingBox};

/// Gate state derived from the consecutive-detection counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No recent detections (counter 0).
    Idle,
    /// Some detections, not yet enough (counter in 1..threshold).
    Accumulating,
    /// Counter reached the threshold; the cascade should fire this tick.
    Ready,
}

/// Counts consecutive frames with at least one detected face.
pub struct DetectionGate {
    counter: u32,
    threshold: u32,
}

impl DetectionGate {
    pub fn new(threshold: u32) -> Self {
        Self {
            counter: 0,
            threshold: threshold.max(1),
        }
    }

    /// Feed one frame's detections and get the resulting state.
    ///
    /// Non-empty: saturating increment (the counter never grows past the
    /// threshold). Empty: unconditional reset to zero.
    pub fn observe(&mut self, detections: &[BoundingBox]) -> GateState {
        if detections.is_empty() {
            if self.counter > 0 {
                tracing::info!("no face detected: resetting counter");
            }
            self.counter = 0;
        } else {
            self.counter = (self.counter + 1).min(self.threshold);
            if let Some(best) = largest_box(detections) {
                tracing::info!(
                    area = best.area(),
                    streak = self.counter,
                    "face detected"
                );
            }
        }

        self.state()
    }

    /// Force the counter back to zero, independent of recent detections.
    /// Called after every cascade run.
    pub fn reset(&mut self) {
        self.counter = 0;
    }

    pub fn state(&self) -> GateState {
        match self.counter {
            0 => GateState::Idle,
            c if c >= self.threshold => GateState::Ready,
            _ => GateState::Accumulating,
        }
    }

    #[cfg(test)]
    fn counter(&self) -> u32 {
        self.counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face() -> BoundingBox {
        BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 20.0,
            height: 20.0,
            confidence: 0.9,
            landmarks: None,
        }
    }

    fn some_faces() -> Vec<BoundingBox> {
        vec![face()]
    }

    #[test]
    fn test_counter_tracks_trailing_run() {
        let mut gate = DetectionGate::new(3);

        assert_eq!(gate.observe(&some_faces()), GateState::Accumulating);
        assert_eq!(gate.counter(), 1);
        assert_eq!(gate.observe(&some_faces()), GateState::Accumulating);
        assert_eq!(gate.counter(), 2);
        assert_eq!(gate.observe(&some_faces()), GateState::Ready);
        assert_eq!(gate.counter(), 3);
    }

    #[test]
    fn test_counter_saturates_at_threshold() {
        let mut gate = DetectionGate::new(3);
        for _ in 0..10 {
            gate.observe(&some_faces());
        }
        assert_eq!(gate.counter(), 3);
        assert_eq!(gate.state(), GateState::Ready);
    }

    #[test]
    fn test_single_empty_frame_resets_streak() {
        let mut gate = DetectionGate::new(5);
        for _ in 0..4 {
            gate.observe(&some_faces());
        }
        assert_eq!(gate.counter(), 4);

        assert_eq!(gate.observe(&[]), GateState::Idle);
        assert_eq!(gate.counter(), 0);
    }

    #[test]
    fn test_empty_frame_resets_even_when_ready() {
        let mut gate = DetectionGate::new(2);
        gate.observe(&some_faces());
        gate.observe(&some_faces());
        assert_eq!(gate.state(), GateState::Ready);

        assert_eq!(gate.observe(&[]), GateState::Idle);
    }

    #[test]
    fn test_reset_forces_idle_regardless_of_streak() {
        let mut gate = DetectionGate::new(3);
        for _ in 0..3 {
            gate.observe(&some_faces());
        }
        assert_eq!(gate.state(), GateState::Ready);

        gate.reset();
        assert_eq!(gate.state(), GateState::Idle);
        assert_eq!(gate.counter(), 0);
    }

    #[test]
    fn test_arbitrary_sequence_counter_is_capped_run_length() {
        // counter == min(len(trailing run of detecting frames), threshold)
        let threshold = 3u32;
        let sequence = [
            true, true, false, true, true, true, true, false, false, true,
        ];

        let mut gate = DetectionGate::new(threshold);
        let mut run = 0u32;

        for &detected in &sequence {
            if detected {
                gate.observe(&some_faces());
                run += 1;
            } else {
                gate.observe(&[]);
                run = 0;
            }
            assert_eq!(gate.counter(), run.min(threshold));
        }
    }

    #[test]
    fn test_threshold_one_fires_on_first_detection() {
        let mut gate = DetectionGate::new(1);
        assert_eq!(gate.observe(&some_faces()), GateState::Ready);
    }

    #[test]
    fn test_zero_threshold_clamped_to_one() {
        let mut gate = DetectionGate::new(0);
        assert_eq!(gate.state(), GateState::Idle);
        assert_eq!(gate.observe(&some_faces()), GateState::Ready);
    }
}
