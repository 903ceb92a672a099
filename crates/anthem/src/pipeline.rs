//! The recognition pipeline: cascade orchestration around the gate.
//!
//! One synchronous loop pulls frames, runs the cheap detector on every
//! frame, and invokes the expensive extract/embed/classify cascade only
//! when the gate says a face has been stably present. After every cascade
//! run — whether or not it produced an action — the gate resets and the
//! frame source is torn down and reopened so the next read is fresh.

use crate::gate::{DetectionGate, GateState};
use crate::sink::CropSink;
use anthem_core::types::{BoundingBox, Embedding, FaceCrop, Identity};
use anthem_hw::preprocess::{self, FramePreprocessor};
use anthem_hw::{Frame, FrameSource};
use anyhow::{Context, Result};
use std::time::Duration;

/// Cheap per-frame detection seam.
pub trait DetectFaces {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>>;
}

/// Expensive extraction seam. `Ok(None)` is a normal outcome.
pub trait ExtractFace {
    fn extract(&mut self, frame: &Frame) -> Result<Option<FaceCrop>>;
}

pub trait EmbedFaces {
    fn embed(&mut self, crops: &[FaceCrop]) -> Result<Vec<Embedding>>;
}

pub trait ClassifyFace {
    fn classify(&self, embedding: &Embedding) -> Result<Identity>;
}

/// Fire-and-forget playback seam.
pub trait DispatchAction {
    fn dispatch(&self, identity: &str);
}

impl DetectFaces for anthem_core::FastFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>> {
        Ok(self.detect(&frame.data, frame.width, frame.height)?)
    }
}

impl ExtractFace for anthem_core::PreciseFaceExtractor {
    fn extract(&mut self, frame: &Frame) -> Result<Option<FaceCrop>> {
        Ok(self.extract(&frame.data, frame.width, frame.height)?)
    }
}

impl EmbedFaces for anthem_core::EmbeddingModel {
    fn embed(&mut self, crops: &[FaceCrop]) -> Result<Vec<Embedding>> {
        Ok(anthem_core::EmbeddingModel::embed(self, crops)?)
    }
}

impl ClassifyFace for anthem_core::IdentityClassifier {
    fn classify(&self, embedding: &Embedding) -> Result<Identity> {
        Ok(anthem_core::IdentityClassifier::classify(self, embedding)?)
    }
}

impl DispatchAction for anthem_player::ActionDispatcher {
    fn dispatch(&self, identity: &str) {
        anthem_player::ActionDispatcher::dispatch(self, identity)
    }
}

/// What happens with a face crop once the cascade produced one.
///
/// Injected at construction; both operating modes share every other part
/// of the pipeline.
pub enum TerminalAction {
    /// Embed, classify, and play music for known identities.
    Recognize {
        embedder: Box<dyn EmbedFaces>,
        classifier: Box<dyn ClassifyFace>,
        dispatcher: Box<dyn DispatchAction>,
    },
    /// Persist the crop to disk for later offline labeling.
    Collect { sink: CropSink },
}

pub struct Pipeline {
    source: Box<dyn FrameSource>,
    preprocessor: FramePreprocessor,
    detector: Box<dyn DetectFaces>,
    extractor: Box<dyn ExtractFace>,
    gate: DetectionGate,
    action: TerminalAction,
    /// Brightness boost applied right before the precise extractor.
    brightness_factor: f32,
    /// Sleep between iterations while nothing is detected, to avoid
    /// spinning a live camera at full device frame rate.
    idle_delay: Duration,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Box<dyn FrameSource>,
        preprocessor: FramePreprocessor,
        detector: Box<dyn DetectFaces>,
        extractor: Box<dyn ExtractFace>,
        gate: DetectionGate,
        action: TerminalAction,
        brightness_factor: f32,
        idle_delay: Duration,
    ) -> Self {
        Self {
            source,
            preprocessor,
            detector,
            extractor,
            gate,
            action,
            brightness_factor,
            idle_delay,
        }
    }

    /// Run until the source is exhausted (file sources) or a read fails
    /// (live sources, fatal).
    pub fn run(&mut self) -> Result<()> {
        loop {
            let Some(raw) = self.source.next_frame().context("frame source read failed")? else {
                tracing::info!("frame source exhausted, stopping");
                return Ok(());
            };

            let frame = self.preprocessor.apply(&raw);
            let detections = self.detector.detect(&frame)?;

            match self.gate.observe(&detections) {
                GateState::Ready => {
                    self.run_cascade(&frame)?;
                    // Reset-and-reopen happens whatever the cascade produced,
                    // so the next read is a fresh frame and the streak
                    // restarts from zero.
                    self.gate.reset();
                    self.source.reopen().context("frame source reopen failed")?;
                }
                _ if detections.is_empty() => {
                    std::thread::sleep(self.idle_delay);
                }
                _ => {}
            }
        }
    }

    /// The expensive half: extract, then hand the crop to the terminal
    /// action. Runs exactly once per gate firing.
    fn run_cascade(&mut self, frame: &Frame) -> Result<()> {
        tracing::info!(sequence = frame.sequence, "detection streak complete, running cascade");

        let bright = preprocess::brighten(frame, self.brightness_factor);

        let Some(crop) = self.extractor.extract(&bright)? else {
            tracing::info!("no face cleared the extraction confidence bar");
            return Ok(());
        };

        match &mut self.action {
            TerminalAction::Recognize {
                embedder,
                classifier,
                dispatcher,
            } => {
                let embeddings = embedder.embed(std::slice::from_ref(&crop))?;
                let embedding = embeddings
                    .first()
                    .context("embedding model returned no output for one crop")?;

                match classifier.classify(embedding)? {
                    Identity::Known(name) => {
                        tracing::info!(identity = %name, "recognized");
                        dispatcher.dispatch(&name);
                    }
                    Identity::Unknown => {
                        tracing::info!("face not recognized as a trained identity");
                    }
                }
            }
            TerminalAction::Collect { sink } => {
                let path = sink.save(&crop)?;
                tracing::info!(path = %path.display(), "saved face crop");
            }
        }

        Ok(())
    }
}
