//! Frame sources: live camera and image directories.
//!
//! The pipeline owns exactly one source, reads it one frame at a time,
//! and tears it down and reopens it after every cascade run so the next
//! read returns a genuinely fresh frame rather than one buffered while
//! the slow models were running.

use crate::camera::{Camera, CameraError};
use crate::frame::Frame;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("camera: {0}")]
    Camera(#[from] CameraError),
    #[error("failed to read image {path}: {reason}")]
    ImageRead { path: String, reason: String },
    #[error("no frames found under {0}")]
    EmptyDirectory(String),
}

/// A source of frames for the recognition pipeline.
pub trait FrameSource {
    /// Pull one frame.
    ///
    /// `Ok(None)` means the source is cleanly exhausted (end of a file
    /// source) and the pipeline should terminate. An `Err` from a live
    /// source is fatal.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Close and reopen the underlying device. Called after every cascade
    /// run. A no-op for file-backed sources.
    fn reopen(&mut self) -> Result<(), SourceError>;

    /// Whether this source is a live device (read failures fatal) or a
    /// finite recording.
    fn is_live(&self) -> bool;
}

/// Live V4L2 camera source.
pub struct CameraSource {
    device_path: String,
    /// `None` only after a failed reopen, which is fatal to the pipeline.
    camera: Option<Camera>,
    sequence: u64,
}

impl CameraSource {
    pub fn open(device_path: &str) -> Result<Self, SourceError> {
        let camera = Camera::open(device_path)?;
        Ok(Self {
            device_path: device_path.to_string(),
            camera: Some(camera),
            sequence: 0,
        })
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let camera = self.camera.as_ref().ok_or_else(|| {
            SourceError::Camera(CameraError::CaptureFailed("camera handle closed".into()))
        })?;
        let mut frame = camera.capture_frame()?;
        // Driver sequence resets on reopen; keep our own monotonic counter.
        frame.sequence = self.sequence;
        self.sequence += 1;
        Ok(Some(frame))
    }

    fn reopen(&mut self) -> Result<(), SourceError> {
        tracing::debug!(device = %self.device_path, "reopening camera");
        // Release the old handle first; drivers refuse a second open.
        self.camera = None;
        self.camera = Some(Camera::open(&self.device_path)?);
        Ok(())
    }

    fn is_live(&self) -> bool {
        true
    }
}

/// Finite source reading grayscale frames from image files in a directory.
///
/// Frames are served in lexicographic filename order. Useful for offline
/// runs against recorded footage dumped as stills.
pub struct ImageDirSource {
    paths: Vec<PathBuf>,
    next_idx: usize,
    sequence: u64,
}

impl ImageDirSource {
    pub fn open(dir: &Path) -> Result<Self, SourceError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| SourceError::ImageRead {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("png") | Some("jpg") | Some("jpeg")
                )
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(SourceError::EmptyDirectory(dir.display().to_string()));
        }

        tracing::info!(dir = %dir.display(), frames = paths.len(), "opened image directory source");

        Ok(Self {
            paths,
            next_idx: 0,
            sequence: 0,
        })
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(path) = self.paths.get(self.next_idx) else {
            return Ok(None);
        };
        self.next_idx += 1;

        let img = image::ImageReader::open(path)
            .map_err(|e| SourceError::ImageRead {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
            .decode()
            .map_err(|e| SourceError::ImageRead {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
            .to_luma8();

        let frame = Frame {
            width: img.width(),
            height: img.height(),
            data: img.into_raw(),
            timestamp: std::time::Instant::now(),
            sequence: self.sequence,
        };
        self.sequence += 1;

        Ok(Some(frame))
    }

    fn reopen(&mut self) -> Result<(), SourceError> {
        // Nothing buffers in a file source; keep advancing.
        Ok(())
    }

    fn is_live(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_dir_source_serves_in_order_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png"] {
            let img = image::GrayImage::from_pixel(4, 4, image::Luma([128u8]));
            img.save(dir.path().join(name)).unwrap();
        }

        let mut source = ImageDirSource::open(dir.path()).unwrap();

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!((first.width, first.height), (4, 4));

        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.sequence, 1);

        assert!(source.next_frame().unwrap().is_none());
        assert!(!source.is_live());
    }

    #[test]
    fn test_image_dir_source_reopen_does_not_rewind() {
        let dir = tempfile::tempdir().unwrap();
        let img = image::GrayImage::from_pixel(2, 2, image::Luma([10u8]));
        img.save(dir.path().join("only.png")).unwrap();

        let mut source = ImageDirSource::open(dir.path()).unwrap();
        assert!(source.next_frame().unwrap().is_some());
        source.reopen().unwrap();
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_image_dir_source_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageDirSource::open(dir.path()),
            Err(SourceError::EmptyDirectory(_))
        ));
    }

    #[test]
    fn test_image_dir_source_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hi").unwrap();
        assert!(matches!(
            ImageDirSource::open(dir.path()),
            Err(SourceError::EmptyDirectory(_))
        ));
    }
}
