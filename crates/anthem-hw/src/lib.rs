//! anthem-hw — Camera capture, frames, and preprocessing.
//!
//! Provides V4L2-based camera access, the grayscale [`Frame`] type, the
//! deterministic per-frame preprocessor, and the [`FrameSource`]
//! abstraction over live cameras and image directories.

pub mod camera;
pub mod frame;
pub mod preprocess;
pub mod source;

pub use camera::{Camera, CameraError, PixelFormat};
pub use frame::Frame;
pub use preprocess::FramePreprocessor;
pub use source::{CameraSource, FrameSource, ImageDirSource, SourceError};
