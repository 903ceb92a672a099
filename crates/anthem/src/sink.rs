//! Persists face crops during dataset collection.

use anthem_core::types::FaceCrop;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// Writes aligned face crops as PNG files with timestamped names, one
/// file per cascade run. The directory is created up front so a bad
/// output path fails at startup, not on the first recognized face.
pub struct CropSink {
    dir: PathBuf,
}

impl CropSink {
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Save one crop; returns the path it was written to.
    pub fn save(&self, crop: &FaceCrop) -> Result<PathBuf> {
        let name = format!(
            "face-{}.png",
            chrono::Local::now().format("%Y%m%d-%Hh%Mm%Ss")
        );
        let path = self.dir.join(name);

        let side = crop.size as u32;
        let img = image::GrayImage::from_raw(side, side, crop.data.clone())
            .ok_or_else(|| anyhow!("crop buffer does not match {}x{}", side, side))?;
        img.save(&path)
            .with_context(|| format!("writing {}", path.display()))?;

        Ok(path)
    }
}
