//! Configuration: TOML file plus `ANTHEM_*` environment overrides.
//!
//! Everything has a default, so the binary runs with no config file at
//! all. The file supplies the identities table (who gets which music);
//! environment variables override the scalar knobs for quick tuning
//! without editing the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// V4L2 device path.
    pub camera_device: String,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Identity classifier bundle; defaults to identities.json in model_dir.
    pub classifier_path: Option<PathBuf>,
    /// Consecutive detecting frames required before the cascade runs.
    pub detection_threshold: u32,
    /// Brightness boost applied before precise extraction.
    pub brightness_factor: f32,
    /// Confidence the precise detector must strictly exceed.
    pub extract_confidence: f32,
    /// Sleep between iterations while nothing is detected.
    pub idle_delay_secs: f32,
    /// How many tracks to play per recognition.
    pub tracks_per_recognition: usize,
    /// Classifier label treated as "not a trained identity".
    pub sentinel_label: String,
    /// Rows cropped off the top of every frame before detection.
    pub top_crop: u32,
    /// Whether frames arrive upside down (ceiling-mounted camera).
    pub rotate_180: bool,
    /// Intra-op threads for ONNX Runtime sessions.
    pub inference_threads: usize,
    /// External player invocation; tracks are appended as arguments.
    pub player_command: String,
    /// If set, stop each track after this many seconds (preview playback).
    pub preview_secs: Option<u64>,
    /// Where collect mode writes face crops.
    pub output_dir: PathBuf,
    /// Per-person music catalogs, keyed by classifier label.
    pub identities: HashMap<String, IdentityEntry>,
}

/// One identity's music source: either local track paths, or a Spotify
/// playlist with that person's own application credentials.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdentityEntry {
    pub tracks: Vec<String>,
    pub playlist: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_device: "/dev/video0".to_string(),
            model_dir: default_model_dir(),
            classifier_path: None,
            detection_threshold: 3,
            brightness_factor: 2.5,
            extract_confidence: 0.95,
            idle_delay_secs: 0.1,
            tracks_per_recognition: 2,
            sentinel_label: "misc".to_string(),
            top_crop: 0,
            rotate_180: true,
            inference_threads: 2,
            player_command: "mpv --no-video --really-quiet".to_string(),
            preview_secs: None,
            output_dir: PathBuf::from("faces"),
            identities: HashMap::new(),
        }
    }
}

impl Config {
    /// Load from `path` if given, else from the default location if it
    /// exists, else pure defaults. Environment overrides apply last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .with_context(|| format!("reading config file {}", p.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("parsing config file {}", p.display()))?
            }
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    let text = std::fs::read_to_string(&default_path)
                        .with_context(|| format!("reading {}", default_path.display()))?;
                    toml::from_str(&text)
                        .with_context(|| format!("parsing {}", default_path.display()))?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("ANTHEM_CAMERA_DEVICE") {
            self.camera_device = v;
        }
        if let Ok(v) = std::env::var("ANTHEM_MODEL_DIR") {
            self.model_dir = PathBuf::from(v);
        }
        self.detection_threshold = env_u32("ANTHEM_DETECTION_THRESHOLD", self.detection_threshold);
        self.brightness_factor = env_f32("ANTHEM_BRIGHTNESS_FACTOR", self.brightness_factor);
        self.extract_confidence = env_f32("ANTHEM_EXTRACT_CONFIDENCE", self.extract_confidence);
        self.idle_delay_secs = env_f32("ANTHEM_IDLE_DELAY_SECS", self.idle_delay_secs);
        self.tracks_per_recognition =
            env_usize("ANTHEM_TRACKS_PER_RECOGNITION", self.tracks_per_recognition);
        self.inference_threads = env_usize("ANTHEM_INFERENCE_THREADS", self.inference_threads);
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_secs_f32(self.idle_delay_secs.max(0.0))
    }

    /// Path to the small SCRFD model that gates the pipeline.
    pub fn fast_detector_path(&self) -> PathBuf {
        self.model_dir.join("det_500m.onnx")
    }

    /// Path to the heavy SCRFD model used for extraction.
    pub fn precise_detector_path(&self) -> PathBuf {
        self.model_dir.join("det_10g.onnx")
    }

    /// Path to the ArcFace embedding model.
    pub fn embedder_path(&self) -> PathBuf {
        self.model_dir.join("w600k_r50.onnx")
    }

    /// Path to the identity classifier bundle.
    pub fn classifier_path(&self) -> PathBuf {
        self.classifier_path
            .clone()
            .unwrap_or_else(|| self.model_dir.join("identities.json"))
    }
}

fn default_model_dir() -> PathBuf {
    default_data_dir().join("models")
}

fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("anthem")
}

fn default_config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        })
        .join("anthem/config.toml")
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.detection_threshold, 3);
        assert_eq!(config.brightness_factor, 2.5);
        assert_eq!(config.extract_confidence, 0.95);
        assert_eq!(config.idle_delay_secs, 0.1);
        assert_eq!(config.tracks_per_recognition, 2);
        assert_eq!(config.sentinel_label, "misc");
        assert!(config.rotate_180);
        assert!(config.identities.is_empty());
    }

    #[test]
    fn test_parse_toml_with_identities() {
        let text = r#"
            camera_device = "/dev/video2"
            detection_threshold = 5
            player_command = "vlc --intf dummy"

            [identities.alice]
            tracks = ["/music/a.mp3", "/music/b.mp3"]

            [identities.bob]
            playlist = "spotify:playlist:37i9dQ"
            client_id = "id"
            client_secret = "secret"
        "#;

        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.camera_device, "/dev/video2");
        assert_eq!(config.detection_threshold, 5);
        // Unspecified keys keep their defaults.
        assert_eq!(config.brightness_factor, 2.5);

        assert_eq!(config.identities["alice"].tracks.len(), 2);
        assert_eq!(
            config.identities["bob"].playlist.as_deref(),
            Some("spotify:playlist:37i9dQ")
        );
    }

    #[test]
    fn test_model_paths_derive_from_model_dir() {
        let config = Config {
            model_dir: PathBuf::from("/models"),
            ..Config::default()
        };
        assert_eq!(config.fast_detector_path(), PathBuf::from("/models/det_500m.onnx"));
        assert_eq!(config.precise_detector_path(), PathBuf::from("/models/det_10g.onnx"));
        assert_eq!(config.embedder_path(), PathBuf::from("/models/w600k_r50.onnx"));
        assert_eq!(config.classifier_path(), PathBuf::from("/models/identities.json"));
    }

    #[test]
    fn test_explicit_classifier_path_wins() {
        let config = Config {
            classifier_path: Some(PathBuf::from("/elsewhere/people.json")),
            ..Config::default()
        };
        assert_eq!(config.classifier_path(), PathBuf::from("/elsewhere/people.json"));
    }

    #[test]
    fn test_idle_delay_never_negative() {
        let config = Config {
            idle_delay_secs: -1.0,
            ..Config::default()
        };
        assert_eq!(config.idle_delay(), Duration::ZERO);
    }

    #[test]
    fn test_env_override_applies() {
        let mut config = Config::default();
        std::env::set_var("ANTHEM_DETECTION_THRESHOLD", "7");
        config.apply_env();
        std::env::remove_var("ANTHEM_DETECTION_THRESHOLD");
        assert_eq!(config.detection_threshold, 7);
    }

    #[test]
    fn test_load_missing_explicit_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/anthem.toml"))).is_err());
    }
}
