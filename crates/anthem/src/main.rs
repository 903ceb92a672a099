use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod gate;
mod pipeline;
mod sink;

use anthem_core::{ComputeBackend, FastFaceDetector, IdentityClassifier, PreciseFaceExtractor};
use anthem_hw::{Camera, CameraSource, FramePreprocessor, FrameSource, ImageDirSource};
use anthem_player::{
    ActionDispatcher, LocalCatalog, Player, PlaybackMode, SpotifyCatalog, SpotifyEntry,
    TrackResolver,
};
use config::Config;
use gate::DetectionGate;
use pipeline::{Pipeline, TerminalAction};
use sink::CropSink;

#[derive(Parser)]
#[command(name = "anthem", about = "Plays each person's music when their face is recognized")]
struct Cli {
    /// Path to a TOML config file (default: $XDG_CONFIG_HOME/anthem/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the camera and play music for recognized people
    Run {
        /// Read frames from a directory of images instead of the camera
        #[arg(long)]
        frames: Option<PathBuf>,
    },
    /// Save detected face crops to disk for training a classifier
    Collect {
        /// Output directory (overrides the configured one)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Read frames from a directory of images instead of the camera
        #[arg(long)]
        frames: Option<PathBuf>,
    },
    /// List usable camera devices
    Devices,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { frames } => {
            let action = recognize_action(&config)?;
            run_pipeline(&config, frames.as_deref(), action)
        }
        Commands::Collect { output, frames } => {
            let dir = output.unwrap_or_else(|| config.output_dir.clone());
            let action = TerminalAction::Collect {
                sink: CropSink::create(&dir)?,
            };
            run_pipeline(&config, frames.as_deref(), action)
        }
        Commands::Devices => {
            list_devices();
            Ok(())
        }
    }
}

/// Load every model up front so a bad path fails before the camera opens.
fn recognize_action(config: &Config) -> Result<TerminalAction> {
    let backend = ComputeBackend::Cpu {
        intra_threads: config.inference_threads,
    };

    // Crops come straight from the extractor, so input standardization is on.
    let embedder = anthem_core::EmbeddingModel::load(
        &config.embedder_path().to_string_lossy(),
        true,
        backend,
    )
    .context("loading embedding model")?;

    let classifier = IdentityClassifier::load(
        &config.classifier_path().to_string_lossy(),
        &config.sentinel_label,
    )
    .context("loading identity classifier")?;

    // A trained class with no catalog entry would be recognized silently.
    for class in classifier.classes() {
        if class != &config.sentinel_label && !config.identities.contains_key(class) {
            tracing::warn!(identity = %class, "classifier knows this identity but no music is configured");
        }
    }

    let player = Player::from_command(&config.player_command).context("parsing player_command")?;
    let mode = match config.preview_secs {
        Some(secs) => PlaybackMode::Preview(std::time::Duration::from_secs(secs)),
        None => PlaybackMode::Full,
    };
    let dispatcher = ActionDispatcher::new(
        build_resolver(config)?,
        player,
        config.tracks_per_recognition,
        mode,
    );

    Ok(TerminalAction::Recognize {
        embedder: Box::new(embedder),
        classifier: Box::new(classifier),
        dispatcher: Box::new(dispatcher),
    })
}

/// Build one resolver for all identities. Local file lists and Spotify
/// playlists cannot be mixed in the same config.
fn build_resolver(config: &Config) -> Result<Arc<dyn TrackResolver>> {
    let mut local: HashMap<String, Vec<String>> = HashMap::new();
    let mut spotify: HashMap<String, SpotifyEntry> = HashMap::new();

    for (name, entry) in &config.identities {
        if let Some(playlist) = &entry.playlist {
            let client_id = entry
                .client_id
                .clone()
                .with_context(|| format!("identity {name}: playlist set but client_id missing"))?;
            let client_secret = entry.client_secret.clone().with_context(|| {
                format!("identity {name}: playlist set but client_secret missing")
            })?;
            spotify.insert(
                name.clone(),
                SpotifyEntry {
                    client_id,
                    client_secret,
                    playlist: playlist.clone(),
                },
            );
        } else if !entry.tracks.is_empty() {
            local.insert(name.clone(), entry.tracks.clone());
        } else {
            bail!("identity {name}: configure either tracks or a playlist");
        }
    }

    match (local.is_empty(), spotify.is_empty()) {
        (false, true) => Ok(Arc::new(LocalCatalog::new(local))),
        (true, false) => Ok(Arc::new(SpotifyCatalog::new(spotify))),
        (true, true) => bail!("no identities configured; add [identities.<name>] tables"),
        (false, false) => bail!("mixing local tracks and playlists is not supported"),
    }
}

fn run_pipeline(config: &Config, frames: Option<&Path>, action: TerminalAction) -> Result<()> {
    let backend = ComputeBackend::Cpu {
        intra_threads: config.inference_threads,
    };

    let detector = FastFaceDetector::load(
        &config.fast_detector_path().to_string_lossy(),
        backend,
    )
    .context("loading fast face detector")?;

    let extractor = PreciseFaceExtractor::load(
        &config.precise_detector_path().to_string_lossy(),
        config.extract_confidence,
        backend,
    )
    .context("loading precise face extractor")?;

    let source: Box<dyn FrameSource> = match frames {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "reading frames from directory");
            Box::new(ImageDirSource::open(dir)?)
        }
        None => {
            tracing::info!(device = %config.camera_device, "opening camera");
            Box::new(CameraSource::open(&config.camera_device)?)
        }
    };

    let preprocessor = FramePreprocessor {
        top_crop: config.top_crop,
        rotate_180: config.rotate_180,
    };

    let mut pipeline = Pipeline::new(
        source,
        preprocessor,
        Box::new(detector),
        Box::new(extractor),
        DetectionGate::new(config.detection_threshold),
        action,
        config.brightness_factor,
        config.idle_delay(),
    );

    tracing::info!("anthem pipeline running");
    pipeline.run()
}

fn list_devices() {
    let devices = Camera::list_devices();
    if devices.is_empty() {
        println!("No video capture devices found");
        return;
    }
    for dev in devices {
        println!("{}\t{} ({}, {})", dev.path, dev.name, dev.driver, dev.bus);
    }
}
