//! mien — face enrollment and recognition over recorded captures.
//!
//! The live camera and face detector are collaborators of the pipeline,
//! not part of it; this binary stands in for them by replaying capture
//! files (a JSON array of frames, each `{"faces": [...]}` in the detector
//! output format) and printing the labels the pipeline produces.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mien_core::DetectedFace;
use mien_pipeline::{
    spawn_pipeline, Config, GalleryStore, PipelineError, PipelineEvent, PipelineHandle,
};
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "mien", about = "Mien face enrollment and recognition CLI")]
struct Cli {
    /// Gallery file path (overrides MIEN_GALLERY_PATH)
    #[arg(long, global = true)]
    gallery: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a new identity from a recorded landmark capture
    Enroll {
        /// Name for the new identity
        #[arg(short, long)]
        name: String,
        /// Capture file to replay
        capture: PathBuf,
    },
    /// Recognize faces in a recorded landmark capture
    Recognize {
        /// Capture file to replay
        capture: PathBuf,
    },
    /// List enrolled identities
    List,
    /// Clear the whole gallery
    Clear,
}

/// One recorded frame of detector output.
#[derive(Deserialize)]
struct CaptureFrame {
    #[serde(default)]
    faces: Vec<DetectedFace>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(gallery) = cli.gallery {
        config.gallery_path = gallery;
    }

    match cli.command {
        Commands::Enroll { name, capture } => {
            let frames = load_capture(&capture)?;
            let handle = open_pipeline(config)?;
            run_enroll(&handle, &name, frames).await
        }
        Commands::Recognize { capture } => {
            let frames = load_capture(&capture)?;
            let handle = open_pipeline(config)?;
            run_recognize(&handle, frames).await
        }
        Commands::List => {
            let handle = open_pipeline(config)?;
            let summaries = handle.identities().await?;
            if summaries.is_empty() {
                println!("no identities enrolled");
            } else {
                for summary in summaries {
                    println!("{} ({} samples)", summary.name, summary.samples);
                }
            }
            Ok(())
        }
        Commands::Clear => {
            // Deliberately bypasses the pipeline: clearing must work even
            // when the gallery is too corrupt to load.
            let store = GalleryStore::open(&config.gallery_path)?;
            store.clear()?;
            println!("gallery cleared");
            Ok(())
        }
    }
}

/// Spawn the pipeline, turning a corrupt-gallery failure into actionable
/// advice rather than a bare parse error.
fn open_pipeline(config: Config) -> Result<PipelineHandle> {
    match spawn_pipeline(config) {
        Ok(handle) => Ok(handle),
        Err(PipelineError::Store(e)) if e.is_corrupt() => {
            bail!("gallery is corrupt ({e}); run `mien clear` to discard it or restore a backup")
        }
        Err(e) => Err(e.into()),
    }
}

fn load_capture(path: &Path) -> Result<Vec<CaptureFrame>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read capture file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("capture file {} is not a valid frame array", path.display()))
}

async fn run_enroll(
    handle: &PipelineHandle,
    name: &str,
    frames: Vec<CaptureFrame>,
) -> Result<()> {
    let mut events = handle.subscribe();
    handle.start_enrollment(name).await?;

    let mut committed = false;
    'replay: for (i, frame) in frames.into_iter().enumerate() {
        let annotations = handle.process_frame(frame.faces).await?;
        for annotation in &annotations {
            if let Some(label) = &annotation.label {
                println!("frame {i}: {label}");
            }
        }

        while let Ok(event) = events.try_recv() {
            if let PipelineEvent::EnrollmentCommitted { name, samples } = event {
                println!("enrolled '{name}' with {samples} samples");
                committed = true;
                break 'replay;
            }
        }
    }

    if !committed {
        if let Some(cancelled) = handle.cancel_enrollment().await? {
            bail!(
                "capture ended after {} samples; enrollment discarded",
                cancelled.collected
            );
        }
    }

    // Make sure the gallery write has hit disk before we exit.
    handle.flush().await?;
    Ok(())
}

async fn run_recognize(handle: &PipelineHandle, frames: Vec<CaptureFrame>) -> Result<()> {
    for (i, frame) in frames.into_iter().enumerate() {
        let annotations = handle.process_frame(frame.faces).await?;
        if annotations.is_empty() {
            println!("frame {i}: no faces");
            continue;
        }
        for (j, annotation) in annotations.iter().enumerate() {
            match &annotation.label {
                Some(label) => println!("frame {i} face {j}: {label}"),
                None => println!("frame {i} face {j}: (no landmarks)"),
            }
        }
    }
    Ok(())
}
