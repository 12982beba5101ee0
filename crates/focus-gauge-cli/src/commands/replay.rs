//! Replay command - score image files as consecutive frames.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use focus_gauge_adapters::FsFrameSource;
use focus_gauge_core::FrameSource;
use tracing::info;

use super::pipeline::{run_session, PipelineArgs};
use super::ExitCode;
use crate::config::AppConfig;

/// Arguments for the replay command.
#[derive(Args, Clone)]
pub struct ReplayArgs {
    /// Image files or directories, replayed in sorted path order
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    pub max_frames: Option<usize>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Run the replay command.
///
/// # Errors
///
/// Returns an error if no images are found or outputs fail.
pub fn run(args: &ReplayArgs, config: &AppConfig) -> Result<ExitCode> {
    let pipeline = args.pipeline.clone().with_config(config);
    let mut source = FsFrameSource::new(&args.paths, args.recursive);

    if source.count_hint() == Some(0) {
        anyhow::bail!("No images found in the given paths");
    }
    info!("Replaying {} images", source.files().len());

    run_session(&mut source, &pipeline, Duration::ZERO, args.max_frames)
}
