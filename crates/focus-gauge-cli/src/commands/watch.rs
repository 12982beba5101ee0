//! Watch command - score frames from a live camera.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use focus_gauge_adapters::{CameraConfig, CameraSource};
use tracing::info;

use super::pipeline::{run_session, PipelineArgs};
use super::ExitCode;
use crate::config::AppConfig;

/// Pause after a failed camera read.
const IDLE_DELAY: Duration = Duration::from_millis(100);

/// Arguments for the watch command.
#[derive(Args, Clone)]
pub struct WatchArgs {
    /// Camera device index
    #[arg(long)]
    pub camera: Option<u32>,

    /// Requested frame width
    #[arg(long)]
    pub width: Option<u32>,

    /// Requested frame height
    #[arg(long)]
    pub height: Option<u32>,

    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    pub max_frames: Option<usize>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

impl WatchArgs {
    fn camera_config(&self, config: &AppConfig) -> CameraConfig {
        let defaults = CameraConfig::default();
        CameraConfig {
            index: self.camera.or(config.camera.index).unwrap_or(defaults.index),
            width: self.width.or(config.camera.width).unwrap_or(defaults.width),
            height: self.height.or(config.camera.height).unwrap_or(defaults.height),
            max_retries: config.camera.max_retries.unwrap_or(defaults.max_retries),
            ..defaults
        }
    }
}

/// Run the watch command.
///
/// # Errors
///
/// Returns an error if the camera cannot be opened or outputs fail.
pub fn run(args: &WatchArgs, config: &AppConfig) -> Result<ExitCode> {
    let pipeline = args.pipeline.clone().with_config(config);
    let camera_config = args.camera_config(config);
    info!(
        "Opening camera {} at {}x{}",
        camera_config.index, camera_config.width, camera_config.height
    );

    let mut source = CameraSource::open(camera_config).context("Camera unavailable")?;
    run_session(&mut source, &pipeline, IDLE_DELAY, args.max_frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        watch: WatchArgs,
    }

    #[test]
    fn test_cli_overrides_config() {
        let config: AppConfig =
            toml::from_str("[camera]\nindex = 2\nwidth = 1280\nmax_retries = 7\n")
                .unwrap_or_default();
        let harness = Harness::parse_from(["watch", "--camera", "1"]);
        let camera = harness.watch.camera_config(&config);
        assert_eq!(camera.index, 1);
        assert_eq!(camera.width, 1280);
        assert_eq!(camera.height, 480);
        assert_eq!(camera.max_retries, 7);
    }
}
