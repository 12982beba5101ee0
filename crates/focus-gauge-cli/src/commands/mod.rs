//! CLI command definitions and handlers.

pub mod models;
pub mod pipeline;
pub mod replay;
#[cfg(feature = "camera")]
pub mod watch;

use clap::{Parser, Subcommand};

/// Focus Gauge - estimate concentration from face and gaze
#[derive(Parser)]
#[command(name = "focus-gauge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Score image files as a sequence of frames
    Replay(replay::ReplayArgs),
    /// Score frames from a live camera
    #[cfg(feature = "camera")]
    Watch(watch::WatchArgs),
    /// Manage ML models
    Models(models::ModelsArgs),
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every frame was scored by a running processor.
    Success = 0,
    /// The processor never started; records carry a system error.
    Degraded = 1,
    /// Arguments, configuration or I/O failed.
    Error = 2,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}
