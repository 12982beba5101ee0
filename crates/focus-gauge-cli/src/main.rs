//! Focus Gauge CLI - concentration estimation from camera or image frames.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{Cli, Commands, ExitCode};
use config::AppConfig;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load();

    let result = match cli.command {
        Commands::Replay(ref args) => commands::replay::run(args, &config),
        #[cfg(feature = "camera")]
        Commands::Watch(ref args) => commands::watch::run(args, &config),
        Commands::Models(ref args) => commands::models::run(args, &config).map(|()| ExitCode::Success),
    };

    match result {
        Ok(code) => code.into(),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::Error.into()
        }
    }
}
