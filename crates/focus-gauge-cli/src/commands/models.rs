//! Models command - manage ML models.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use focus_gauge_adapters::models::{ensure_models, list_models, models_dir, MODELS};
use indicatif::ProgressBar;

use crate::config::AppConfig;

/// Arguments for the models command
#[derive(Args)]
pub struct ModelsArgs {
    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR", global = true)]
    pub models_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Models subcommands
#[derive(Subcommand)]
pub enum ModelsCommand {
    /// Download required models
    Fetch {
        /// Download again even if present
        #[arg(long)]
        force: bool,
    },
    /// List installed models
    List,
    /// Print model directory path
    Path,
}

/// Run the models command.
///
/// # Errors
///
/// Returns an error if a download fails.
pub fn run(args: &ModelsArgs, config: &AppConfig) -> Result<()> {
    let dir = args
        .models_dir
        .clone()
        .or_else(|| config.models.dir.clone())
        .unwrap_or_else(models_dir);

    match args.command {
        ModelsCommand::Fetch { force } => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_message(format!("Fetching models into {}", dir.display()));
            spinner.enable_steady_tick(std::time::Duration::from_millis(100));
            let result = ensure_models(&dir, force);
            spinner.finish_and_clear();
            result?;
            println!("All models downloaded to {}", dir.display());
        }
        ModelsCommand::List => {
            let models = list_models(&dir);
            println!("Models directory: {}", dir.display());
            println!();
            for (name, installed) in &models {
                let status = if *installed { "✓" } else { "✗" };
                let filename = MODELS
                    .iter()
                    .find(|m| m.name == *name)
                    .map_or("unknown", |m| m.filename);
                println!("  {status} {name} ({filename})");
            }
            println!();
            let installed_count = models.iter().filter(|(_, installed)| *installed).count();
            println!("{}/{} models installed", installed_count, models.len());
        }
        ModelsCommand::Path => println!("{}", dir.display()),
    }
    Ok(())
}
