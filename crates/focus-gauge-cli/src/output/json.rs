//! JSON output adapter.

use std::io::{self, Write};
use std::sync::Mutex;

use anyhow::Result;
use clap::ValueEnum;
use focus_gauge_core::{ConcentrationStatus, StatusOutput};

/// Output format for status records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per line)
    #[default]
    Jsonl,
    /// Single JSON array, written on flush
    Json,
}

impl OutputFormat {
    /// Parses a config file value.
    #[must_use]
    pub fn from_config(value: &str) -> Option<Self> {
        match value {
            "json" => Some(Self::Json),
            "jsonl" => Some(Self::Jsonl),
            _ => None,
        }
    }
}

struct State {
    writer: Box<dyn Write + Send>,
    pending: Vec<serde_json::Value>,
}

/// Status record output in JSON Lines or JSON array form.
pub struct JsonOutput {
    state: Mutex<State>,
    format: OutputFormat,
    pretty: bool,
}

impl JsonOutput {
    /// Creates a new JSON output writing to stdout.
    #[must_use]
    pub fn stdout(format: OutputFormat, pretty: bool) -> Self {
        Self::new(Box::new(io::stdout()), format, pretty)
    }

    /// Creates a new JSON output writing to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>, format: OutputFormat, pretty: bool) -> Self {
        Self {
            state: Mutex::new(State {
                writer,
                pending: Vec::new(),
            }),
            format,
            pretty,
        }
    }
}

impl StatusOutput for JsonOutput {
    #[allow(clippy::significant_drop_tightening)]
    fn write(&self, status: &ConcentrationStatus) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        match self.format {
            OutputFormat::Jsonl => {
                let json = serde_json::to_string(status)?;
                writeln!(state.writer, "{json}")?;
            }
            OutputFormat::Json => state.pending.push(serde_json::to_value(status)?),
        }
        Ok(())
    }

    #[allow(clippy::significant_drop_tightening)]
    fn flush(&self) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        if self.format == OutputFormat::Json {
            let records = std::mem::take(&mut state.pending);
            let json = if self.pretty {
                serde_json::to_string_pretty(&records)?
            } else {
                serde_json::to_string(&records)?
            };
            writeln!(state.writer, "{json}")?;
        }
        state.writer.flush()?;
        Ok(())
    }
}
