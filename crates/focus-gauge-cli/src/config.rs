//! Configuration file support for focus-gauge.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/focus-gauge/config.toml` (lowest priority)
//! - Project-local: `.focus-gauge.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

/// Project-local config file name.
pub const PROJECT_CONFIG: &str = ".focus-gauge.toml";

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Gaze smoothing and thresholds.
    pub gaze: GazeSection,
    /// Face presence detector settings.
    pub face: FaceSection,
    /// Landmark detector settings.
    pub landmarks: LandmarksSection,
    /// Camera and pull loop settings.
    pub camera: CameraSection,
    /// Debug stream settings.
    pub stream: StreamSection,
    /// Model settings.
    pub models: ModelsSection,
    /// Output formatting settings.
    pub output: OutputSection,
}

/// Gaze estimation configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GazeSection {
    /// Smoothing window length.
    pub history_size: Option<usize>,
    /// Eye aspect ratio below which eyes count as closed.
    pub ear_threshold: Option<f32>,
    /// Lower bound of the focus band (exclusive).
    pub focus_lo: Option<f32>,
    /// Upper bound of the focus band (exclusive).
    pub focus_hi: Option<f32>,
}

/// Face presence configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct FaceSection {
    /// Minimum detection confidence.
    pub min_confidence: Option<f32>,
    /// Detector model selection (only 0 is available).
    pub model_selection: Option<u8>,
}

/// Landmark detector configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LandmarksSection {
    /// Minimum mesh presence confidence.
    pub min_confidence: Option<f32>,
}

/// Camera configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct CameraSection {
    /// Device index.
    pub index: Option<u32>,
    /// Requested frame width.
    pub width: Option<u32>,
    /// Requested frame height.
    pub height: Option<u32>,
    /// Open attempts before giving up.
    pub max_retries: Option<u32>,
    /// Mirror frames horizontally before processing.
    pub mirror: Option<bool>,
    /// Consecutive failed reads before the source is reopened.
    pub max_read_failures: Option<usize>,
}

/// Debug stream configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct StreamSection {
    /// JPEG quality (1-100).
    pub jpeg_quality: Option<u8>,
}

/// Model configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsSection {
    /// Custom models directory path.
    pub dir: Option<PathBuf>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
}

fn check_unit(name: &str, value: Option<f32>) -> Result<(), String> {
    match value {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(format!("{name} must be 0.0-1.0, got {v}")),
        _ => Ok(()),
    }
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/focus-gauge/config.toml`
    /// 2. Project-local: `.focus-gauge.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        if let Err(e) = config.validate() {
            eprintln!("warning: {e}");
        }

        config
    }

    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.gaze.history_size == Some(0) {
            return Err("gaze.history_size must be at least 1".to_string());
        }
        check_unit("gaze.ear_threshold", self.gaze.ear_threshold)?;
        if let (Some(lo), Some(hi)) = (self.gaze.focus_lo, self.gaze.focus_hi) {
            if lo >= hi {
                return Err(format!(
                    "gaze.focus_lo ({lo}) must be below gaze.focus_hi ({hi})"
                ));
            }
        }
        check_unit("face.min_confidence", self.face.min_confidence)?;
        if let Some(selection) = self.face.model_selection {
            if selection != 0 {
                return Err(format!(
                    "face.model_selection must be 0 (short range), got {selection}"
                ));
            }
        }
        check_unit("landmarks.min_confidence", self.landmarks.min_confidence)?;
        if self.camera.max_read_failures == Some(0) {
            return Err("camera.max_read_failures must be at least 1".to_string());
        }
        if let Some(q) = self.stream.jpeg_quality {
            if !(1..=100).contains(&q) {
                return Err(format!("stream.jpeg_quality must be 1-100, got {q}"));
            }
        }
        if let Some(ref f) = self.output.format {
            if f != "json" && f != "jsonl" {
                return Err(format!(
                    "output.format must be 'json' or 'jsonl', got '{f}'"
                ));
            }
        }
        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    pub fn merge(&mut self, other: Self) {
        self.gaze.history_size = other.gaze.history_size.or(self.gaze.history_size);
        self.gaze.ear_threshold = other.gaze.ear_threshold.or(self.gaze.ear_threshold);
        self.gaze.focus_lo = other.gaze.focus_lo.or(self.gaze.focus_lo);
        self.gaze.focus_hi = other.gaze.focus_hi.or(self.gaze.focus_hi);

        self.face.min_confidence = other.face.min_confidence.or(self.face.min_confidence);
        self.face.model_selection = other.face.model_selection.or(self.face.model_selection);

        self.landmarks.min_confidence = other
            .landmarks
            .min_confidence
            .or(self.landmarks.min_confidence);

        self.camera.index = other.camera.index.or(self.camera.index);
        self.camera.width = other.camera.width.or(self.camera.width);
        self.camera.height = other.camera.height.or(self.camera.height);
        self.camera.max_retries = other.camera.max_retries.or(self.camera.max_retries);
        self.camera.mirror = other.camera.mirror.or(self.camera.mirror);
        self.camera.max_read_failures = other
            .camera
            .max_read_failures
            .or(self.camera.max_read_failures);

        self.stream.jpeg_quality = other.stream.jpeg_quality.or(self.stream.jpeg_quality);

        self.models.dir = other.models.dir.or_else(|| self.models.dir.take());

        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("focus-gauge").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.focus-gauge.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(PROJECT_CONFIG);
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}
