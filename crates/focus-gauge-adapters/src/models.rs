//! Model downloading and caching adapter.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Placeholder checksum indicating verification should be skipped.
const PLACEHOLDER_CHECKSUM: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Model metadata.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model name/identifier.
    pub name: &'static str,
    /// Download URL.
    pub url: &'static str,
    /// Expected SHA256 hash. All zeros skips verification.
    pub sha256: &'static str,
    /// Filename in models directory.
    pub filename: &'static str,
}

/// Face presence detector (short-range BlazeFace).
pub const FACE_DETECTOR: &str = "blazeface";
/// 468-point face mesh.
pub const FACE_MESH: &str = "face_mesh";

/// Known models.
pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: FACE_DETECTOR,
        url: "https://github.com/focus-gauge/focus-gauge/releases/download/models-v1/blazeface.safetensors",
        sha256: PLACEHOLDER_CHECKSUM,
        filename: "blazeface.safetensors",
    },
    ModelInfo {
        name: FACE_MESH,
        url: "https://github.com/focus-gauge/focus-gauge/releases/download/models-v1/face_mesh.safetensors",
        sha256: PLACEHOLDER_CHECKSUM,
        filename: "face_mesh.safetensors",
    },
];

/// Returns the default models directory.
///
/// Uses `XDG_DATA_HOME/focus-gauge/models` or `~/.local/share/focus-gauge/models`.
#[must_use]
pub fn models_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("focus-gauge")
        .join("models")
}

/// Looks up a model by name.
#[must_use]
pub fn model_info(name: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.name == name)
}

/// Returns the path to a specific model file in the default directory.
#[must_use]
pub fn model_path(name: &str) -> Option<PathBuf> {
    model_path_in(&models_dir(), name)
}

/// Returns the path to a specific model file in `dir`.
#[must_use]
pub fn model_path_in(dir: &Path, name: &str) -> Option<PathBuf> {
    model_info(name).map(|m| dir.join(m.filename))
}

/// Downloads every model missing from `dir`.
///
/// # Errors
///
/// Returns an error if:
/// - The models directory cannot be created
/// - A model download fails
/// - A model's checksum doesn't match
pub fn ensure_models(dir: &Path, force: bool) -> Result<()> {
    fs::create_dir_all(dir).context("Failed to create models directory")?;

    for model in MODELS {
        let path = dir.join(model.filename);
        if path.exists() && !force {
            debug!("Model {} already exists", model.name);
        } else {
            download_model(model, &path)?;
        }
    }

    Ok(())
}

fn download_model(model: &ModelInfo, path: &Path) -> Result<()> {
    info!("Downloading model: {}", model.name);

    let response = reqwest::blocking::get(model.url)
        .with_context(|| format!("Failed to download {}", model.name))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status: {}", response.status());
    }

    let bytes = response
        .bytes()
        .with_context(|| format!("Failed to read response for {}", model.name))?;

    verify_checksum(model, &bytes, path)?;
    fs::write(path, &bytes).with_context(|| format!("Failed to write {}", model.name))?;

    info!("Downloaded {} ({} bytes)", model.name, bytes.len());
    Ok(())
}

/// Compares `bytes` against the model's expected SHA256.
fn verify_checksum(model: &ModelInfo, bytes: &[u8], path: &Path) -> Result<()> {
    if model.sha256 == PLACEHOLDER_CHECKSUM {
        debug!("Skipping checksum verification for {}", model.name);
        return Ok(());
    }

    let hash = format!("{:x}", Sha256::digest(bytes));
    if hash != model.sha256 {
        anyhow::bail!(
            "Checksum mismatch for {}: expected {}, got {}. \
             Try deleting {} and re-running to download a fresh copy.",
            model.name,
            model.sha256,
            hash,
            path.display()
        );
    }
    Ok(())
}

/// Lists models with whether each is present in `dir`.
#[must_use]
pub fn list_models(dir: &Path) -> Vec<(&'static str, bool)> {
    MODELS
        .iter()
        .map(|m| (m.name, dir.join(m.filename).exists()))
        .collect()
}

/// Checks if all models are present in `dir`.
#[must_use]
pub fn all_models_installed(dir: &Path) -> bool {
    list_models(dir).iter().all(|(_, present)| *present)
}
