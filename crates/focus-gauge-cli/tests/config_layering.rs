//! Integration tests for configuration layering.
//!
//! Tests the full priority chain: hardcoded defaults < XDG config < project config < CLI args

#![allow(clippy::unwrap_used)] // Test code uses unwrap for brevity
#![allow(deprecated)] // cargo_bin deprecation warning

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn focus_gauge(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("focus-gauge").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"));
    cmd
}

fn frames_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..2 {
        image::RgbImage::from_pixel(16, 16, image::Rgb([40, 40, 40]))
            .save(dir.path().join(format!("{i}.png")))
            .unwrap();
    }
    dir
}

fn write_xdg(home: &Path, body: &str) {
    let dir = home.join("config/focus-gauge");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), body).unwrap();
}

#[test]
fn test_project_config_applies_format() {
    let home = tempfile::tempdir().unwrap();
    let frames = frames_dir();
    fs::write(home.path().join(".focus-gauge.toml"), "[output]\nformat = 'json'\n").unwrap();

    let output = focus_gauge(home.path())
        .args(["replay", "-q"])
        .arg(frames.path())
        .output()
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(parsed.is_array());
}

#[test]
fn test_cli_overrides_project_config() {
    let home = tempfile::tempdir().unwrap();
    let frames = frames_dir();
    fs::write(home.path().join(".focus-gauge.toml"), "[output]\nformat = 'json'\n").unwrap();

    let output = focus_gauge(home.path())
        .args(["replay", "-q", "--format", "jsonl"])
        .arg(frames.path())
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 2);
}

#[test]
fn test_project_config_overrides_xdg() {
    let home = tempfile::tempdir().unwrap();
    let frames = frames_dir();
    write_xdg(home.path(), "[output]\nformat = 'json'\n");
    fs::write(home.path().join(".focus-gauge.toml"), "[output]\nformat = 'jsonl'\n").unwrap();

    let output = focus_gauge(home.path())
        .args(["replay", "-q"])
        .arg(frames.path())
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 2);
}

#[test]
fn test_xdg_models_dir_used() {
    let home = tempfile::tempdir().unwrap();
    write_xdg(home.path(), "[models]\ndir = '/srv/focus-models'\n");

    focus_gauge(home.path())
        .args(["models", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/srv/focus-models"));
}

#[test]
fn test_invalid_config_warns() {
    let home = tempfile::tempdir().unwrap();
    fs::write(
        home.path().join(".focus-gauge.toml"),
        "[gaze]\near_threshold = 4.0\n",
    )
    .unwrap();

    focus_gauge(home.path())
        .args(["models", "path"])
        .assert()
        .success()
        .stderr(predicate::str::contains("gaze.ear_threshold"));
}

#[test]
fn test_unsupported_model_selection_fails() {
    let home = tempfile::tempdir().unwrap();
    let frames = frames_dir();
    fs::write(
        home.path().join(".focus-gauge.toml"),
        "[face]\nmodel_selection = 1\n",
    )
    .unwrap();

    focus_gauge(home.path())
        .args(["replay", "-q"])
        .arg(frames.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("model_selection"));
}
