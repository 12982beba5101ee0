//! CLI argument validation tests.
//!
//! Tests command-line argument parsing, validation, and error handling.

#![allow(clippy::unwrap_used)]
#![allow(deprecated)] // cargo_bin deprecation

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command isolated from the user's config files.
fn focus_gauge(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("focus-gauge").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"));
    cmd
}

fn frames_dir(count: usize) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..count {
        image::RgbImage::from_pixel(64, 48, image::Rgb([200, 180, 160]))
            .save(dir.path().join(format!("frame_{i:03}.png")))
            .unwrap();
    }
    dir
}

#[test]
fn test_no_subcommand_shows_usage() {
    let home = tempfile::tempdir().unwrap();
    focus_gauge(home.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_replay_requires_paths() {
    let home = tempfile::tempdir().unwrap();
    focus_gauge(home.path())
        .arg("replay")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PATHS").or(predicate::str::contains("required")));
}

#[test]
fn test_empty_directory_is_error() {
    let home = tempfile::tempdir().unwrap();
    let empty = tempfile::tempdir().unwrap();
    focus_gauge(home.path())
        .arg("replay")
        .arg(empty.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No images found"));
}

#[test]
fn test_nonexistent_path_warns() {
    let home = tempfile::tempdir().unwrap();
    focus_gauge(home.path())
        .args(["replay", "/nonexistent/frames/a.png"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_invalid_format_rejected() {
    let home = tempfile::tempdir().unwrap();
    let frames = frames_dir(1);
    focus_gauge(home.path())
        .args(["replay", "--format", "xml"])
        .arg(frames.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("json").or(predicate::str::contains("jsonl")));
}

#[test]
fn test_ear_threshold_above_one_rejected() {
    let home = tempfile::tempdir().unwrap();
    let frames = frames_dir(1);
    focus_gauge(home.path())
        .args(["replay", "--ear-threshold", "1.5"])
        .arg(frames.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("1.5 is not in 0.0..=1.0"));
}

#[test]
fn test_min_face_confidence_non_numeric_rejected() {
    let home = tempfile::tempdir().unwrap();
    let frames = frames_dir(1);
    focus_gauge(home.path())
        .args(["replay", "--min-face-confidence", "high"])
        .arg(frames.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid number"));
}

#[test]
fn test_focus_band_must_be_positive() {
    let home = tempfile::tempdir().unwrap();
    let frames = frames_dir(1);
    focus_gauge(home.path())
        .args(["replay", "--focus-lo", "-1"])
        .arg(frames.path())
        .assert()
        .failure();
}

#[test]
fn test_inverted_focus_band_rejected() {
    let home = tempfile::tempdir().unwrap();
    let frames = frames_dir(1);
    focus_gauge(home.path())
        .args(["replay", "-q", "--focus-lo", "1.5"])
        .arg(frames.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("focus band"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_history_size_zero_rejected() {
    let home = tempfile::tempdir().unwrap();
    let frames = frames_dir(1);
    focus_gauge(home.path())
        .args(["replay", "--history-size", "0"])
        .arg(frames.path())
        .assert()
        .failure();
}

#[test]
fn test_missing_models_degrade() {
    let home = tempfile::tempdir().unwrap();
    let frames = frames_dir(2);
    focus_gauge(home.path())
        .args(["replay", "-q"])
        .arg(frames.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("models fetch"))
        .stdout(predicate::str::contains("System Error: Not Initialized"));
}

#[test]
fn test_verbosity_vv() {
    let home = tempfile::tempdir().unwrap();
    let frames = frames_dir(1);
    focus_gauge(home.path())
        .args(["-vv", "replay", "-q"])
        .arg(frames.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("DEBUG"));
}

#[test]
fn test_max_frames() {
    let home = tempfile::tempdir().unwrap();
    let frames = frames_dir(4);
    let output = focus_gauge(home.path())
        .args(["replay", "-q", "--max-frames", "2"])
        .arg(frames.path())
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 2);
}

#[test]
fn test_models_path_override() {
    let home = tempfile::tempdir().unwrap();
    focus_gauge(home.path())
        .args(["models", "path", "--models-dir", "/opt/weights"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/opt/weights"));
}

#[test]
fn test_models_path_default() {
    let home = tempfile::tempdir().unwrap();
    focus_gauge(home.path())
        .args(["models", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("focus-gauge/models"));
}

#[test]
fn test_models_list_reports_missing() {
    let home = tempfile::tempdir().unwrap();
    focus_gauge(home.path())
        .args(["models", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("blazeface"))
        .stdout(predicate::str::contains("face_mesh"))
        .stdout(predicate::str::contains("0/2 models installed"));
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    focus_gauge(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("replay"))
        .stdout(predicate::str::contains("models"));
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    focus_gauge(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("focus-gauge"));
}
