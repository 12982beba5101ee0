//! Filesystem adapter replaying image files as frames.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use focus_gauge_core::{Frame, FrameRead, FrameSource};
use tracing::{debug, warn};

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "webp", "bmp"];

/// Frame source reading still images from disk, one per `read`.
///
/// Files are visited in sorted path order. A file that fails to decode
/// yields [`FrameRead::Unavailable`]; the end of the list yields
/// [`FrameRead::Closed`].
#[derive(Debug)]
pub struct FsFrameSource {
    files: Vec<PathBuf>,
    cursor: usize,
    released: bool,
}

impl FsFrameSource {
    /// Creates a source over the given files and directories.
    ///
    /// # Arguments
    ///
    /// * `paths` - Files or directories to scan
    /// * `recursive` - Whether to recurse into subdirectories
    #[must_use]
    pub fn new(paths: &[PathBuf], recursive: bool) -> Self {
        let mut files = Vec::new();
        for path in paths {
            if path.is_file() {
                if is_supported_image(path) {
                    files.push(path.clone());
                } else {
                    warn!("Unsupported file type: {}", path.display());
                }
            } else if path.is_dir() {
                collect_from_dir(path, recursive, &mut files);
            } else {
                warn!("Path does not exist: {}", path.display());
            }
        }
        files.sort();
        debug!("Found {} image files", files.len());

        Self {
            files,
            cursor: 0,
            released: false,
        }
    }

    /// Files this source will replay, in order.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Path of the file the last `read` returned, if any.
    #[must_use]
    pub fn current_path(&self) -> Option<&Path> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.files.get(i))
            .map(PathBuf::as_path)
    }
}

fn collect_from_dir(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("Failed to read directory {}: {e}", dir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() && is_supported_image(&path) {
            files.push(path);
        } else if path.is_dir() && recursive {
            collect_from_dir(&path, recursive, files);
        }
    }
}

impl FrameSource for FsFrameSource {
    fn read(&mut self) -> FrameRead {
        if self.released {
            return FrameRead::Closed;
        }
        let Some(path) = self.files.get(self.cursor) else {
            return FrameRead::Closed;
        };
        self.cursor += 1;

        match load_frame(path) {
            Ok(frame) => FrameRead::Frame(frame),
            Err(e) => {
                warn!("{e:#}");
                FrameRead::Unavailable
            }
        }
    }

    fn reopen(&mut self) -> Result<()> {
        self.released = false;
        Ok(())
    }

    fn release(&mut self) {
        self.released = true;
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.files.len())
    }
}

/// Checks if a path has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

/// Decodes an image file into a frame, keeping its channel layout.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded.
pub fn load_frame(path: &Path) -> Result<Frame> {
    let image =
        image::open(path).with_context(|| format!("Failed to open image: {}", path.display()))?;
    Frame::from_dynamic(&image)
        .with_context(|| format!("Unsupported pixel layout: {}", path.display()))
}
