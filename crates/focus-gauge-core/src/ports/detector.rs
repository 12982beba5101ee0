//! Detection ports implemented by inference backends.

use image::RgbImage;

use crate::domain::{FaceDetection, Landmarks};

/// Face presence detection: zero or more bounding detections per frame.
pub trait FaceDetector: Send + Sync {
    /// Detects faces in an RGB frame.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn detect(&self, image: &RgbImage) -> anyhow::Result<Vec<FaceDetection>>;
}

/// Dense landmark detection for a single face.
pub trait LandmarkDetector: Send + Sync {
    /// Returns the landmarks of the first face in normalized [0, 1]
    /// coordinates, or `None` if no face is found.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn detect(&self, image: &RgbImage) -> anyhow::Result<Option<Landmarks>>;
}
