//! Gaze states and the typed errors behind them.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::FrameError;

/// Discrete gaze classification for one frame.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GazeState {
    /// Smoothed gaze ratio sits inside the focus band.
    #[serde(rename = "Focusing")]
    Focusing,
    /// Smoothed gaze ratio at or below the lower focus bound.
    #[serde(rename = "Looking left")]
    LookingLeft,
    /// Smoothed gaze ratio at or above the upper focus bound.
    #[serde(rename = "Looking right")]
    LookingRight,
    /// Mean eye aspect ratio below the closure threshold.
    #[serde(rename = "Eyes closed")]
    EyesClosed,
    /// No face found in the frame.
    #[serde(rename = "Face not detected")]
    FaceNotDetected,
    /// Backend or geometry failure.
    #[serde(rename = "Processing error")]
    ProcessingError,
    /// Frame rejected by validation.
    #[serde(rename = "Invalid frame")]
    InvalidFrame,
}

impl GazeState {
    /// Human-readable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Focusing => "Focusing",
            Self::LookingLeft => "Looking left",
            Self::LookingRight => "Looking right",
            Self::EyesClosed => "Eyes closed",
            Self::FaceNotDetected => "Face not detected",
            Self::ProcessingError => "Processing error",
            Self::InvalidFrame => "Invalid frame",
        }
    }
}

impl fmt::Display for GazeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures inside gaze estimation.
#[derive(Debug, Error)]
pub enum GazeError {
    /// Input frame failed validation.
    #[error("invalid frame")]
    InvalidFrame,
    /// Landmark backend found no face.
    #[error("no face detected")]
    FaceNotDetected,
    /// Eye contour has zero inner-to-outer width.
    #[error("degenerate eye contour: zero horizontal extent")]
    DegenerateEye,
    /// An eye contour point is NaN or infinite.
    #[error("non-finite eye landmark")]
    NonFiniteLandmark,
    /// Landmark sequence is shorter than the eye indices require.
    #[error("landmark {index} missing from mesh of {len} points")]
    MissingLandmark {
        /// Requested mesh index.
        index: usize,
        /// Number of points available.
        len: usize,
    },
    /// Landmark backend failed to load or run.
    #[error("landmark backend failed: {0:#}")]
    Backend(#[source] anyhow::Error),
    /// Frame conversion failed.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl From<&GazeError> for GazeState {
    fn from(err: &GazeError) -> Self {
        match err {
            GazeError::InvalidFrame => Self::InvalidFrame,
            GazeError::FaceNotDetected => Self::FaceNotDetected,
            _ => Self::ProcessingError,
        }
    }
}
