//! Concentration status records published by the frame processor.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::{Frame, GazeState};

/// Which internal failure produced a system error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemFault {
    /// `process` was called before `start`.
    NotInitialized,
    /// A backend error or panic escaped frame processing.
    ProcessingFailed,
}

/// Overall concentration label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum StatusLabel {
    /// Score of 70 or more.
    Focusing,
    /// Score from 40 to 69.
    PartiallyFocusing,
    /// Score below 40.
    NotFocusing,
    /// The presence detector found no face.
    FaceNotDetected,
    /// The frame failed validation.
    InvalidImage,
    /// Processing could not run or failed.
    SystemError(SystemFault),
}

impl StatusLabel {
    /// Human-readable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Focusing => "Focusing",
            Self::PartiallyFocusing => "Partially focusing",
            Self::NotFocusing => "Not focusing",
            Self::FaceNotDetected => "Face not detected",
            Self::InvalidImage => "Invalid image",
            Self::SystemError(SystemFault::NotInitialized) => "System Error: Not Initialized",
            Self::SystemError(SystemFault::ProcessingFailed) => "System Error: Processing Failed",
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<StatusLabel> for String {
    fn from(label: StatusLabel) -> Self {
        label.as_str().to_owned()
    }
}

/// One processed frame's concentration assessment.
///
/// Instances are immutable once published; the processor swaps in a new
/// `Arc<ConcentrationStatus>` per frame.
#[derive(Debug, Clone, Serialize)]
pub struct ConcentrationStatus {
    /// Overall label.
    pub status: StatusLabel,
    /// Score clamped to [0, 100].
    pub concentration_score: u8,
    /// Gaze state for this frame.
    pub gaze_status: GazeState,
    /// Whether the presence detector found a face.
    pub face_detected: bool,
    /// Unclamped weighted score.
    pub raw_score: i32,
    /// Processing time (RFC 3339, UTC).
    pub timestamp: String,
    /// Annotated frame for the debug stream.
    #[serde(skip)]
    pub debug_image: Frame,
}

impl ConcentrationStatus {
    /// Status published before any frame has been processed.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::degraded(StatusLabel::NotFocusing, GazeState::FaceNotDetected)
    }

    /// Zero-score status with a blank debug image.
    #[must_use]
    pub fn degraded(status: StatusLabel, gaze_status: GazeState) -> Self {
        Self {
            status,
            concentration_score: 0,
            gaze_status,
            face_detected: false,
            raw_score: 0,
            timestamp: iso_timestamp(),
            debug_image: Frame::blank(),
        }
    }

    /// Status for an internal failure.
    #[must_use]
    pub fn system_error(fault: SystemFault) -> Self {
        Self::degraded(StatusLabel::SystemError(fault), GazeState::ProcessingError)
    }
}

/// Current UTC time in RFC 3339 format.
#[must_use]
pub fn iso_timestamp() -> String {
    match time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339) {
        Ok(ts) => ts,
        Err(e) => {
            debug!("Timestamp format failed: {e}");
            String::from("1970-01-01T00:00:00Z")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder() {
        let status = ConcentrationStatus::placeholder();
        assert_eq!(status.status, StatusLabel::NotFocusing);
        assert_eq!(status.concentration_score, 0);
        assert_eq!(status.gaze_status, GazeState::FaceNotDetected);
        assert!(!status.face_detected);
        assert_eq!(status.debug_image.shape(), &[480, 640, 3]);
    }

    #[test]
    fn test_system_error_labels() {
        let status = ConcentrationStatus::system_error(SystemFault::NotInitialized);
        assert_eq!(status.status.as_str(), "System Error: Not Initialized");
        let status = ConcentrationStatus::system_error(SystemFault::ProcessingFailed);
        assert_eq!(status.status.to_string(), "System Error: Processing Failed");
    }

    #[test]
    fn test_json_shape() {
        let status = ConcentrationStatus::degraded(StatusLabel::InvalidImage, GazeState::InvalidFrame);
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["status"], "Invalid image");
        assert_eq!(value["gaze_status"], "Invalid frame");
        assert_eq!(value["concentration_score"], 0);
        assert_eq!(value["face_detected"], false);
        assert!(value.get("debug_image").is_none());
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(ts.ends_with('Z'));
    }
}
