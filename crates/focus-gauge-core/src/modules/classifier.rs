//! Concentration scoring.
//!
//! Maps face presence and gaze state to a bounded score and a label. Pure
//! and deterministic.

use crate::domain::{GazeState, StatusLabel};

/// Added when the presence detector found a face.
pub const FACE_WEIGHT: i32 = 20;
/// Added when the gaze state is [`GazeState::Focusing`].
pub const FOCUS_WEIGHT: i32 = 40;
/// Added (negative) when the gaze state is [`GazeState::EyesClosed`].
pub const EYES_CLOSED_WEIGHT: i32 = -20;

/// Minimum score labelled [`StatusLabel::Focusing`].
pub const FOCUSING_MIN_SCORE: u8 = 70;
/// Minimum score labelled [`StatusLabel::PartiallyFocusing`].
pub const PARTIAL_MIN_SCORE: u8 = 40;

/// Result of scoring one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Label derived from `score`.
    pub status: StatusLabel,
    /// Score clamped to [0, 100].
    pub score: u8,
    /// Weighted sum before clamping.
    pub raw_score: i32,
}

/// Scores a frame from face presence and gaze state.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn classify(face_detected: bool, gaze: GazeState) -> Classification {
    let mut raw_score = 0;
    if face_detected {
        raw_score += FACE_WEIGHT;
    }
    raw_score += match gaze {
        GazeState::Focusing => FOCUS_WEIGHT,
        GazeState::EyesClosed => EYES_CLOSED_WEIGHT,
        _ => 0,
    };

    let score = raw_score.clamp(0, 100) as u8;
    Classification {
        status: label_for_score(score),
        score,
        raw_score,
    }
}

/// Label for a clamped score.
#[must_use]
pub const fn label_for_score(score: u8) -> StatusLabel {
    if score >= FOCUSING_MIN_SCORE {
        StatusLabel::Focusing
    } else if score >= PARTIAL_MIN_SCORE {
        StatusLabel::PartiallyFocusing
    } else {
        StatusLabel::NotFocusing
    }
}
