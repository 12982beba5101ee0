//! Concentration pipeline stages.
//!
//! Leaf to root: frame validation, eye geometry (EAR and gaze ratio),
//! smoothing, gaze estimation, scoring and the frame processor that ties
//! them together.

mod classifier;
mod ear;
mod gaze;
mod gaze_ratio;
mod history;
mod overlay;
mod processor;
mod validator;

pub use classifier::{
    classify, label_for_score, Classification, EYES_CLOSED_WEIGHT, FACE_WEIGHT, FOCUSING_MIN_SCORE,
    FOCUS_WEIGHT, PARTIAL_MIN_SCORE,
};
pub use ear::{eye_aspect_ratio, mean_eye_aspect_ratio};
pub use gaze::{GazeConfig, GazeEstimator, LandmarkLoader};
pub use gaze_ratio::{
    adaptive_threshold_inv, combine_ratios, equalize, eye_gaze_ratio, eye_region, split_ratio,
    to_gray, Histogram, MAX_GAZE_RATIO, MIN_GAZE_RATIO, RATIO_EPSILON,
};
pub use history::{GazeHistory, DEFAULT_HISTORY_SIZE};
pub use overlay::{draw_detections, draw_eye_markers, EYE_MARKER_COLOR};
pub use processor::{FaceDetectorLoader, FrameProcessor};
pub use validator::is_valid_frame;
