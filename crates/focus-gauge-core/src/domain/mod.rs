//! Core domain types for concentration estimation.

mod detection;
mod frame;
mod gaze;
mod landmarks;
mod status;

pub use detection::{FaceDetection, FACE_KEYPOINTS};
pub use frame::{Frame, FrameError, BLANK_HEIGHT, BLANK_WIDTH};
pub use gaze::{GazeError, GazeState};
pub use landmarks::{Eye, Landmarks, Point, MESH_POINTS};
pub use status::{iso_timestamp, ConcentrationStatus, StatusLabel, SystemFault};
