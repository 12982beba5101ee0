//! Test support utilities for focus-gauge.
//!
//! Provides synthetic frames, face mesh builders and port mocks for testing
//! the concentration pipeline without camera hardware or model weights.
//!
//! # Example
//!
//! ```
//! use focus_gauge_test_support::{FaceLandmarksBuilder, MockLandmarkDetector, SyntheticFrameBuilder};
//!
//! let frame = SyntheticFrameBuilder::neutral();
//! let mesh = MockLandmarkDetector::with_face(FaceLandmarksBuilder::new().build());
//! assert_eq!(frame.shape(), &[480, 640, 3]);
//! assert_eq!(mesh.calls(), 0);
//! ```

mod builders;
mod mocks;

pub use builders::{
    centered_detection, FaceLandmarksBuilder, IrisPosition, SyntheticFrameBuilder, CLOSED_EAR,
    EYE_HALF_WIDTH, LEFT_EYE_CENTER, OPEN_EAR, RIGHT_EYE_CENTER,
};
pub use mocks::{
    MockDebugSink, MockFaceDetector, MockFrameSource, MockLandmarkDetector, MockProgressSink,
    MockStatusOutput,
};
