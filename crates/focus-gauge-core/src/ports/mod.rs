//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the concentration pipeline and
//! its cameras, inference backends and consumers.

mod detector;
mod frame_source;
mod output;
mod progress;

pub use detector::{FaceDetector, LandmarkDetector};
pub use frame_source::{FrameRead, FrameSource};
pub use output::{DebugImageSink, StatusOutput};
pub use progress::{ProgressEvent, ProgressSink};
