//! Focus Gauge Adapters - frame sources, debug stream and model files.
//!
//! This crate provides adapters for:
//! - Replaying image files as a frame source
//! - Live camera capture (`camera` feature)
//! - MJPEG encoding of the debug stream
//! - Model downloading and caching

#[cfg(feature = "camera")]
pub mod camera;
pub mod fs;
pub mod mjpeg;
pub mod models;

#[cfg(feature = "camera")]
pub use camera::{CameraConfig, CameraSource};
pub use fs::FsFrameSource;
pub use mjpeg::{encode_jpeg, write_part, MjpegSink, CONTENT_TYPE, JPEG_QUALITY};
pub use models::{model_path, models_dir, ModelInfo, MODELS};
