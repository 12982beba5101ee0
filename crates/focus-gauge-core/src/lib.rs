//! Focus Gauge Core - concentration estimation pipeline
//!
//! Domain types, port traits and the pipeline stages that turn camera frames
//! into concentration status records: frame validation, face presence,
//! eye aspect ratio, gaze ratio smoothing and scoring. Candle backends for
//! face detection and the face mesh live in [`inference`].

pub mod domain;
pub mod inference;
pub mod modules;
pub mod ports;

pub use domain::{
    ConcentrationStatus, Eye, FaceDetection, Frame, FrameError, GazeError, GazeState, Landmarks,
    Point, StatusLabel, SystemFault,
};
pub use modules::{
    classify, is_valid_frame, Classification, FrameProcessor, GazeConfig, GazeEstimator,
};
pub use ports::{
    DebugImageSink, FaceDetector, FrameRead, FrameSource, LandmarkDetector, ProgressEvent,
    ProgressSink, StatusOutput,
};
