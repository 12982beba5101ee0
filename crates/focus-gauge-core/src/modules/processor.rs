//! Frame processor: the single orchestration point of the pipeline.
//!
//! Runs face presence detection, gaze estimation and scoring for each frame
//! and publishes the result as an immutable snapshot. All failures end here
//! as degraded status records; nothing propagates to the caller.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::Context;
use tracing::{debug, error, info, warn};

use super::classifier::classify;
use super::gaze::GazeEstimator;
use super::overlay::draw_detections;
use super::validator::is_valid_frame;
use crate::domain::{ConcentrationStatus, Frame, GazeState, StatusLabel, SystemFault};
use crate::ports::FaceDetector;

/// Builds the face presence backend when the processor starts.
pub type FaceDetectorLoader = Box<dyn Fn() -> anyhow::Result<Box<dyn FaceDetector>> + Send + Sync>;

/// Mutable processing state, serialized behind one lock.
struct Engine {
    face_detector: Option<Box<dyn FaceDetector>>,
    estimator: GazeEstimator,
}

impl Engine {
    fn run(&mut self, frame: Option<&Frame>) -> anyhow::Result<ConcentrationStatus> {
        let Some(detector) = self.face_detector.as_ref() else {
            return Ok(ConcentrationStatus::system_error(
                SystemFault::NotInitialized,
            ));
        };

        let Some(frame) = frame.filter(|f| is_valid_frame(Some(*f))) else {
            return Ok(ConcentrationStatus::degraded(
                StatusLabel::InvalidImage,
                GazeState::InvalidFrame,
            ));
        };

        let mut annotated = frame.to_rgb_image().context("Failed to convert frame")?;
        let detections = detector
            .detect(&annotated)
            .context("Face presence detection failed")?;

        if detections.is_empty() {
            debug!("No face detected");
            let scored = classify(false, GazeState::FaceNotDetected);
            let mut status =
                ConcentrationStatus::degraded(StatusLabel::FaceNotDetected, GazeState::FaceNotDetected);
            status.concentration_score = scored.score;
            status.raw_score = scored.raw_score;
            return Ok(status);
        }

        draw_detections(&mut annotated, &detections);
        let gaze = self.estimator.estimate(Some(frame));
        let annotated = Frame::from_rgb(annotated).context("Failed to wrap annotated frame")?;
        let debug_image = self.estimator.debug_overlay(Some(&annotated));
        let scored = classify(true, gaze);

        debug!(
            "{} face(s), gaze {gaze}, score {} ({})",
            detections.len(),
            scored.score,
            scored.status
        );

        Ok(ConcentrationStatus {
            status: scored.status,
            concentration_score: scored.score,
            gaze_status: gaze,
            face_detected: true,
            raw_score: scored.raw_score,
            timestamp: crate::domain::iso_timestamp(),
            debug_image,
        })
    }
}

/// Orchestrates per-frame concentration estimation.
///
/// `process` serializes on an internal lock; `current_status` only takes a
/// read lock around a pointer clone and never waits on processing.
pub struct FrameProcessor {
    loader: FaceDetectorLoader,
    engine: Mutex<Engine>,
    current: RwLock<Arc<ConcentrationStatus>>,
    last_frame: RwLock<Option<Arc<Frame>>>,
}

impl fmt::Debug for FrameProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameProcessor")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl FrameProcessor {
    /// Creates an uninitialized processor. Call [`FrameProcessor::start`]
    /// before processing frames.
    #[must_use]
    pub fn new(loader: FaceDetectorLoader, estimator: GazeEstimator) -> Self {
        Self {
            loader,
            engine: Mutex::new(Engine {
                face_detector: None,
                estimator,
            }),
            current: RwLock::new(Arc::new(ConcentrationStatus::placeholder())),
            last_frame: RwLock::new(None),
        }
    }

    fn engine(&self) -> std::sync::MutexGuard<'_, Engine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads the face presence backend. A no-op if already started.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be built; the processor stays
    /// uninitialized.
    pub fn start(&self) -> anyhow::Result<()> {
        let mut engine = self.engine();
        if engine.face_detector.is_some() {
            return Ok(());
        }
        let detector = (self.loader)().context("Failed to load face presence backend")?;
        engine.face_detector = Some(detector);
        info!("Frame processor started");
        Ok(())
    }

    /// Returns true once [`FrameProcessor::start`] has succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.engine().face_detector.is_some()
    }

    /// Drops both backends and returns to the uninitialized state.
    pub fn release(&self) {
        let mut engine = self.engine();
        engine.face_detector = None;
        engine.estimator.release();
        info!("Frame processor released");
    }

    /// Clears the gaze smoothing window.
    pub fn reset_history(&self) {
        self.engine().estimator.reset_history();
    }

    /// Processes one frame and publishes the resulting status.
    ///
    /// Never fails: backend errors and panics become a
    /// `System Error: Processing Failed` record.
    pub fn process(&self, frame: Option<&Frame>) -> Arc<ConcentrationStatus> {
        if let Some(frame) = frame.filter(|f| is_valid_frame(Some(*f))) {
            *self
                .last_frame
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(frame.clone()));
        }

        let outcome = {
            let mut engine = self.engine();
            catch_unwind(AssertUnwindSafe(|| engine.run(frame)))
        };

        let status = match outcome {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                error!("Frame processing failed: {e:#}");
                ConcentrationStatus::system_error(SystemFault::ProcessingFailed)
            }
            Err(_) => {
                error!("Frame processing panicked");
                ConcentrationStatus::system_error(SystemFault::ProcessingFailed)
            }
        };

        if let StatusLabel::SystemError(SystemFault::NotInitialized) = status.status {
            warn!("Frame received before processor start");
        }

        let status = Arc::new(status);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&status);
        status
    }

    /// Most recently published status, or the initial placeholder.
    #[must_use]
    pub fn current_status(&self) -> Arc<ConcentrationStatus> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Last valid frame handed to [`FrameProcessor::process`].
    #[must_use]
    pub fn last_frame(&self) -> Option<Arc<Frame>> {
        self.last_frame
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::{FaceDetection, Landmarks};
    use crate::modules::{GazeConfig, LandmarkLoader};
    use crate::ports::LandmarkDetector;

    struct Fixed(Vec<FaceDetection>);

    impl FaceDetector for Fixed {
        fn detect(&self, _image: &image::RgbImage) -> anyhow::Result<Vec<FaceDetection>> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl FaceDetector for Failing {
        fn detect(&self, _image: &image::RgbImage) -> anyhow::Result<Vec<FaceDetection>> {
            anyhow::bail!("inference exploded")
        }
    }

    struct Panicking;

    impl FaceDetector for Panicking {
        fn detect(&self, _image: &image::RgbImage) -> anyhow::Result<Vec<FaceDetection>> {
            panic!("backend bug")
        }
    }

    struct NoMesh;

    impl LandmarkDetector for NoMesh {
        fn detect(&self, _image: &image::RgbImage) -> anyhow::Result<Option<Landmarks>> {
            Ok(None)
        }
    }

    fn estimator() -> GazeEstimator {
        let loader: LandmarkLoader = Box::new(|| Ok(Box::new(NoMesh) as Box<dyn LandmarkDetector>));
        GazeEstimator::new(GazeConfig::default(), loader)
    }

    fn processor(make: fn() -> Box<dyn FaceDetector>) -> FrameProcessor {
        let loader: FaceDetectorLoader = Box::new(move || Ok(make()));
        FrameProcessor::new(loader, estimator())
    }

    #[test]
    fn test_not_initialized() {
        let processor = processor(|| Box::new(Fixed(Vec::new())));
        let status = processor.process(Some(&Frame::zeros(&[8, 8, 3])));
        assert_eq!(
            status.status,
            StatusLabel::SystemError(SystemFault::NotInitialized)
        );
        assert!(!status.face_detected);
        assert_eq!(status.debug_image, Frame::blank());
    }

    #[test]
    fn test_start_failure_keeps_uninitialized() {
        let loader: FaceDetectorLoader = Box::new(|| Err(anyhow::anyhow!("no weights")));
        let processor = FrameProcessor::new(loader, estimator());
        assert!(processor.start().is_err());
        assert!(!processor.is_initialized());
    }

    #[test]
    fn test_invalid_image() {
        let processor = processor(|| Box::new(Fixed(Vec::new())));
        processor.start().unwrap();
        let status = processor.process(Some(&Frame::zeros(&[8, 8])));
        assert_eq!(status.status, StatusLabel::InvalidImage);
        assert_eq!(status.gaze_status, GazeState::InvalidFrame);
        assert_eq!(status.debug_image.shape(), &[480, 640, 3]);
    }

    #[test]
    fn test_no_face() {
        let processor = processor(|| Box::new(Fixed(Vec::new())));
        processor.start().unwrap();
        let status = processor.process(Some(&Frame::zeros(&[8, 8, 3])));
        assert_eq!(status.status, StatusLabel::FaceNotDetected);
        assert_eq!(status.concentration_score, 0);
        assert!(!status.face_detected);
    }

    #[test]
    fn test_backend_error_is_processing_failed() {
        let processor = processor(|| Box::new(Failing));
        processor.start().unwrap();
        let status = processor.process(Some(&Frame::zeros(&[8, 8, 3])));
        assert_eq!(
            status.status,
            StatusLabel::SystemError(SystemFault::ProcessingFailed)
        );
        assert!(Arc::ptr_eq(&status, &processor.current_status()));
    }

    #[test]
    fn test_panic_is_contained() {
        let processor = processor(|| Box::new(Panicking));
        processor.start().unwrap();
        let status = processor.process(Some(&Frame::zeros(&[8, 8, 3])));
        assert_eq!(
            status.status,
            StatusLabel::SystemError(SystemFault::ProcessingFailed)
        );
        // Lock is still usable afterwards.
        assert!(processor.is_initialized());
    }

    #[test]
    fn test_release_returns_to_uninitialized() {
        let processor = processor(|| Box::new(Fixed(Vec::new())));
        processor.start().unwrap();
        processor.release();
        assert!(!processor.is_initialized());
    }

    #[test]
    fn test_last_frame_recorded() {
        let processor = processor(|| Box::new(Fixed(Vec::new())));
        assert!(processor.last_frame().is_none());
        let frame = Frame::zeros(&[2, 2, 3]);
        processor.process(Some(&frame));
        assert_eq!(processor.last_frame().as_deref(), Some(&frame));
    }

    #[test]
    fn test_invalid_frame_not_recorded() {
        let processor = processor(|| Box::new(Fixed(Vec::new())));
        processor.start().unwrap();
        let frame = Frame::zeros(&[2, 2, 3]);
        processor.process(Some(&frame));
        processor.process(Some(&Frame::zeros(&[2, 2])));
        processor.process(None);
        assert_eq!(processor.last_frame().as_deref(), Some(&frame));
    }
}
