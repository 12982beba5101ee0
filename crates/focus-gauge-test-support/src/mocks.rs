//! Mock implementations of core port traits.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use focus_gauge_core::domain::{ConcentrationStatus, FaceDetection, Frame, Landmarks};
use focus_gauge_core::modules::{FaceDetectorLoader, LandmarkLoader};
use focus_gauge_core::ports::{
    DebugImageSink, FaceDetector, FrameRead, FrameSource, LandmarkDetector, ProgressEvent,
    ProgressSink, StatusOutput,
};
use image::RgbImage;

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted `FrameSource`.
///
/// Replays the given reads in order, then reports `Closed`. Counters are
/// shared with clones so a test can keep a handle after moving the source.
#[derive(Clone)]
pub struct MockFrameSource {
    script: Arc<Mutex<VecDeque<FrameRead>>>,
    reads: Arc<Mutex<usize>>,
    reopens: Arc<Mutex<usize>>,
    released: Arc<Mutex<bool>>,
    fail_reopen: bool,
}

impl MockFrameSource {
    /// Creates a source replaying `script`.
    #[must_use]
    pub fn new(script: Vec<FrameRead>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            reads: Arc::new(Mutex::new(0)),
            reopens: Arc::new(Mutex::new(0)),
            released: Arc::new(Mutex::new(false)),
            fail_reopen: false,
        }
    }

    /// Creates a source yielding each frame once.
    #[must_use]
    pub fn frames(frames: Vec<Frame>) -> Self {
        Self::new(frames.into_iter().map(FrameRead::Frame).collect())
    }

    /// Makes every `reopen` call fail.
    #[must_use]
    pub fn with_failing_reopen(mut self) -> Self {
        self.fail_reopen = true;
        self
    }

    /// Number of `read` calls.
    #[must_use]
    pub fn read_count(&self) -> usize {
        *lock(&self.reads)
    }

    /// Number of `reopen` calls.
    #[must_use]
    pub fn reopen_count(&self) -> usize {
        *lock(&self.reopens)
    }

    /// Whether `release` was called.
    #[must_use]
    pub fn was_released(&self) -> bool {
        *lock(&self.released)
    }
}

impl FrameSource for MockFrameSource {
    fn read(&mut self) -> FrameRead {
        *lock(&self.reads) += 1;
        lock(&self.script).pop_front().unwrap_or(FrameRead::Closed)
    }

    fn reopen(&mut self) -> anyhow::Result<()> {
        *lock(&self.reopens) += 1;
        if self.fail_reopen {
            anyhow::bail!("mock device unavailable");
        }
        Ok(())
    }

    fn release(&mut self) {
        *lock(&self.released) = true;
    }

    fn count_hint(&self) -> Option<usize> {
        Some(lock(&self.script).len())
    }
}

#[derive(Clone)]
enum LandmarkResponse {
    Face(Landmarks),
    NoFace,
    Fail(String),
}

/// Scripted `LandmarkDetector` with call and load counters.
#[derive(Clone)]
pub struct MockLandmarkDetector {
    response: Arc<Mutex<LandmarkResponse>>,
    calls: Arc<Mutex<usize>>,
    loads: Arc<Mutex<usize>>,
}

impl MockLandmarkDetector {
    fn with_response(response: LandmarkResponse) -> Self {
        Self {
            response: Arc::new(Mutex::new(response)),
            calls: Arc::new(Mutex::new(0)),
            loads: Arc::new(Mutex::new(0)),
        }
    }

    /// Always returns `landmarks`.
    #[must_use]
    pub fn with_face(landmarks: Landmarks) -> Self {
        Self::with_response(LandmarkResponse::Face(landmarks))
    }

    /// Never finds a face.
    #[must_use]
    pub fn no_face() -> Self {
        Self::with_response(LandmarkResponse::NoFace)
    }

    /// Fails every detection.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self::with_response(LandmarkResponse::Fail(message.to_owned()))
    }

    /// Changes the response for subsequent calls; `None` means no face.
    pub fn set_face(&self, landmarks: Option<Landmarks>) {
        *lock(&self.response) = landmarks.map_or(LandmarkResponse::NoFace, LandmarkResponse::Face);
    }

    /// Number of `detect` calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        *lock(&self.calls)
    }

    /// Number of times the loader built a backend.
    #[must_use]
    pub fn loads(&self) -> usize {
        *lock(&self.loads)
    }

    /// Loader handing out clones of this mock.
    #[must_use]
    pub fn loader(&self) -> LandmarkLoader {
        let mock = self.clone();
        Box::new(move || {
            *lock(&mock.loads) += 1;
            Ok(Box::new(mock.clone()) as Box<dyn LandmarkDetector>)
        })
    }

    /// Loader that always fails.
    #[must_use]
    pub fn failing_loader(message: &str) -> LandmarkLoader {
        let message = message.to_owned();
        Box::new(move || Err(anyhow::anyhow!("{message}")))
    }
}

impl LandmarkDetector for MockLandmarkDetector {
    fn detect(&self, _image: &RgbImage) -> anyhow::Result<Option<Landmarks>> {
        *lock(&self.calls) += 1;
        match &*lock(&self.response) {
            LandmarkResponse::Face(landmarks) => Ok(Some(landmarks.clone())),
            LandmarkResponse::NoFace => Ok(None),
            LandmarkResponse::Fail(message) => Err(anyhow::anyhow!("{message}")),
        }
    }
}

/// Scripted `FaceDetector`.
#[derive(Clone)]
pub struct MockFaceDetector {
    detections: Arc<Mutex<Result<Vec<FaceDetection>, String>>>,
    calls: Arc<Mutex<usize>>,
}

impl MockFaceDetector {
    /// Always returns `detections`.
    #[must_use]
    pub fn with_detections(detections: Vec<FaceDetection>) -> Self {
        Self {
            detections: Arc::new(Mutex::new(Ok(detections))),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Never finds a face.
    #[must_use]
    pub fn none() -> Self {
        Self::with_detections(Vec::new())
    }

    /// Fails every detection.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            detections: Arc::new(Mutex::new(Err(message.to_owned()))),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Changes the detections for subsequent calls.
    pub fn set_detections(&self, detections: Vec<FaceDetection>) {
        *lock(&self.detections) = Ok(detections);
    }

    /// Number of `detect` calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        *lock(&self.calls)
    }

    /// Loader handing out clones of this mock.
    #[must_use]
    pub fn loader(&self) -> FaceDetectorLoader {
        let mock = self.clone();
        Box::new(move || Ok(Box::new(mock.clone()) as Box<dyn FaceDetector>))
    }
}

impl FaceDetector for MockFaceDetector {
    fn detect(&self, _image: &RgbImage) -> anyhow::Result<Vec<FaceDetection>> {
        *lock(&self.calls) += 1;
        lock(&self.detections)
            .clone()
            .map_err(|message| anyhow::anyhow!("{message}"))
    }
}

/// Mock implementation of `StatusOutput` for testing.
///
/// Captures status records for later assertions.
#[derive(Clone, Default)]
pub struct MockStatusOutput {
    records: Arc<Mutex<Vec<ConcentrationStatus>>>,
    flush_count: Arc<Mutex<usize>>,
}

impl MockStatusOutput {
    /// Creates a new mock output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured records.
    #[must_use]
    pub fn records(&self) -> Vec<ConcentrationStatus> {
        lock(&self.records).clone()
    }

    /// Returns the number of times `flush()` was called.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        *lock(&self.flush_count)
    }
}

impl StatusOutput for MockStatusOutput {
    fn write(&self, status: &ConcentrationStatus) -> anyhow::Result<()> {
        lock(&self.records).push(status.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        *lock(&self.flush_count) += 1;
        Ok(())
    }
}

/// Mock implementation of `DebugImageSink` capturing frame shapes.
#[derive(Clone, Default)]
pub struct MockDebugSink {
    shapes: Arc<Mutex<Vec<Vec<usize>>>>,
}

impl MockDebugSink {
    /// Creates a new mock sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shapes of the frames received, in order.
    #[must_use]
    pub fn shapes(&self) -> Vec<Vec<usize>> {
        lock(&self.shapes).clone()
    }
}

impl DebugImageSink for MockDebugSink {
    fn send(&self, frame: &Frame) -> anyhow::Result<()> {
        lock(&self.shapes).push(frame.shape().to_vec());
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures events for later assertions.
#[derive(Clone, Default)]
pub struct MockProgressSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl MockProgressSink {
    /// Creates a new mock progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        lock(&self.events).clone()
    }

    /// Returns the number of `Completed` events.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Completed { .. }))
            .count()
    }

    /// Returns the number of `Skipped` events.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Skipped { .. }))
            .count()
    }

    /// Returns the final counts from the `Finished` event, if any.
    #[must_use]
    pub fn finished_counts(&self) -> Option<(usize, usize)> {
        self.events().iter().find_map(|e| match e {
            ProgressEvent::Finished { processed, skipped } => Some((*processed, *skipped)),
            _ => None,
        })
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        lock(&self.events).push(event);
    }
}
