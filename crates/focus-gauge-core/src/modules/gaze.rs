//! Gaze estimation.
//!
//! Combines eyelid closure (EAR) with the smoothed horizontal gaze ratio to
//! produce a [`GazeState`] per frame. The landmark backend is built by a
//! loader on first use and can be released and rebuilt.

use std::fmt;

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use super::ear::eye_aspect_ratio;
use super::gaze_ratio::{combine_ratios, eye_gaze_ratio};
use super::history::{GazeHistory, DEFAULT_HISTORY_SIZE};
use super::overlay::draw_eye_markers;
use super::validator::is_valid_frame;
use crate::domain::{Eye, Frame, GazeError, GazeState, Landmarks, Point};
use crate::ports::LandmarkDetector;

/// Builds a landmark backend on demand.
pub type LandmarkLoader =
    Box<dyn Fn() -> anyhow::Result<Box<dyn LandmarkDetector>> + Send + Sync>;

/// Configuration for gaze estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeConfig {
    /// Number of ratios averaged for smoothing.
    pub history_size: usize,
    /// Mean EAR below this means the eyes are closed.
    pub ear_threshold: f32,
    /// Exclusive lower bound of the focus band.
    pub focus_lo: f32,
    /// Exclusive upper bound of the focus band.
    pub focus_hi: f32,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            history_size: DEFAULT_HISTORY_SIZE,
            ear_threshold: 0.18,
            focus_lo: 0.9,
            focus_hi: 1.1,
        }
    }
}

impl GazeConfig {
    /// Sets the smoothing window size.
    #[must_use]
    pub const fn with_history_size(mut self, size: usize) -> Self {
        self.history_size = size;
        self
    }

    /// Sets the eye closure threshold.
    #[must_use]
    pub const fn with_ear_threshold(mut self, threshold: f32) -> Self {
        self.ear_threshold = threshold;
        self
    }

    /// Sets the focus band.
    #[must_use]
    pub const fn with_focus_band(mut self, lo: f32, hi: f32) -> Self {
        self.focus_lo = lo;
        self.focus_hi = hi;
        self
    }

    /// Maps a smoothed ratio to a gaze direction.
    #[must_use]
    pub fn direction(&self, mean_ratio: f32) -> GazeState {
        if mean_ratio > self.focus_lo && mean_ratio < self.focus_hi {
            GazeState::Focusing
        } else if mean_ratio <= self.focus_lo {
            GazeState::LookingLeft
        } else {
            GazeState::LookingRight
        }
    }
}

/// Per-frame gaze estimator with a smoothing window.
pub struct GazeEstimator {
    config: GazeConfig,
    history: GazeHistory,
    loader: LandmarkLoader,
    backend: OnceCell<Box<dyn LandmarkDetector>>,
}

impl fmt::Debug for GazeEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GazeEstimator")
            .field("config", &self.config)
            .field("history", &self.history)
            .field("backend_loaded", &self.is_backend_loaded())
            .finish_non_exhaustive()
    }
}

impl GazeEstimator {
    /// Creates an estimator. The backend is not loaded until the first frame.
    #[must_use]
    pub fn new(config: GazeConfig, loader: LandmarkLoader) -> Self {
        Self {
            history: GazeHistory::new(config.history_size),
            config,
            loader,
            backend: OnceCell::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &GazeConfig {
        &self.config
    }

    /// Returns the smoothing window.
    #[must_use]
    pub const fn history(&self) -> &GazeHistory {
        &self.history
    }

    /// Returns true once the landmark backend has been built.
    #[must_use]
    pub fn is_backend_loaded(&self) -> bool {
        self.backend.get().is_some()
    }

    /// Loads or returns the cached landmark backend.
    fn backend(&self) -> Result<&dyn LandmarkDetector, GazeError> {
        self.backend
            .get_or_try_init(|| {
                info!("Loading landmark backend");
                (self.loader)()
            })
            .map(|backend| &**backend)
            .map_err(GazeError::Backend)
    }

    /// Validates the frame and runs single-face landmark detection.
    fn detect(&self, frame: Option<&Frame>) -> Result<(image::RgbImage, Landmarks), GazeError> {
        let frame = frame
            .filter(|f| is_valid_frame(Some(*f)))
            .ok_or(GazeError::InvalidFrame)?;
        let image = frame.to_rgb_image()?;
        let landmarks = self
            .backend()?
            .detect(&image)
            .map_err(GazeError::Backend)?
            .ok_or(GazeError::FaceNotDetected)?;
        Ok((image, landmarks))
    }

    /// Estimates the gaze state, surfacing failures as typed errors.
    ///
    /// History is only appended when a gaze ratio was computed.
    ///
    /// # Errors
    ///
    /// Returns a [`GazeError`] for invalid frames, missing faces, backend
    /// failures, and degenerate or non-finite eye contours.
    pub fn try_estimate(&mut self, frame: Option<&Frame>) -> Result<GazeState, GazeError> {
        let (image, landmarks) = self.detect(frame)?;

        let left_eye = landmarks.eye(Eye::Left)?;
        let right_eye = landmarks.eye(Eye::Right)?;
        if !left_eye.iter().chain(&right_eye).all(Point::is_finite) {
            return Err(GazeError::NonFiniteLandmark);
        }

        let ear = (eye_aspect_ratio(&left_eye)? + eye_aspect_ratio(&right_eye)?) / 2.0;
        if ear < self.config.ear_threshold {
            debug!("Eyes closed: EAR {ear:.3}");
            return Ok(GazeState::EyesClosed);
        }

        let left = eye_gaze_ratio(&image, &left_eye);
        let right = eye_gaze_ratio(&image, &right_eye);
        let ratio = combine_ratios(left, right);

        self.history.push(ratio);
        let mean = self.history.mean().unwrap_or(ratio);
        let state = self.config.direction(mean);
        debug!(
            "EAR {ear:.3}, ratio {ratio:.3} (L {left:.3}, R {right:.3}), mean {mean:.3} -> {state}"
        );
        Ok(state)
    }

    /// Estimates the gaze state, collapsing failures into the taxonomy.
    pub fn estimate(&mut self, frame: Option<&Frame>) -> GazeState {
        match self.try_estimate(frame) {
            Ok(state) => state,
            Err(e) => {
                match &e {
                    GazeError::InvalidFrame | GazeError::FaceNotDetected => debug!("Gaze: {e}"),
                    _ => warn!("Gaze estimation failed: {e}"),
                }
                GazeState::from(&e)
            }
        }
    }

    /// Returns a copy of `frame` with the eye contour points marked.
    ///
    /// Does not touch the smoothing window. Returns the frame unchanged when
    /// no face is found or the backend fails, and a blank frame when the
    /// input is invalid.
    #[must_use]
    pub fn debug_overlay(&self, frame: Option<&Frame>) -> Frame {
        let Some(frame) = frame.filter(|f| is_valid_frame(Some(*f))) else {
            return Frame::blank();
        };

        let (mut image, landmarks) = match self.detect(Some(frame)) {
            Ok(found) => found,
            Err(e) => {
                debug!("Debug overlay skipped: {e}");
                return frame.clone();
            }
        };

        draw_eye_markers(&mut image, &landmarks);
        Frame::from_rgb(image).unwrap_or_else(|e| {
            warn!("Debug overlay conversion failed: {e}");
            frame.clone()
        })
    }

    /// Clears the smoothing window.
    pub fn reset_history(&mut self) {
        self.history.clear();
    }

    /// Drops the landmark backend; the next frame rebuilds it.
    pub fn release(&mut self) {
        if self.backend.take().is_some() {
            info!("Landmark backend released");
        }
    }
}
