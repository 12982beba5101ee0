//! Synthetic frame and landmark builders for testing.

use focus_gauge_core::domain::{Eye, FaceDetection, Frame, Landmarks, Point, MESH_POINTS};
use image::{Rgb, RgbImage};

/// Center of the subject's left eye in normalized coordinates.
pub const LEFT_EYE_CENTER: (f32, f32) = (0.35, 0.4);
/// Center of the subject's right eye in normalized coordinates.
pub const RIGHT_EYE_CENTER: (f32, f32) = (0.65, 0.4);
/// Half the corner-to-corner eye width.
pub const EYE_HALF_WIDTH: f32 = 0.05;
/// EAR of an open eye built by [`FaceLandmarksBuilder::new`].
pub const OPEN_EAR: f32 = 0.3;
/// EAR of a closed eye built by [`FaceLandmarksBuilder::closed`].
pub const CLOSED_EAR: f32 = 0.1;

/// Where the dark iris sits inside each eye crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrisPosition {
    /// Left of the eye center in image space.
    Left,
    /// Right of the eye center in image space.
    Right,
}

/// Builder for synthetic frames.
pub struct SyntheticFrameBuilder;

impl SyntheticFrameBuilder {
    /// 3-channel frame filled with one value.
    #[must_use]
    pub fn uniform(width: usize, height: usize, value: u8) -> Frame {
        Self::with_channels(width, height, 3, value)
    }

    /// 640×480 white RGB frame. Every eye crop is featureless, so the gaze
    /// ratio is exactly 1.0.
    #[must_use]
    pub fn neutral() -> Frame {
        Self::uniform(640, 480, 255)
    }

    /// 4-channel frame.
    #[must_use]
    pub fn rgba(width: usize, height: usize) -> Frame {
        Self::with_channels(width, height, 4, 128)
    }

    /// 2-axis grayscale frame.
    #[must_use]
    pub fn grayscale(width: usize, height: usize) -> Frame {
        Frame::zeros(&[height, width])
    }

    /// Frame with an arbitrary channel count.
    #[must_use]
    pub fn with_channels(width: usize, height: usize, channels: usize, value: u8) -> Frame {
        Frame::from_shape_vec(
            &[height, width, channels],
            vec![value; width * height * channels],
        )
        .unwrap_or_else(|_| Frame::zeros(&[height, width, channels]))
    }

    /// Zero-sized 3-channel frame.
    #[must_use]
    pub fn empty() -> Frame {
        Frame::zeros(&[0, 0, 3])
    }

    /// White frame with a dark iris drawn in both eyes at `iris`.
    ///
    /// Matches the eye geometry of [`FaceLandmarksBuilder`].
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap
    )]
    pub fn face_with_iris(width: u32, height: u32, iris: IrisPosition) -> Frame {
        let mut image = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        let offset = match iris {
            IrisPosition::Left => -EYE_HALF_WIDTH / 2.0,
            IrisPosition::Right => EYE_HALF_WIDTH / 2.0,
        };
        let radius = (EYE_HALF_WIDTH * width as f32 / 6.0).max(2.0) as i64;

        for (cx, cy) in [LEFT_EYE_CENTER, RIGHT_EYE_CENTER] {
            let px = ((cx + offset) * width as f32) as i64;
            let py = (cy * height as f32) as i64;
            for y in (py - radius)..=(py + radius) {
                for x in (px - radius)..=(px + radius) {
                    let inside = (x - px).pow(2) + (y - py).pow(2) <= radius.pow(2);
                    if inside && x >= 0 && y >= 0 && x < i64::from(width) && y < i64::from(height) {
                        image.put_pixel(x as u32, y as u32, Rgb([30, 30, 30]));
                    }
                }
            }
        }

        Frame::from_rgb(image).unwrap_or_else(|_| Frame::blank())
    }
}

/// Builder for 468-point face meshes with controllable eyes.
#[derive(Debug, Clone)]
pub struct FaceLandmarksBuilder {
    ear: f32,
    collapsed: bool,
    corner_x: Option<f32>,
    len: usize,
}

impl Default for FaceLandmarksBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceLandmarksBuilder {
    /// Frontal face with open eyes.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ear: OPEN_EAR,
            collapsed: false,
            corner_x: None,
            len: MESH_POINTS,
        }
    }

    /// Eyes closed (EAR below the default threshold).
    #[must_use]
    pub const fn closed() -> Self {
        Self::new().with_ear(CLOSED_EAR)
    }

    /// Eyes with a chosen aspect ratio.
    #[must_use]
    pub const fn with_ear(mut self, ear: f32) -> Self {
        self.ear = ear;
        self
    }

    /// Every eye point at the eye center, so the corners coincide.
    #[must_use]
    pub const fn collapsed(mut self) -> Self {
        self.collapsed = true;
        self
    }

    /// Moves the outer corner of the left eye to horizontal position `x`,
    /// which may be NaN or infinite.
    #[must_use]
    pub const fn with_left_corner_x(mut self, x: f32) -> Self {
        self.corner_x = Some(x);
        self
    }

    /// Keeps only the first `len` points.
    #[must_use]
    pub const fn truncated(mut self, len: usize) -> Self {
        self.len = len;
        self
    }

    /// Builds the mesh. Non-eye points sit at the frame center.
    #[must_use]
    pub fn build(&self) -> Landmarks {
        let mut points = vec![Point::new(0.5, 0.5, 0.0); MESH_POINTS];
        let half_height = self.ear * EYE_HALF_WIDTH;

        for (eye, (cx, cy)) in [(Eye::Left, LEFT_EYE_CENTER), (Eye::Right, RIGHT_EYE_CENTER)] {
            let contour = if self.collapsed {
                [Point::new(cx, cy, 0.0); 6]
            } else {
                let (hw, hh) = (EYE_HALF_WIDTH, half_height);
                [
                    Point::new(cx - hw, cy, 0.0),
                    Point::new(cx - hw / 3.0, cy - hh, 0.0),
                    Point::new(cx + hw / 3.0, cy - hh, 0.0),
                    Point::new(cx + hw, cy, 0.0),
                    Point::new(cx + hw / 3.0, cy + hh, 0.0),
                    Point::new(cx - hw / 3.0, cy + hh, 0.0),
                ]
            };
            for (index, point) in eye.indices().into_iter().zip(contour) {
                points[index] = point;
            }
        }

        if let Some(x) = self.corner_x {
            points[Eye::Left.indices()[0]].x = x;
        }

        points.truncate(self.len);
        Landmarks::new(points)
    }
}

/// A centered face detection covering both eyes.
#[must_use]
pub fn centered_detection() -> FaceDetection {
    FaceDetection {
        bbox: [0.25, 0.2, 0.75, 0.8],
        score: 0.95,
        keypoints: [
            [LEFT_EYE_CENTER.0, LEFT_EYE_CENTER.1],
            [RIGHT_EYE_CENTER.0, RIGHT_EYE_CENTER.1],
            [0.5, 0.5],
            [0.5, 0.65],
            [0.27, 0.45],
            [0.73, 0.45],
        ],
    }
}
