//! Face presence detections.

use serde::Serialize;

/// Number of keypoints a short-range face detector reports.
pub const FACE_KEYPOINTS: usize = 6;

/// A single face found by the presence detector.
///
/// Coordinates are normalized to [0, 1] relative to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceDetection {
    /// Bounding box as `[x_min, y_min, x_max, y_max]`.
    pub bbox: [f32; 4],
    /// Detection confidence in [0, 1].
    pub score: f32,
    /// Eyes, nose tip, mouth and tragions as `[x, y]`.
    pub keypoints: [[f32; 2]; FACE_KEYPOINTS],
}

impl FaceDetection {
    /// Converts the bounding box to a pixel rectangle `(x, y, w, h)` clamped
    /// to a `width` × `height` frame. Returns `None` if nothing remains.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn pixel_rect(&self, width: u32, height: u32) -> Option<(i32, i32, u32, u32)> {
        let (wf, hf) = (width as f32, height as f32);
        let x0 = (self.bbox[0] * wf).clamp(0.0, wf) as i32;
        let y0 = (self.bbox[1] * hf).clamp(0.0, hf) as i32;
        let x1 = (self.bbox[2] * wf).clamp(0.0, wf) as i32;
        let y1 = (self.bbox[3] * hf).clamp(0.0, hf) as i32;
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}
