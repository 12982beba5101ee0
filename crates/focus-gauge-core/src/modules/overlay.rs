//! Debug overlay drawing.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::domain::{Eye, FaceDetection, Landmarks};

/// Eye landmark marker color.
pub const EYE_MARKER_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Detection box color.
pub const DETECTION_BOX_COLOR: Rgb<u8> = Rgb([224, 224, 224]);
/// Detection keypoint color.
pub const KEYPOINT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const MARKER_RADIUS: i32 = 2;
const BOX_THICKNESS: u32 = 2;

/// Draws a filled marker on each of the twelve eye contour points.
///
/// Points missing from a short mesh are skipped.
pub fn draw_eye_markers(image: &mut RgbImage, landmarks: &Landmarks) {
    let (w, h) = (image.width() as f32, image.height() as f32);
    for index in Eye::BOTH.iter().flat_map(|eye| eye.indices()) {
        if let Some(p) = landmarks.points().get(index) {
            if let Some(center) = marker_center(p.x, p.y, w, h) {
                draw_filled_circle_mut(image, center, MARKER_RADIUS, EYE_MARKER_COLOR);
            }
        }
    }
}

/// Draws each detection's bounding box and keypoints.
pub fn draw_detections(image: &mut RgbImage, detections: &[FaceDetection]) {
    let (w, h) = (image.width(), image.height());
    for detection in detections {
        if let Some((x, y, bw, bh)) = detection.pixel_rect(w, h) {
            for inset in 0..BOX_THICKNESS {
                if bw <= 2 * inset || bh <= 2 * inset {
                    break;
                }
                #[allow(clippy::cast_possible_wrap)]
                let rect = Rect::at(x + inset as i32, y + inset as i32)
                    .of_size(bw - 2 * inset, bh - 2 * inset);
                draw_hollow_rect_mut(image, rect, DETECTION_BOX_COLOR);
            }
        }
        for [kx, ky] in detection.keypoints {
            if let Some(center) = marker_center(kx, ky, w as f32, h as f32) {
                draw_filled_circle_mut(image, center, MARKER_RADIUS, KEYPOINT_COLOR);
            }
        }
    }
}

/// Pixel center of a normalized point, `None` for NaN or far off-frame points.
fn marker_center(x: f32, y: f32, w: f32, h: f32) -> Option<(i32, i32)> {
    let range = -1.0..=2.0;
    (range.contains(&x) && range.contains(&y)).then(|| ((x * w) as i32, (y * h) as i32))
}
