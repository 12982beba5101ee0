//! Gaze ratio from the pupil's horizontal position inside an eye crop.
//!
//! The crop around the eye contour is converted to gray, histogram-equalized
//! and adaptively thresholded so the dark iris becomes foreground. The ratio
//! of foreground pixels in the left half to those in the right half tells
//! which way the eye is turned.

// Allow common image code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use image::{imageops, GrayImage, Luma, RgbImage};

use crate::domain::Point;

/// Added to the right-half count so an empty right half stays finite.
pub const RATIO_EPSILON: f32 = 1e-6;
/// Lower bound of the two-eye ratio.
pub const MIN_GAZE_RATIO: f32 = 0.1;
/// Upper bound of the two-eye ratio.
pub const MAX_GAZE_RATIO: f32 = 10.0;

/// Pixels added around the eye contour's bounding box.
const EYE_PADDING: i64 = 2;
/// Adaptive threshold neighbourhood (pixels, odd).
const BLOCK_SIZE: usize = 11;
/// Offset subtracted from the local mean.
const THRESHOLD_C: i32 = 2;

/// 256-bin histogram of gray levels.
#[derive(Debug, Clone)]
pub struct Histogram {
    bins: [u64; 256],
    total: u64,
}

impl Histogram {
    /// Compute histogram from grayscale image.
    #[must_use]
    pub fn from_luma(image: &GrayImage) -> Self {
        let mut bins = [0u64; 256];
        for pixel in image.pixels() {
            bins[usize::from(pixel.0[0])] += 1;
        }
        let total = bins.iter().sum();
        Self { bins, total }
    }

    /// Returns the total pixel count.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Lowest occupied gray level.
    #[must_use]
    pub fn first_occupied(&self) -> Option<u8> {
        self.bins.iter().position(|&c| c > 0).map(|i| i as u8)
    }

    /// Lookup table that spreads the cumulative distribution over 0..=255.
    ///
    /// The lowest occupied level maps to 0. A single-level image maps to
    /// itself.
    #[must_use]
    pub fn equalization_lut(&self) -> [u8; 256] {
        let mut lut = [0u8; 256];
        let Some(first) = self.first_occupied() else {
            return lut;
        };
        let first = usize::from(first);

        if self.bins[first] == self.total {
            return [first as u8; 256];
        }

        let scale = 255.0 / (self.total - self.bins[first]) as f64;
        let mut cumulative = 0u64;
        for i in first + 1..256 {
            cumulative += self.bins[i];
            lut[i] = (cumulative as f64 * scale).round().min(255.0) as u8;
        }
        lut
    }
}

/// Histogram-equalizes a gray image.
#[must_use]
pub fn equalize(image: &GrayImage) -> GrayImage {
    let lut = Histogram::from_luma(image).equalization_lut();
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = lut[usize::from(pixel.0[0])];
    }
    out
}

/// Converts RGB to gray with BT.601 weights.
#[must_use]
pub fn to_gray(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let v = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
        Luma([v.round().min(255.0) as u8])
    })
}

/// Normalized 1-D Gaussian kernel.
fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size as f32 - 1.0) * 0.5;
    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f32 - center;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Gaussian-weighted local mean with replicated borders.
fn gaussian_mean(image: &GrayImage, size: usize) -> GrayImage {
    let kernel = gaussian_kernel(size);
    let radius = (size / 2) as i64;
    let (w, h) = (image.width() as i64, image.height() as i64);

    let mut horizontal = vec![0f32; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x + k as i64 - radius).clamp(0, w - 1);
                acc += weight * f32::from(image.get_pixel(sx as u32, y as u32).0[0]);
            }
            horizontal[(y * w + x) as usize] = acc;
        }
    }

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let mut acc = 0.0;
        for (k, weight) in kernel.iter().enumerate() {
            let sy = (i64::from(y) + k as i64 - radius).clamp(0, h - 1);
            acc += weight * horizontal[(sy * w + i64::from(x)) as usize];
        }
        Luma([acc.round().clamp(0.0, 255.0) as u8])
    })
}

/// Inverse adaptive threshold: 255 where a pixel is at least `c` darker than
/// its Gaussian-weighted neighbourhood, 0 elsewhere.
#[must_use]
pub fn adaptive_threshold_inv(image: &GrayImage, block_size: usize, c: i32) -> GrayImage {
    let mean = gaussian_mean(image, block_size);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let src = i32::from(image.get_pixel(x, y).0[0]);
        let local = i32::from(mean.get_pixel(x, y).0[0]);
        Luma([if src - local <= -c { 255 } else { 0 }])
    })
}

/// Pixel bounding box `(x1, y1, x2, y2)` of an eye contour padded by two
/// pixels and clamped to the frame. `None` if nothing remains.
#[must_use]
pub fn eye_region(width: u32, height: u32, contour: &[Point; 6]) -> Option<(u32, u32, u32, u32)> {
    let (wf, hf) = (width as f32, height as f32);
    let xs = contour.iter().map(|p| (p.x * wf) as i64);
    let ys = contour.iter().map(|p| (p.y * hf) as i64);

    let x1 = xs.clone().min()?.saturating_sub(EYE_PADDING).max(0);
    let x2 = xs.max()?.saturating_add(EYE_PADDING).min(i64::from(width));
    let y1 = ys.clone().min()?.saturating_sub(EYE_PADDING).max(0);
    let y2 = ys.max()?.saturating_add(EYE_PADDING).min(i64::from(height));

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some((x1 as u32, y1 as u32, x2 as u32, y2 as u32))
}

/// Left-versus-right foreground balance of a binary mask.
///
/// Returns 1.0 when both halves are empty.
#[must_use]
pub fn split_ratio(mask: &GrayImage) -> f32 {
    let mid = mask.width() / 2;
    let (mut left, mut right) = (0u64, 0u64);
    for (x, _, pixel) in mask.enumerate_pixels() {
        if pixel.0[0] != 0 {
            if x < mid {
                left += 1;
            } else {
                right += 1;
            }
        }
    }
    if left + right == 0 {
        return 1.0;
    }
    left as f32 / (right as f32 + RATIO_EPSILON)
}

/// Gaze ratio of a single eye. 1.0 when the crop is empty.
#[must_use]
pub fn eye_gaze_ratio(image: &RgbImage, contour: &[Point; 6]) -> f32 {
    let Some((x1, y1, x2, y2)) = eye_region(image.width(), image.height(), contour) else {
        return 1.0;
    };
    let roi = imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image();
    let gray = equalize(&to_gray(&roi));
    let mask = adaptive_threshold_inv(&gray, BLOCK_SIZE, THRESHOLD_C);
    split_ratio(&mask)
}

/// Averages both eyes and clamps to [`MIN_GAZE_RATIO`, `MAX_GAZE_RATIO`].
#[must_use]
pub fn combine_ratios(left: f32, right: f32) -> f32 {
    let mean = (left + right) / 2.0;
    if mean.is_nan() {
        return 1.0;
    }
    mean.clamp(MIN_GAZE_RATIO, MAX_GAZE_RATIO)
}
