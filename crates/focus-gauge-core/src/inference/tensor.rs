//! Tensor helpers shared by the detectors.

#![allow(clippy::cast_possible_truncation)]

use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use image::{imageops::FilterType, RgbImage};

/// Sigmoid activation.
#[inline]
#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Resizes to `size` × `size` and builds a `(1, 3, size, size)` tensor with
/// values scaled to [-1, 1].
///
/// # Errors
///
/// Returns an error if tensor creation fails.
pub fn image_to_input(image: &RgbImage, size: usize, device: &Device) -> Result<Tensor> {
    let resized = image::imageops::resize(image, size as u32, size as u32, FilterType::Triangle);
    let data: Vec<f32> = resized
        .into_raw()
        .into_iter()
        .map(|v| f32::from(v) / 127.5 - 1.0)
        .collect();

    Tensor::from_vec(data, (1, size, size, 3), device)?
        .permute((0, 3, 1, 2))?
        .contiguous()
        .context("Failed to build input tensor")
}
