//! Frame type: a dense pixel buffer shaped `(height, width, channels)`.
//!
//! Frames mirror the loosely-typed buffers a camera driver hands out, so any
//! shape is representable. Whether a frame is usable is decided by
//! [`crate::modules::is_valid_frame`], not by construction.

use image::{DynamicImage, RgbImage};
use ndarray::{ArrayD, Axis, IxDyn};
use thiserror::Error;

/// Width of the blank frame substituted for unusable input.
pub const BLANK_WIDTH: usize = 640;
/// Height of the blank frame substituted for unusable input.
pub const BLANK_HEIGHT: usize = 480;

/// Errors raised while building or converting frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Pixel data does not fill the requested shape.
    #[error("pixel data length {len} does not match shape {shape:?}")]
    ShapeMismatch {
        /// Requested shape.
        shape: Vec<usize>,
        /// Number of samples supplied.
        len: usize,
    },
    /// The frame is not a 3- or 4-channel color image.
    #[error("frame with shape {0:?} is not a 3- or 4-channel image")]
    NotColor(Vec<usize>),
}

/// A captured image frame.
///
/// Samples are 8-bit and stored row-major; channel order is RGB or RGBA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pixels: ArrayD<u8>,
}

impl Frame {
    /// Builds a frame from raw samples and an arbitrary shape.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::ShapeMismatch`] when `data` does not hold exactly
    /// the number of samples the shape describes.
    pub fn from_shape_vec(shape: &[usize], data: Vec<u8>) -> Result<Self, FrameError> {
        let len = data.len();
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(|pixels| Self { pixels })
            .map_err(|_| FrameError::ShapeMismatch {
                shape: shape.to_vec(),
                len,
            })
    }

    /// Creates an all-black frame of the given shape.
    #[must_use]
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            pixels: ArrayD::zeros(IxDyn(shape)),
        }
    }

    /// The 640×480×3 black frame used whenever no displayable image exists.
    #[must_use]
    pub fn blank() -> Self {
        Self::zeros(&[BLANK_HEIGHT, BLANK_WIDTH, 3])
    }

    /// Wraps an RGB image as a 3-channel frame.
    ///
    /// # Errors
    ///
    /// Only fails if the image buffer is inconsistent with its dimensions.
    pub fn from_rgb(image: RgbImage) -> Result<Self, FrameError> {
        let (width, height) = image.dimensions();
        Self::from_shape_vec(&[height as usize, width as usize, 3], image.into_raw())
    }

    /// Converts a decoded image into a frame, preserving its channel layout.
    ///
    /// Grayscale images become 2-axis frames and gray+alpha images 2-channel
    /// frames, both of which the validator rejects. Images with 16-bit or
    /// float samples are narrowed to 8-bit RGB(A).
    ///
    /// # Errors
    ///
    /// Only fails if the image buffer is inconsistent with its dimensions.
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self, FrameError> {
        let (h, w) = (image.height() as usize, image.width() as usize);
        match image {
            DynamicImage::ImageLuma8(buf) => Self::from_shape_vec(&[h, w], buf.as_raw().clone()),
            DynamicImage::ImageLumaA8(buf) => {
                Self::from_shape_vec(&[h, w, 2], buf.as_raw().clone())
            }
            DynamicImage::ImageRgb8(buf) => Self::from_shape_vec(&[h, w, 3], buf.as_raw().clone()),
            DynamicImage::ImageRgba8(buf) => {
                Self::from_shape_vec(&[h, w, 4], buf.as_raw().clone())
            }
            other if other.color().has_alpha() => {
                Self::from_shape_vec(&[h, w, 4], other.to_rgba8().into_raw())
            }
            other => Self::from_shape_vec(&[h, w, 3], other.to_rgb8().into_raw()),
        }
    }

    /// Shape of the underlying buffer.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        self.pixels.shape()
    }

    /// Number of axes.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.pixels.ndim()
    }

    /// Total number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Returns true if the frame holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Height in pixels (first axis), 0 for a 0-axis buffer.
    #[must_use]
    pub fn height(&self) -> usize {
        self.shape().first().copied().unwrap_or(0)
    }

    /// Width in pixels (second axis), 0 if absent.
    #[must_use]
    pub fn width(&self) -> usize {
        self.shape().get(1).copied().unwrap_or(0)
    }

    /// Channel count (third axis), if the frame has one.
    #[must_use]
    pub fn channels(&self) -> Option<usize> {
        self.shape().get(2).copied()
    }

    /// Read-only view of the samples.
    #[must_use]
    pub const fn pixels(&self) -> &ArrayD<u8> {
        &self.pixels
    }

    /// Returns a horizontally mirrored copy (selfie view).
    #[must_use]
    pub fn mirrored(&self) -> Self {
        let mut pixels = self.pixels.clone();
        if pixels.ndim() >= 2 {
            pixels.invert_axis(Axis(1));
        }
        Self {
            pixels: pixels.as_standard_layout().into_owned(),
        }
    }

    /// Converts to an RGB image, dropping the alpha channel of RGBA frames.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::NotColor`] unless the frame has 3 axes and 3 or
    /// 4 channels.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_rgb_image(&self) -> Result<RgbImage, FrameError> {
        let channels = match (self.ndim(), self.channels()) {
            (3, Some(c @ (3 | 4))) => c,
            _ => return Err(FrameError::NotColor(self.shape().to_vec())),
        };

        let samples: Vec<u8> = self.pixels.iter().copied().collect();
        let mut rgb = Vec::with_capacity(self.height() * self.width() * 3);
        for px in samples.chunks_exact(channels) {
            rgb.extend_from_slice(&px[..3]);
        }

        RgbImage::from_raw(self.width() as u32, self.height() as u32, rgb)
            .ok_or_else(|| FrameError::NotColor(self.shape().to_vec()))
    }
}
