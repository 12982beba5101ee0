//! `BlazeFace` short-range face detector.
//!
//! Front-camera variant of "`BlazeFace`: Sub-millisecond Neural Face Detection
//! on Mobile GPUs" with 128×128 input, two feature scales (16×16 and 8×8) and
//! 896 anchors. Batch norm is folded into the convolution biases, matching
//! the converted `blazeface.safetensors` weights. Tensor names follow the
//! module layout: `conv0`, `backbone1.{i}`, `backbone2.{i}` (each with
//! `depthwise` and `pointwise`), `classifier_8`, `regressor_8` (16×16 map) and
//! `classifier_16`, `regressor_16` (8×8 map).

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{Device, Module, Tensor};
use candle_nn::{conv2d, Conv2d, Conv2dConfig, VarBuilder};
use image::RgbImage;
use tracing::debug;

use super::loader::load_safetensors;
use super::tensor::{image_to_input, sigmoid};
use crate::domain::{FaceDetection, FACE_KEYPOINTS};
use crate::ports::FaceDetector;

/// Input resolution of the short-range model.
pub const INPUT_SIZE: usize = 128;

/// Total anchors over both feature maps.
pub const NUM_ANCHORS: usize = 896;

/// Anchors on the 16×16 map (2 per cell).
const ANCHORS_16: usize = 512;
/// Anchors on the 8×8 map (6 per cell).
const ANCHORS_8: usize = 384;

/// Logits are clipped to this magnitude before the sigmoid.
const SCORE_CLIP: f32 = 100.0;

/// Non-maximum suppression IoU threshold.
const NMS_THRESHOLD: f32 = 0.3;

/// Configuration for face presence detection.
#[derive(Debug, Clone, PartialEq)]
pub struct BlazeFaceConfig {
    /// Detections scoring below this are dropped.
    pub min_confidence: f32,
    /// 0 selects the short-range model; no other model is bundled.
    pub model_selection: u8,
}

impl Default for BlazeFaceConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            model_selection: 0,
        }
    }
}

impl BlazeFaceConfig {
    /// Sets the minimum detection confidence.
    #[must_use]
    pub const fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Sets the model selection.
    #[must_use]
    pub const fn with_model_selection(mut self, model_selection: u8) -> Self {
        self.model_selection = model_selection;
        self
    }

    /// Checks that the configuration can be served.
    ///
    /// # Errors
    ///
    /// Returns an error for an unsupported model selection or a confidence
    /// outside [0, 1].
    pub fn validate(&self) -> Result<()> {
        if self.model_selection != 0 {
            anyhow::bail!(
                "model_selection {} is not supported; only 0 (short range) is available",
                self.model_selection
            );
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            anyhow::bail!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            );
        }
        Ok(())
    }
}

/// Depthwise-separable residual block.
struct BlazeBlock {
    depthwise: Conv2d,
    pointwise: Conv2d,
    channel_pad: usize,
    stride: usize,
}

impl BlazeBlock {
    fn new(in_channels: usize, out_channels: usize, stride: usize, vb: &VarBuilder) -> Result<Self> {
        let depthwise = conv2d(
            in_channels,
            in_channels,
            3,
            Conv2dConfig {
                stride,
                padding: if stride == 2 { 0 } else { 1 },
                groups: in_channels,
                ..Conv2dConfig::default()
            },
            vb.pp("depthwise"),
        )?;
        let pointwise = conv2d(
            in_channels,
            out_channels,
            1,
            Conv2dConfig::default(),
            vb.pp("pointwise"),
        )?;

        Ok(Self {
            depthwise,
            pointwise,
            channel_pad: out_channels.saturating_sub(in_channels),
            stride,
        })
    }
}

impl Module for BlazeBlock {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let (h, residual) = if self.stride == 2 {
            let padded = x.pad_with_zeros(2, 0, 2)?.pad_with_zeros(3, 0, 2)?;
            (padded, x.max_pool2d(2)?)
        } else {
            (x.clone(), x.clone())
        };

        let h = self.pointwise.forward(&self.depthwise.forward(&h)?.relu()?)?;
        let residual = if self.channel_pad > 0 {
            residual.pad_with_zeros(1, 0, self.channel_pad)?
        } else {
            residual
        };
        (h + residual)?.relu()
    }
}

/// Builds a run of blocks from `(in, out, stride)` triples.
fn blocks(layers: &[(usize, usize, usize)], vb: &VarBuilder) -> Result<Vec<BlazeBlock>> {
    layers.iter()
        .enumerate()
        .map(|(i, &(in_c, out_c, stride))| BlazeBlock::new(in_c, out_c, stride, &vb.pp(i.to_string())))
        .collect()
}

/// `BlazeFace` network with anchor decoding.
pub struct BlazeFace {
    conv0: Conv2d,
    backbone1: Vec<BlazeBlock>,
    backbone2: Vec<BlazeBlock>,
    classifier_8: Conv2d,
    regressor_8: Conv2d,
    classifier_16: Conv2d,
    regressor_16: Conv2d,
    anchors: Vec<[f32; 2]>,
    device: Device,
}

impl BlazeFace {
    /// Builds the network from weights.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor is missing or has the wrong shape.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(vb: VarBuilder) -> Result<Self> {
        let device = vb.device().clone();

        let conv0 = conv2d(
            3,
            24,
            5,
            Conv2dConfig {
                stride: 2,
                ..Conv2dConfig::default()
            },
            vb.pp("conv0"),
        )?;

        let backbone1 = blocks(
            &[
                (24, 24, 1),
                (24, 28, 1),
                (28, 32, 2),
                (32, 36, 1),
                (36, 42, 1),
                (42, 48, 2),
                (48, 56, 1),
                (56, 64, 1),
                (64, 72, 1),
                (72, 80, 1),
                (80, 88, 1),
            ],
            &vb.pp("backbone1"),
        )?;
        let backbone2 = blocks(
            &[(88, 96, 2), (96, 96, 1), (96, 96, 1), (96, 96, 1), (96, 96, 1)],
            &vb.pp("backbone2"),
        )?;

        let head = Conv2dConfig::default();
        Ok(Self {
            conv0,
            backbone1,
            backbone2,
            classifier_8: conv2d(88, 2, 1, head, vb.pp("classifier_8"))?,
            regressor_8: conv2d(88, 32, 1, head, vb.pp("regressor_8"))?,
            classifier_16: conv2d(96, 6, 1, head, vb.pp("classifier_16"))?,
            regressor_16: conv2d(96, 96, 1, head, vb.pp("regressor_16"))?,
            anchors: generate_anchors(),
            device,
        })
    }

    /// Loads weights from a safetensors file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or does not match the
    /// network layout.
    pub fn load(path: impl AsRef<Path>, device: &Device) -> Result<Self> {
        let path = path.as_ref();
        let vb = load_safetensors(path, device)
            .with_context(|| format!("Failed to load BlazeFace weights from {}", path.display()))?;
        Self::new(vb).context("Failed to build BlazeFace")
    }

    /// Runs the network, returning per-anchor logits `(1, 896, 1)` and
    /// regressions `(1, 896, 16)`.
    fn forward(&self, x: &Tensor) -> Result<(Tensor, Tensor)> {
        let x = x.pad_with_zeros(2, 1, 2)?.pad_with_zeros(3, 1, 2)?;
        let mut h = self.conv0.forward(&x)?.relu()?;

        for block in &self.backbone1 {
            h = block.forward(&h)?;
        }
        let map_16 = h.clone();
        for block in &self.backbone2 {
            h = block.forward(&h)?;
        }
        let map_8 = h;

        let flatten = |t: Tensor, n: usize, k: usize| t.permute((0, 2, 3, 1))?.reshape((1, n, k));

        let scores = Tensor::cat(
            &[
                flatten(self.classifier_8.forward(&map_16)?, ANCHORS_16, 1)?,
                flatten(self.classifier_16.forward(&map_8)?, ANCHORS_8, 1)?,
            ],
            1,
        )?;
        let boxes = Tensor::cat(
            &[
                flatten(self.regressor_8.forward(&map_16)?, ANCHORS_16, 16)?,
                flatten(self.regressor_16.forward(&map_8)?, ANCHORS_8, 16)?,
            ],
            1,
        )?;
        Ok((scores, boxes))
    }

    /// Detects faces, keeping those scoring at least `min_confidence`.
    ///
    /// Coordinates are normalized to the input image.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    pub fn detect(&self, image: &RgbImage, min_confidence: f32) -> Result<Vec<FaceDetection>> {
        let input = image_to_input(image, INPUT_SIZE, &self.device)?;
        let (scores, boxes) = self.forward(&input)?;

        let scores = scores.flatten_all()?.to_vec1::<f32>()?;
        let boxes = boxes.squeeze(0)?.to_vec2::<f32>()?;
        let detections = decode(&scores, &boxes, &self.anchors, min_confidence);
        debug!("BlazeFace: {} detection(s)", detections.len());
        Ok(detections)
    }
}

/// Anchor centers: 16×16 cells with 2 anchors each, then 8×8 with 6 each.
fn generate_anchors() -> Vec<[f32; 2]> {
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);
    for (grid, per_cell) in [(16u8, 2), (8u8, 6)] {
        let size = f32::from(grid);
        for y in 0..grid {
            for x in 0..grid {
                let center = [(f32::from(x) + 0.5) / size, (f32::from(y) + 0.5) / size];
                anchors.extend(std::iter::repeat(center).take(per_cell));
            }
        }
    }
    anchors
}

/// Turns raw logits and regressions into scored, suppressed detections.
fn decode(
    scores: &[f32],
    boxes: &[Vec<f32>],
    anchors: &[[f32; 2]],
    min_confidence: f32,
) -> Vec<FaceDetection> {
    let scale = INPUT_SIZE as f32;
    let mut detections = Vec::new();

    for ((&logit, raw), anchor) in scores.iter().zip(boxes).zip(anchors) {
        let score = sigmoid(logit.clamp(-SCORE_CLIP, SCORE_CLIP));
        if score < min_confidence || raw.len() < 4 + 2 * FACE_KEYPOINTS {
            continue;
        }

        let cx = anchor[0] + raw[0] / scale;
        let cy = anchor[1] + raw[1] / scale;
        let (w, h) = (raw[2] / scale, raw[3] / scale);

        let mut keypoints = [[0.0f32; 2]; FACE_KEYPOINTS];
        for (k, point) in keypoints.iter_mut().enumerate() {
            *point = [
                (anchor[0] + raw[4 + 2 * k] / scale).clamp(0.0, 1.0),
                (anchor[1] + raw[5 + 2 * k] / scale).clamp(0.0, 1.0),
            ];
        }

        detections.push(FaceDetection {
            bbox: [
                (cx - w / 2.0).clamp(0.0, 1.0),
                (cy - h / 2.0).clamp(0.0, 1.0),
                (cx + w / 2.0).clamp(0.0, 1.0),
                (cy + h / 2.0).clamp(0.0, 1.0),
            ],
            score,
            keypoints,
        });
    }

    nms(detections)
}

/// Greedy non-maximum suppression, highest score first.
fn nms(mut detections: Vec<FaceDetection>) -> Vec<FaceDetection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<FaceDetection> = Vec::new();
    for det in detections {
        if keep.iter().all(|k| iou(&k.bbox, &det.bbox) < NMS_THRESHOLD) {
            keep.push(det);
        }
    }
    keep
}

/// Intersection over union of two `[x_min, y_min, x_max, y_max]` boxes.
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let intersection = w * h;
    let union = (a[2] - a[0]) * (a[3] - a[1]) + (b[2] - b[0]) * (b[3] - b[1]) - intersection;
    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Face presence detector backed by `BlazeFace`.
pub struct BlazeFaceDetector {
    model: BlazeFace,
    config: BlazeFaceConfig,
}

impl BlazeFaceDetector {
    /// Wraps a loaded model.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(model: BlazeFace, config: BlazeFaceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { model, config })
    }

    /// Loads weights and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the weights cannot
    /// be loaded.
    pub fn load(path: impl AsRef<Path>, config: BlazeFaceConfig, device: &Device) -> Result<Self> {
        config.validate()?;
        Self::new(BlazeFace::load(path, device)?, config)
    }
}

impl FaceDetector for BlazeFaceDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<FaceDetection>> {
        self.model.detect(image, self.config.min_confidence)
    }
}
