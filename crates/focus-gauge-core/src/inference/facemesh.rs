//! 468-point face mesh regression.
//!
//! The mesh network takes a 192×192 face crop and regresses `(x, y, z)` for
//! every mesh point in crop pixel units, plus a face-presence logit. Blocks
//! are depthwise-separable with `PReLU` activations; stride-2 blocks pad
//! right/bottom and max-pool the residual.
//!
//! Weight names: `stem.conv`, `stem.act`, `backbone.{i}`, `coord_head.{i}`,
//! `coord_head.reduce`, `coord_head.act`, `coord_head.refine`,
//! `coord_head.out`, and the same `reduce/act/refine/out` layout under
//! `conf_head`. Blocks hold `depthwise`, `pointwise` and `act`.

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{Device, Module, Tensor};
use candle_nn::{conv2d, prelu, Conv2d, Conv2dConfig, PReLU, VarBuilder};
use image::{imageops, RgbImage};
use tracing::debug;

use super::blazeface::BlazeFace;
use super::loader::load_safetensors;
use super::tensor::{image_to_input, sigmoid};
use crate::domain::{FaceDetection, Landmarks, Point, MESH_POINTS};
use crate::ports::LandmarkDetector;

/// Input resolution of the mesh model.
pub const MESH_INPUT_SIZE: usize = 192;

/// Face crops are enlarged by this factor around the detection box.
const CROP_SCALE: f32 = 1.5;

struct MeshBlock {
    depthwise: Conv2d,
    pointwise: Conv2d,
    act: PReLU,
    channel_pad: usize,
    stride: usize,
}

impl MeshBlock {
    fn new(in_channels: usize, out_channels: usize, stride: usize, vb: &VarBuilder) -> Result<Self> {
        Ok(Self {
            depthwise: conv2d(
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
            )?,
            pointwise: conv2d(
                in_channels,
                out_channels,
                1,
                Conv2dConfig::default(),
                vb.pp("pointwise"),
            )?,
            act: prelu(Some(out_channels), vb.pp("act"))?,
            channel_pad: out_channels.saturating_sub(in_channels),
            stride,
        })
    }
}

impl Module for MeshBlock {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let (h, residual) = if self.stride == 2 {
            let padded = x.pad_with_zeros(2, 0, 2)?.pad_with_zeros(3, 0, 2)?;
            (padded, x.max_pool2d(2)?)
        } else {
            (x.clone(), x.clone())
        };
        let h = self.pointwise.forward(&self.depthwise.forward(&h)?)?;
        let residual = if self.channel_pad > 0 {
            residual.pad_with_zeros(1, 0, self.channel_pad)?
        } else {
            residual
        };
        self.act.forward(&(h + residual)?)
    }
}

/// Output head: leading blocks, 1×1 reduction to 32 channels, one more
/// block, then a 3×3 projection to `outputs` values.
struct Head {
    blocks: Vec<MeshBlock>,
    reduce: Conv2d,
    act: PReLU,
    refine: MeshBlock,
    out: Conv2d,
}

impl Head {
    fn new(leading: usize, outputs: usize, vb: &VarBuilder) -> Result<Self> {
        let blocks = (0..leading)
            .map(|i| MeshBlock::new(128, 128, if i == 0 { 2 } else { 1 }, &vb.pp(i.to_string())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            blocks,
            reduce: conv2d(128, 32, 1, Conv2dConfig::default(), vb.pp("reduce"))?,
            act: prelu(Some(32), vb.pp("act"))?,
            refine: MeshBlock::new(32, 32, 1, &vb.pp("refine"))?,
            out: conv2d(32, outputs, 3, Conv2dConfig::default(), vb.pp("out"))?,
        })
    }
}

impl Module for Head {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let mut h = x.clone();
        for block in &self.blocks {
            h = block.forward(&h)?;
        }
        let h = self.act.forward(&self.reduce.forward(&h)?)?;
        self.out.forward(&self.refine.forward(&h)?)
    }
}

/// Face mesh network.
pub struct FaceMesh {
    stem: Conv2d,
    stem_act: PReLU,
    backbone: Vec<MeshBlock>,
    coord_head: Head,
    conf_head: Head,
    device: Device,
}

/// Raw mesh output for one crop.
#[derive(Debug, Clone)]
pub struct MeshOutput {
    /// Points in crop pixel units (0..192).
    pub points: Vec<Point>,
    /// Face presence probability.
    pub confidence: f32,
}

impl FaceMesh {
    /// Builds the network from weights.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor is missing or has the wrong shape.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(vb: VarBuilder) -> Result<Self> {
        let device = vb.device().clone();
        let stem_vb = vb.pp("stem");

        let layout = [
            (16, 16, 1),
            (16, 16, 1),
            (16, 32, 2),
            (32, 32, 1),
            (32, 32, 1),
            (32, 64, 2),
            (64, 64, 1),
            (64, 64, 1),
            (64, 128, 2),
            (128, 128, 1),
            (128, 128, 1),
            (128, 128, 2),
            (128, 128, 1),
            (128, 128, 1),
        ];
        let backbone_vb = vb.pp("backbone");
        let backbone = layout
            .iter()
            .enumerate()
            .map(|(i, &(in_c, out_c, s))| MeshBlock::new(in_c, out_c, s, &backbone_vb.pp(i.to_string())))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            stem: conv2d(
                3,
                16,
                3,
                Conv2dConfig {
                    stride: 2,
                    ..Conv2dConfig::default()
                },
                stem_vb.pp("conv"),
            )?,
            stem_act: prelu(Some(16), stem_vb.pp("act"))?,
            backbone,
            coord_head: Head::new(3, MESH_POINTS * 3, &vb.pp("coord_head"))?,
            conf_head: Head::new(1, 1, &vb.pp("conf_head"))?,
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
            .with_context(|| format!("Failed to load face mesh weights from {}", path.display()))?;
        Self::new(vb).context("Failed to build face mesh")
    }

    /// Regresses the mesh for a face crop of any size.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    pub fn predict(&self, crop: &RgbImage) -> Result<MeshOutput> {
        let input = image_to_input(crop, MESH_INPUT_SIZE, &self.device)?;
        let x = input.pad_with_zeros(2, 0, 1)?.pad_with_zeros(3, 0, 1)?;
        let mut h = self.stem_act.forward(&self.stem.forward(&x)?)?;
        for block in &self.backbone {
            h = block.forward(&h)?;
        }

        let coords = self.coord_head.forward(&h)?.flatten_all()?.to_vec1::<f32>()?;
        let logit = self.conf_head.forward(&h)?.flatten_all()?.to_vec1::<f32>()?;
        let confidence = logit.first().copied().map_or(0.0, sigmoid);

        let points = coords
            .chunks_exact(3)
            .map(|c| Point::new(c[0], c[1], c[2]))
            .collect();
        Ok(MeshOutput { points, confidence })
    }
}

/// Square pixel crop around a detection, enlarged by [`CROP_SCALE`] and
/// clamped to the frame. Returns `(x, y, w, h)`.
fn face_crop(detection: &FaceDetection, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let (wf, hf) = (width as f32, height as f32);
    let [x0, y0, x1, y1] = detection.bbox;
    let cx = (x0 + x1) / 2.0 * wf;
    let cy = (y0 + y1) / 2.0 * hf;
    let side = ((x1 - x0) * wf).max((y1 - y0) * hf) * CROP_SCALE;

    let left = (cx - side / 2.0).max(0.0);
    let top = (cy - side / 2.0).max(0.0);
    let right = (cx + side / 2.0).min(wf);
    let bottom = (cy + side / 2.0).min(hf);
    if right - left < 1.0 || bottom - top < 1.0 {
        return None;
    }

    let (x, y) = (left as u32, top as u32);
    Some((x, y, (right as u32).saturating_sub(x).max(1), (bottom as u32).saturating_sub(y).max(1)))
}

/// Configuration for mesh landmark detection.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshConfig {
    /// Minimum confidence for the face detection that seeds the crop.
    pub detection_confidence: f32,
    /// Minimum mesh presence confidence.
    pub min_confidence: f32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            detection_confidence: 0.5,
            min_confidence: 0.5,
        }
    }
}

/// Single-face landmark detector: `BlazeFace` crop followed by the mesh.
pub struct MeshLandmarker {
    detector: BlazeFace,
    mesh: FaceMesh,
    config: MeshConfig,
}

impl MeshLandmarker {
    /// Combines loaded models.
    #[must_use]
    pub const fn new(detector: BlazeFace, mesh: FaceMesh, config: MeshConfig) -> Self {
        Self {
            detector,
            mesh,
            config,
        }
    }

    /// Loads both models from safetensors files.
    ///
    /// # Errors
    ///
    /// Returns an error if either model fails to load.
    pub fn load(
        detector_path: impl AsRef<Path>,
        mesh_path: impl AsRef<Path>,
        config: MeshConfig,
        device: &Device,
    ) -> Result<Self> {
        let detector = BlazeFace::load(detector_path, device)?;
        let mesh = FaceMesh::load(mesh_path, device)?;
        Ok(Self::new(detector, mesh, config))
    }
}

impl LandmarkDetector for MeshLandmarker {
    fn detect(&self, image: &RgbImage) -> Result<Option<Landmarks>> {
        let detections = self.detector.detect(image, self.config.detection_confidence)?;
        let Some(first) = detections.first() else {
            return Ok(None);
        };
        let Some((x, y, w, h)) = face_crop(first, image.width(), image.height()) else {
            debug!("Face crop empty for bbox {:?}", first.bbox);
            return Ok(None);
        };

        let crop = imageops::crop_imm(image, x, y, w, h).to_image();
        let output = self.mesh.predict(&crop)?;
        if output.confidence < self.config.min_confidence {
            debug!("Mesh confidence {:.2} below threshold", output.confidence);
            return Ok(None);
        }

        let (frame_w, frame_h) = (image.width() as f32, image.height() as f32);
        let input = MESH_INPUT_SIZE as f32;
        let points = output
            .points
            .iter()
            .map(|p| {
                Point::new(
                    (x as f32 + p.x / input * w as f32) / frame_w,
                    (y as f32 + p.y / input * h as f32) / frame_h,
                    p.z / input,
                )
            })
            .collect();
        Ok(Some(Landmarks::new(points)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::FACE_KEYPOINTS;

    fn detection(bbox: [f32; 4]) -> FaceDetection {
        FaceDetection {
            bbox,
            score: 0.9,
            keypoints: [[0.0; 2]; FACE_KEYPOINTS],
        }
    }

    #[test]
    fn test_default_mesh_config() {
        let config = MeshConfig::default();
        assert!((config.min_confidence - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_face_crop_is_enlarged_square() {
        let crop = face_crop(&detection([0.375, 0.375, 0.625, 0.625]), 160, 160).unwrap();
        assert_eq!(crop, (50, 50, 60, 60));
    }

    #[test]
    fn test_face_crop_uses_longer_side() {
        let crop = face_crop(&detection([0.375, 0.4375, 0.625, 0.5625]), 160, 160).unwrap();
        assert_eq!(crop, (50, 50, 60, 60));
    }

    #[test]
    fn test_face_crop_clamped() {
        let crop = face_crop(&detection([0.0, 0.0, 0.25, 0.25]), 160, 160).unwrap();
        assert_eq!(crop, (0, 0, 50, 50));
    }

    #[test]
    fn test_face_crop_degenerate() {
        assert!(face_crop(&detection([0.5, 0.5, 0.5, 0.5]), 100, 100).is_none());
    }
}
