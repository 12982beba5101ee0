//! Candle inference backends.
//!
//! - `BlazeFace` short-range face detection (face presence)
//! - 468-point face mesh seeded by a `BlazeFace` crop (landmarks)

mod blazeface;
mod facemesh;
mod loader;
mod tensor;

pub use blazeface::{BlazeFace, BlazeFaceConfig, BlazeFaceDetector, INPUT_SIZE, NUM_ANCHORS};
pub use facemesh::{FaceMesh, MeshConfig, MeshLandmarker, MeshOutput, MESH_INPUT_SIZE};
pub use loader::{load_safetensors, select_device};
pub use tensor::sigmoid;
