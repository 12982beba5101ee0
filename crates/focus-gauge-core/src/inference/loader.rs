//! Weight loading and device selection.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use safetensors::SafeTensors;
use tracing::{debug, info};

/// Picks the inference device: Metal or CUDA when compiled in and present,
/// CPU otherwise.
#[must_use]
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    if let Ok(device) = Device::new_metal(0) {
        info!("Inference device: Metal");
        return device;
    }

    #[cfg(feature = "cuda")]
    if let Ok(device) = Device::new_cuda(0) {
        info!("Inference device: CUDA");
        return device;
    }

    info!("Inference device: CPU");
    Device::Cpu
}

/// Reads a safetensors file into a `VarBuilder` on `device`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid safetensors, or
/// holds a dtype candle does not support.
pub fn load_safetensors(path: impl AsRef<Path>, device: &Device) -> Result<VarBuilder<'static>> {
    let path = path.as_ref();
    debug!("Loading weights from {}", path.display());

    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read model file: {}", path.display()))?;
    let tensors = SafeTensors::deserialize(&data)
        .with_context(|| format!("Failed to parse safetensors: {}", path.display()))?;

    let mut by_name: HashMap<String, Tensor> = HashMap::with_capacity(tensors.len());
    for (name, view) in tensors.tensors() {
        let dtype = to_candle_dtype(view.dtype())?;
        let tensor = Tensor::from_raw_buffer(view.data(), dtype, view.shape(), device)
            .with_context(|| format!("Failed to create tensor '{name}'"))?;
        by_name.insert(name, tensor);
    }
    debug!("Loaded {} tensors", by_name.len());

    Ok(VarBuilder::from_tensors(by_name, DType::F32, device))
}

fn to_candle_dtype(dtype: safetensors::Dtype) -> Result<DType> {
    use safetensors::Dtype as S;
    Ok(match dtype {
        S::F32 => DType::F32,
        S::F64 => DType::F64,
        S::F16 => DType::F16,
        S::BF16 => DType::BF16,
        S::I64 => DType::I64,
        S::U32 => DType::U32,
        S::U8 => DType::U8,
        other => anyhow::bail!("Unsupported dtype: {other:?}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_weights(values: &[f32], shape: Vec<usize>) -> NamedTempFile {
        use safetensors::tensor::TensorView;

        let bytes: &[u8] = bytemuck::cast_slice(values);
        let view = TensorView::new(safetensors::Dtype::F32, shape, bytes).unwrap();
        let tensors = HashMap::from([("stem.weight".to_string(), view)]);
        let serialized = safetensors::serialize(&tensors, &None).unwrap();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&serialized).unwrap();
        file
    }

    #[test]
    fn test_select_device() {
        let _device = select_device();
    }

    #[test]
    fn test_load_safetensors_values() {
        let file = write_weights(&[1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let vb = load_safetensors(file.path(), &Device::Cpu).unwrap();
        let tensor = vb.get((2, 2), "stem.weight").unwrap();
        assert_eq!(
            tensor.to_vec2::<f32>().unwrap(),
            vec![vec![1.0, 2.0], vec![3.0, 4.0]]
        );
    }

    #[test]
    fn test_missing_file() {
        assert!(load_safetensors("/nonexistent/weights.safetensors", &Device::Cpu).is_err());
    }

    #[test]
    fn test_garbage_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not safetensors").unwrap();
        assert!(load_safetensors(file.path(), &Device::Cpu).is_err());
    }
}
