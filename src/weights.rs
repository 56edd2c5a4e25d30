//! SafeTensors checkpoint loading and name mapping.
//!
//! These helpers translate between the training checkpoints' tensor names and
//! the Rust module layout used by this crate, and convert raw payloads into
//! burn tensors.

use anyhow::Result;
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData as BurnTensorData};
use safetensors::{Dtype, SafeTensors};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Raw tensor payload extracted from a SafeTensors file.
#[derive(Debug, Clone)]
pub struct TensorPayload {
    /// Scalar dtype in the file.
    pub dtype: Dtype,
    /// Shape as a list of dimensions.
    pub shape: Vec<usize>,
    /// Raw byte buffer in row-major order.
    pub data: Vec<u8>,
}

impl TensorPayload {
    /// Capture a payload from a safetensors view.
    pub fn from_safetensor(tensor: safetensors::tensor::TensorView<'_>) -> Self {
        Self {
            dtype: tensor.dtype(),
            shape: tensor.shape().to_vec(),
            data: tensor.data().to_vec(),
        }
    }

    /// Decode the payload into f32 values.
    pub fn to_f32(&self) -> Result<Vec<f32>> {
        match self.dtype {
            Dtype::F32 => Ok(self
                .data
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes(c.try_into().expect("4-byte chunk")))
                .collect()),
            Dtype::BF16 => Ok(self
                .data
                .chunks_exact(2)
                .map(|c| {
                    let bits = u16::from_le_bytes(c.try_into().expect("2-byte chunk")) as u32;
                    f32::from_bits(bits << 16)
                })
                .collect()),
            other => anyhow::bail!("Unsupported checkpoint dtype {other:?}"),
        }
    }

    /// Build a 1D burn tensor from the payload.
    pub fn tensor1<B: Backend>(&self, device: &B::Device) -> Result<Tensor<B, 1>> {
        let values = self.to_f32()?;
        let shape: [usize; 1] = self
            .shape
            .clone()
            .try_into()
            .map_err(|_| anyhow::anyhow!("Expected 1D tensor, got shape {:?}", self.shape))?;
        Ok(Tensor::from_data(BurnTensorData::new(values, shape), device))
    }

    /// Build a 3D burn tensor from the payload.
    pub fn tensor3<B: Backend>(&self, device: &B::Device) -> Result<Tensor<B, 3>> {
        let values = self.to_f32()?;
        let shape: [usize; 3] = self
            .shape
            .clone()
            .try_into()
            .map_err(|_| anyhow::anyhow!("Expected 3D tensor, got shape {:?}", self.shape))?;
        Ok(Tensor::from_data(BurnTensorData::new(values, shape), device))
    }
}

/// A checkpoint's tensors keyed by Rust module path.
pub type StateDict = HashMap<String, TensorPayload>;

/// Load a generator checkpoint and map names into Rust module paths.
pub fn load_generator_state_dict(path: impl AsRef<Path>) -> Result<StateDict> {
    load_state_dict(path, &["generator."], GENERATOR_RENAMES)
}

/// Load an F0 estimator checkpoint and map names into Rust module paths.
pub fn load_f0_state_dict(path: impl AsRef<Path>) -> Result<StateDict> {
    load_state_dict(path, &["f0_estimator."], &[])
}

fn load_state_dict(
    path: impl AsRef<Path>,
    strip_prefixes: &[&str],
    renames: &[(&str, &str)],
) -> Result<StateDict> {
    let bytes = fs::read(path.as_ref())?;
    let tensors = SafeTensors::deserialize(&bytes)?;
    let mut state = HashMap::new();

    for name in tensors.names() {
        let tensor = tensors.tensor(name)?;
        if let Some(mapped) = map_name(name, strip_prefixes, renames) {
            state.insert(mapped, TensorPayload::from_safetensor(tensor));
        }
    }

    Ok(state)
}

// Mapping rules are intentionally explicit to make debugging weight loading easy.
const GENERATOR_RENAMES: &[(&str, &str)] = &[
    ("ups.", "upsample."),
    ("input_proj.", "input_conv."),
    ("head_harm.", "harmonic_head."),
    ("head_noise.", "noise_head."),
];

fn map_name(name: &str, strip_prefixes: &[&str], renames: &[(&str, &str)]) -> Option<String> {
    // Checkpoints saved from a DataParallel wrapper carry a "module." prefix.
    let mut rest = name.strip_prefix("module.").unwrap_or(name);
    for prefix in strip_prefixes {
        rest = rest.strip_prefix(prefix).unwrap_or(rest);
    }

    // Buffers that only matter during training are dropped.
    if rest.ends_with("num_batches_tracked") {
        return None;
    }

    for (from, to) in renames {
        if let Some(tail) = rest.strip_prefix(from) {
            return Some(format!("{to}{tail}"));
        }
    }
    Some(rest.to_string())
}

/// Fetch a named payload, failing with the checkpoint's module path.
pub fn take(state: &StateDict, name: &str) -> Result<TensorPayload> {
    state
        .get(name)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Checkpoint is missing tensor {name}"))
}
