//! Plain 1D convolution ops with explicit weight tensors.
//!
//! Weights live directly on the structs so checkpoint tensors map onto them
//! one-to-one; this is an offline pipeline, so no streaming history is kept.

use crate::weights::{take, StateDict};
use anyhow::Result;
use burn::tensor::backend::Backend;
use burn::tensor::module::{conv1d, conv_transpose1d};
use burn::tensor::ops::{ConvOptions, ConvTransposeOptions};
use burn::tensor::Tensor;

/// 1D convolution with explicit weights.
#[derive(Debug, Clone)]
pub struct Conv1dOp<B: Backend> {
    /// Weight tensor `[out, in, kernel]`.
    pub weight: Tensor<B, 3>,
    /// Bias `[out]`.
    pub bias: Tensor<B, 1>,
    /// Symmetric padding in samples.
    pub padding: usize,
    /// Dilation factor.
    pub dilation: usize,
}

impl<B: Backend> Conv1dOp<B> {
    /// Zero-initialized convolution; weights are filled in by the checkpoint.
    pub fn zeros(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        dilation: usize,
        device: &B::Device,
    ) -> Self {
        // "Same" padding so the frame axis is preserved.
        let padding = dilation * (kernel_size - 1) / 2;
        Self {
            weight: Tensor::zeros([out_channels, in_channels, kernel_size], device),
            bias: Tensor::zeros([out_channels], device),
            padding,
            dilation,
        }
    }

    /// Replace weights with checkpoint tensors under `prefix`.
    pub fn load(&mut self, state: &StateDict, prefix: &str) -> Result<()> {
        let device = self.weight.device();
        self.weight = take(state, &format!("{prefix}.weight"))?.tensor3(&device)?;
        self.bias = take(state, &format!("{prefix}.bias"))?.tensor1(&device)?;
        Ok(())
    }

    /// Apply the convolution to `[batch, channels, time]`.
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        conv1d(
            input,
            self.weight.clone(),
            Some(self.bias.clone()),
            ConvOptions::new([1], [self.padding], [self.dilation], 1),
        )
    }
}

/// 1D transposed convolution used for upsampling by an integer stride.
#[derive(Debug, Clone)]
pub struct ConvTranspose1dOp<B: Backend> {
    /// Weight tensor `[in, out, kernel]`.
    pub weight: Tensor<B, 3>,
    /// Bias `[out]`.
    pub bias: Tensor<B, 1>,
    /// Upsampling stride.
    pub stride: usize,
}

impl<B: Backend> ConvTranspose1dOp<B> {
    /// Zero-initialized upsampler with `kernel = 3 * stride` and
    /// `padding = stride`, so the output is exactly `stride` times longer.
    pub fn zeros(
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        device: &B::Device,
    ) -> Self {
        Self {
            weight: Tensor::zeros([in_channels, out_channels, 3 * stride], device),
            bias: Tensor::zeros([out_channels], device),
            stride,
        }
    }

    /// Replace weights with checkpoint tensors under `prefix`.
    pub fn load(&mut self, state: &StateDict, prefix: &str) -> Result<()> {
        let device = self.weight.device();
        self.weight = take(state, &format!("{prefix}.weight"))?.tensor3(&device)?;
        self.bias = take(state, &format!("{prefix}.bias"))?.tensor1(&device)?;
        Ok(())
    }

    /// Apply the transposed convolution to `[batch, channels, time]`.
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        conv_transpose1d(
            input,
            self.weight.clone(),
            Some(self.bias.clone()),
            ConvTransposeOptions::new([self.stride], [self.stride], [0], [1], 1),
        )
    }
}
