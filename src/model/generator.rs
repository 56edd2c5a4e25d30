//! Waveform generator conditioned on log-mel features and formant tracks.
//!
//! The architecture is a dilated residual stack at the mel frame rate
//! followed by transposed-convolution upsampling back to the sample rate,
//! ending in separate harmonic and noise synthesis heads. The `harmonics`
//! and `noise` scalars scale the respective heads' contributions.

use crate::config::GeneratorConfig;
use crate::modules::conv::{Conv1dOp, ConvTranspose1dOp};
use crate::weights::StateDict;
use anyhow::Result;
use burn::tensor::activation::{leaky_relu, tanh};
use burn::tensor::backend::Backend;
use burn::tensor::{Distribution, Tensor};

/// Dilated residual block at the mel frame rate.
#[derive(Debug, Clone)]
struct ResBlock<B: Backend> {
    conv1: Conv1dOp<B>,
    conv2: Conv1dOp<B>,
}

impl<B: Backend> ResBlock<B> {
    fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.conv1.forward(leaky_relu(input.clone(), 0.1));
        let x = self.conv2.forward(leaky_relu(x, 0.1));
        input + x
    }
}

/// Neural vocoder producing a waveform window and an aligned formant track.
#[derive(Debug, Clone)]
pub struct Generator<B: Backend> {
    input_conv: Conv1dOp<B>,
    formant_cond: Conv1dOp<B>,
    blocks: Vec<ResBlock<B>>,
    upsample: Vec<ConvTranspose1dOp<B>>,
    harmonic_head: Conv1dOp<B>,
    noise_head: Conv1dOp<B>,
    /// Total upsampling factor; equals the mel hop length.
    hop_length: usize,
}

impl<B: Backend> Generator<B> {
    /// Build a zero-initialized generator from config.
    pub fn from_config(config: &GeneratorConfig, n_mels: usize, device: &B::Device) -> Self {
        let blocks = (0..config.num_blocks)
            .map(|i| {
                let dilation = config.dilation_base.pow(i as u32);
                ResBlock {
                    conv1: Conv1dOp::zeros(
                        config.channels,
                        config.channels,
                        config.kernel_size,
                        dilation,
                        device,
                    ),
                    conv2: Conv1dOp::zeros(
                        config.channels,
                        config.channels,
                        config.kernel_size,
                        1,
                        device,
                    ),
                }
            })
            .collect();

        // Channel count halves at every upsampling stage.
        let mut channels = config.channels;
        let mut upsample = Vec::with_capacity(config.upsample_ratios.len());
        for &ratio in &config.upsample_ratios {
            let out_channels = (channels / 2).max(1);
            upsample.push(ConvTranspose1dOp::zeros(channels, out_channels, ratio, device));
            channels = out_channels;
        }

        Self {
            input_conv: Conv1dOp::zeros(n_mels, config.channels, 7, 1, device),
            formant_cond: Conv1dOp::zeros(config.n_formants, config.channels, 1, 1, device),
            blocks,
            upsample,
            harmonic_head: Conv1dOp::zeros(channels, 1, 7, 1, device),
            noise_head: Conv1dOp::zeros(channels, 1, 7, 1, device),
            hop_length: config.upsample_ratios.iter().product(),
        }
    }

    /// Load checkpoint weights into the generator.
    pub fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        self.input_conv.load(state, "input_conv")?;
        self.formant_cond.load(state, "formant_cond")?;
        for (i, block) in self.blocks.iter_mut().enumerate() {
            block.conv1.load(state, &format!("blocks.{i}.conv1"))?;
            block.conv2.load(state, &format!("blocks.{i}.conv2"))?;
        }
        for (i, up) in self.upsample.iter_mut().enumerate() {
            up.load(state, &format!("upsample.{i}"))?;
        }
        self.harmonic_head.load(state, "harmonic_head")?;
        self.noise_head.load(state, "noise_head")?;
        Ok(())
    }

    /// Synthesize a waveform window and its formant track.
    ///
    /// `mel` is `[1, n_mels, frames]`, `formants` is `[1, n_formants, frames]`
    /// in Hz. Both outputs are cropped to exactly `out_len` samples: the
    /// upsampled length `frames * hop` slightly overshoots the window because
    /// mel frames are centered.
    pub fn wave_formants(
        &self,
        mel: Tensor<B, 3>,
        formants: Tensor<B, 3>,
        noise: f32,
        harmonics: f32,
        out_len: usize,
    ) -> (Tensor<B, 2>, Tensor<B, 3>) {
        let frames = mel.dims()[2];
        debug_assert!(frames * self.hop_length >= out_len);

        // Condition on formants scaled to unit order of magnitude.
        let cond = self.formant_cond.forward(formants.clone().mul_scalar(1e-3));
        let mut x = self.input_conv.forward(mel) + cond;
        for block in &self.blocks {
            x = block.forward(x);
        }
        for up in &self.upsample {
            x = up.forward(leaky_relu(x, 0.1));
        }

        let harmonic = tanh(self.harmonic_head.forward(x.clone())).mul_scalar(harmonics);
        let excitation = Tensor::random(
            harmonic.dims(),
            Distribution::Normal(0.0, 1.0),
            &harmonic.device(),
        );
        let noisy = self.noise_head.forward(x) * excitation.mul_scalar(noise);

        let mixed = harmonic + noisy;
        let samples = mixed.dims()[2];
        let wave = mixed.reshape([1, samples]).narrow(1, 0, out_len);

        let track = upsample_nearest(formants, self.hop_length).narrow(2, 0, out_len);
        (wave, track)
    }
}

/// Nearest-neighbor upsampling along the time axis by an integer factor.
fn upsample_nearest<B: Backend>(input: Tensor<B, 3>, factor: usize) -> Tensor<B, 3> {
    let [batch, channels, frames] = input.dims();
    input
        .reshape([batch, channels, frames, 1])
        .repeat_dim(3, factor)
        .reshape([batch, channels, frames * factor])
}
