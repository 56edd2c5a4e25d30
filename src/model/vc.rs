//! The window-transform capability interface and its concrete implementation.
//!
//! The windowing and reassembly core only ever sees [`WindowTransform`]: a
//! black-box function from one context-padded window to a transformed window
//! plus an auxiliary formant track. Any model architecture can sit behind it.

use crate::config::Config;
use crate::download::download_if_necessary;
use crate::mel::LogMelSpectrogram;
use crate::model::f0::F0Estimator;
use crate::model::generator::Generator;
use crate::weights::{load_f0_state_dict, load_generator_state_dict};
use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use std::path::PathBuf;

/// Output of one window inference: a transformed waveform window and a
/// formant track, both the full window length.
#[derive(Debug, Clone)]
pub struct WindowOutput {
    /// Transformed samples, same length as the input window.
    pub wave: Vec<f32>,
    /// Formant tracks, one vector per formant, each the window length.
    pub formants: Vec<Vec<f32>>,
}

/// Capability interface for per-window model inference.
///
/// Implementations must return outputs of exactly the input window's length;
/// the pipeline crops context margins afterwards. Inference runs without any
/// gradient tracking: every backend used here is a non-autodiff backend.
pub trait WindowTransform {
    /// Transform one context-padded window.
    fn transform(&self, window: &[f32]) -> Result<WindowOutput>;
}

/// The concrete voice-conversion model: log-mel features feed the F0
/// estimator, and the generator synthesizes the output window conditioned on
/// both.
#[derive(Debug, Clone)]
pub struct VcModel<B: Backend> {
    generator: Generator<B>,
    f0: F0Estimator<B>,
    mel: LogMelSpectrogram<B>,
    /// Scale on the generator's noise synthesis branch.
    noise: f32,
    /// Scale on the generator's harmonic synthesis branch.
    harmonics: f32,
}

impl<B: Backend> VcModel<B> {
    /// Build the model and load both checkpoints.
    ///
    /// Paths may be local files, `hf://owner/repo/file[@rev]`, or `https://`
    /// URLs. Missing or unreadable checkpoints are a configuration error and
    /// abort the run before any file is processed.
    pub fn from_config(
        config: &Config,
        generator_path: &str,
        f0_estimator_path: &str,
        noise: f32,
        harmonics: f32,
        device: &B::Device,
    ) -> Result<Self> {
        config.validate()?;

        let generator_path: PathBuf = download_if_necessary(generator_path)
            .with_context(|| format!("generator weights: {generator_path}"))?;
        let f0_path: PathBuf = download_if_necessary(f0_estimator_path)
            .with_context(|| format!("f0 estimator weights: {f0_estimator_path}"))?;

        let mut generator = Generator::from_config(&config.generator, config.mel.n_mels, device);
        generator
            .load_state_dict(&load_generator_state_dict(&generator_path)?)
            .with_context(|| format!("loading {}", generator_path.display()))?;

        let mut f0 = F0Estimator::from_config(&config.f0_estimator, config.mel.n_mels, device);
        f0.load_state_dict(&load_f0_state_dict(&f0_path)?)
            .with_context(|| format!("loading {}", f0_path.display()))?;

        Ok(Self {
            generator,
            f0,
            mel: LogMelSpectrogram::new(&config.mel, device),
            noise,
            harmonics,
        })
    }

    /// Build the model without loading checkpoints (zero weights).
    pub fn uninitialized(config: &Config, device: &B::Device) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            generator: Generator::from_config(&config.generator, config.mel.n_mels, device),
            f0: F0Estimator::from_config(&config.f0_estimator, config.mel.n_mels, device),
            mel: LogMelSpectrogram::new(&config.mel, device),
            noise: 1.0,
            harmonics: 1.0,
        })
    }

    /// The model's feature extractor, shared with the scorer.
    pub fn mel(&self) -> &LogMelSpectrogram<B> {
        &self.mel
    }
}

impl<B: Backend> WindowTransform for VcModel<B> {
    fn transform(&self, window: &[f32]) -> Result<WindowOutput> {
        let features = self.mel.extract(window);
        let tracks = self.f0.estimate(features.clone());
        let (wave, track) =
            self.generator
                .wave_formants(features, tracks, self.noise, self.harmonics, window.len());

        let wave = wave
            .into_data()
            .into_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("generator output transfer failed: {e:?}"))?;

        let [_, n_formants, len] = track.dims();
        let flat = track
            .into_data()
            .into_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("formant track transfer failed: {e:?}"))?;
        let formants = (0..n_formants)
            .map(|f| flat[f * len..(f + 1) * len].to_vec())
            .collect();

        Ok(WindowOutput { wave, formants })
    }
}

#[cfg(test)]
mod tests {
    use super::{VcModel, WindowTransform};
    use crate::config::Config;
    use burn_ndarray::{NdArray, NdArrayDevice};

    type TestBackend = NdArray<f32>;

    #[test]
    fn transform_preserves_window_length() {
        let device = NdArrayDevice::default();
        let mut config = Config::default();
        // Keep the test model small.
        config.generator.channels = 32;
        config.generator.num_blocks = 1;
        config.f0_estimator.channels = 16;

        let model = VcModel::<TestBackend>::uninitialized(&config, &device).expect("model");
        let window = vec![0.25_f32; 4800];
        let out = model.transform(&window).expect("transform");
        assert_eq!(out.wave.len(), window.len());
        assert_eq!(out.formants.len(), config.generator.n_formants);
        for track in &out.formants {
            assert_eq!(track.len(), window.len());
        }
    }

    #[test]
    fn missing_checkpoints_are_a_configuration_error() {
        let device = NdArrayDevice::default();
        let config = Config::default();
        let err = VcModel::<TestBackend>::from_config(
            &config,
            "missing_generator.safetensors",
            "missing_f0.safetensors",
            1.0,
            1.0,
            &device,
        )
        .unwrap_err();
        assert!(err.to_string().contains("generator weights"));
    }
}
