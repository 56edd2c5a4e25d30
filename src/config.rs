//! Configuration types for the voice-conversion model architecture and weights.
//!
//! The built-in defaults match the shipped checkpoints; a YAML file loaded via
//! [`load_config`] can override any section.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
/// Log-mel feature extraction settings shared by the model and the scorer.
pub struct MelConfig {
    /// Sample rate the model operates at, in Hz.
    pub sample_rate: u32,
    /// FFT size in samples.
    pub n_fft: usize,
    /// Hop length between frames in samples.
    pub hop_length: usize,
    /// Number of mel bins.
    pub n_mels: usize,
    /// Lower edge of the mel filterbank in Hz.
    pub f_min: f32,
    /// Upper edge of the mel filterbank in Hz (0 = Nyquist).
    pub f_max: f32,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            n_fft: 1920,
            hop_length: 480,
            n_mels: 80,
            f_min: 0.0,
            f_max: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
/// Generator architecture parameters.
pub struct GeneratorConfig {
    /// Base channel count after the input convolution.
    pub channels: usize,
    /// Number of dilated residual blocks at the mel frame rate.
    pub num_blocks: usize,
    /// Dilation growth factor across residual blocks.
    pub dilation_base: usize,
    /// Residual block kernel size.
    pub kernel_size: usize,
    /// Upsampling stride per stage; the product must equal the mel hop length.
    pub upsample_ratios: Vec<usize>,
    /// Number of formant tracks consumed from the F0 estimator.
    pub n_formants: usize,
    /// Optional weights path for generator-only checkpoints.
    pub weights_path: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            channels: 192,
            num_blocks: 4,
            dilation_base: 3,
            kernel_size: 3,
            upsample_ratios: vec![8, 6, 5, 2],
            n_formants: 4,
            weights_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
/// F0 estimator architecture parameters.
pub struct F0EstimatorConfig {
    /// Hidden channel count.
    pub channels: usize,
    /// Number of formant tracks produced per frame.
    pub n_formants: usize,
    /// Optional weights path for estimator-only checkpoints.
    pub weights_path: Option<String>,
}

impl Default for F0EstimatorConfig {
    fn default() -> Self {
        Self {
            channels: 128,
            n_formants: 4,
            weights_path: None,
        }
    }
}

/// Top-level voice-conversion model configuration.
///
/// Weight paths can be local files or remote URLs using the `hf://` scheme
/// (e.g. `hf://owner/repo/generator.safetensors`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Log-mel feature extraction settings.
    pub mel: MelConfig,
    /// Generator architecture.
    pub generator: GeneratorConfig,
    /// F0 estimator architecture.
    pub f0_estimator: F0EstimatorConfig,
}

impl Config {
    /// Validate cross-section consistency.
    ///
    /// The generator upsamples from the mel frame rate back to the sample
    /// rate, so its stride product must match the mel hop length, and both
    /// models must agree on the number of formant tracks.
    pub fn validate(&self) -> anyhow::Result<()> {
        let product: usize = self.generator.upsample_ratios.iter().product();
        if product != self.mel.hop_length {
            anyhow::bail!(
                "Generator upsample ratios multiply to {product}, expected mel hop length {}",
                self.mel.hop_length
            );
        }
        if self.generator.n_formants != self.f0_estimator.n_formants {
            anyhow::bail!(
                "Generator expects {} formant tracks, F0 estimator produces {}",
                self.generator.n_formants,
                self.f0_estimator.n_formants
            );
        }
        if self.mel.n_fft < self.mel.hop_length {
            anyhow::bail!(
                "Mel n_fft ({}) must be at least the hop length ({})",
                self.mel.n_fft,
                self.mel.hop_length
            );
        }
        Ok(())
    }
}

/// Load a model configuration from a YAML file.
///
/// # Errors
///
/// Returns an error if the file doesn't exist, contains invalid YAML, or
/// fails cross-section validation.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }

    let data = fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&data)?;
    config.validate()?;
    Ok(config)
}

/// Resolve a possibly relative path against a config file location.
pub fn resolve_relative_path(config_path: &Path, maybe_relative: &str) -> PathBuf {
    let candidate = Path::new(maybe_relative);
    if candidate.is_absolute() {
        return candidate.to_path_buf();
    }
    config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(candidate)
}
