//! High-level runtime wrapper for model bootstrapping.
//!
//! This module provides a stable, convenience-focused API for loading a
//! configuration and both checkpoints into a ready-to-run model. It is
//! intended to reduce boilerplate in CLIs and language bindings.

use crate::config::{load_config, Config};
use crate::mel::LogMelSpectrogram;
use crate::model::vc::VcModel;
use crate::perf::{self, Metric};
use anyhow::Result;
use burn::tensor::backend::Backend;
use std::path::Path;

/// Model parameters used when building a runtime.
#[derive(Debug, Clone)]
pub struct RuntimeParams {
    /// Generator checkpoint: local path, `hf://`, or `https://`.
    pub generator_path: String,
    /// F0 estimator checkpoint: local path, `hf://`, or `https://`.
    pub f0_estimator_path: String,
    /// Scale on the noise synthesis branch.
    pub noise: f32,
    /// Scale on the harmonic synthesis branch.
    pub harmonics: f32,
}

impl Default for RuntimeParams {
    fn default() -> Self {
        Self {
            generator_path: "generator.safetensors".into(),
            f0_estimator_path: "f0_estimator.safetensors".into(),
            noise: 1.0,
            harmonics: 1.0,
        }
    }
}

/// Runtime that owns the loaded model and its configuration.
#[derive(Debug)]
pub struct VcRuntime<B: Backend> {
    config: Config,
    model: VcModel<B>,
}

impl<B: Backend> VcRuntime<B> {
    /// Create a runtime from a config path.
    pub fn from_config_path(
        path: impl AsRef<Path>,
        params: &RuntimeParams,
        device: &B::Device,
    ) -> Result<Self> {
        let config = load_config(path)?;
        Self::from_config(&config, params, device)
    }

    /// Create a runtime from an already-loaded config.
    pub fn from_config(config: &Config, params: &RuntimeParams, device: &B::Device) -> Result<Self> {
        let _span = perf::span(Metric::RuntimeBuild);
        let model = VcModel::from_config(
            config,
            &params.generator_path,
            &params.f0_estimator_path,
            params.noise,
            params.harmonics,
            device,
        )?;
        Ok(Self {
            config: config.clone(),
            model,
        })
    }

    /// Access the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Access the underlying model (advanced usage).
    pub fn model(&self) -> &VcModel<B> {
        &self.model
    }

    /// The model's feature extractor, shared with the window scorer.
    pub fn mel(&self) -> &LogMelSpectrogram<B> {
        self.model.mel()
    }
}

#[cfg(test)]
mod tests {
    use super::{RuntimeParams, VcRuntime};
    use crate::config::Config;
    use burn_ndarray::{NdArray, NdArrayDevice};

    type TestBackend = NdArray<f32>;

    #[test]
    fn missing_checkpoints_abort_runtime_construction() {
        let device = NdArrayDevice::default();
        let params = RuntimeParams {
            generator_path: "no_such_generator.safetensors".into(),
            f0_estimator_path: "no_such_f0.safetensors".into(),
            ..RuntimeParams::default()
        };
        let err =
            VcRuntime::<TestBackend>::from_config(&Config::default(), &params, &device).unwrap_err();
        assert!(err.to_string().contains("generator weights"));
    }
}
