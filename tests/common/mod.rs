//! Shared helpers for integration tests.
#![allow(dead_code)]

use burn_ndarray::{NdArray, NdArrayDevice};
use revoice::audio::io::AudioIo;
use revoice::config::{Config, F0EstimatorConfig, GeneratorConfig, MelConfig};
use revoice::mel::LogMelSpectrogram;
use revoice::{WindowOutput, WindowTransform};
use safetensors::tensor::TensorView;
use safetensors::Dtype;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub type TestBackend = NdArray<f32>;

pub fn test_device() -> NdArrayDevice {
    NdArrayDevice::default()
}

/// A shrunken configuration so integration tests stay fast.
pub fn small_config() -> Config {
    Config {
        mel: MelConfig {
            sample_rate: 48000,
            n_fft: 64,
            hop_length: 16,
            n_mels: 8,
            f_min: 0.0,
            f_max: 0.0,
        },
        generator: GeneratorConfig {
            channels: 8,
            num_blocks: 1,
            dilation_base: 3,
            kernel_size: 3,
            upsample_ratios: vec![4, 4],
            n_formants: 2,
            weights_path: None,
        },
        f0_estimator: F0EstimatorConfig {
            channels: 8,
            n_formants: 2,
            weights_path: None,
        },
    }
}

pub fn small_mel() -> LogMelSpectrogram<TestBackend> {
    LogMelSpectrogram::new(&small_config().mel, &test_device())
}

/// Passes every window through untouched, with a flat formant track.
pub struct Identity;

impl WindowTransform for Identity {
    fn transform(&self, window: &[f32]) -> anyhow::Result<WindowOutput> {
        Ok(WindowOutput {
            wave: window.to_vec(),
            formants: vec![vec![120.0; window.len()]],
        })
    }
}

pub fn sine(len: usize) -> Vec<f32> {
    (0..len).map(|i| (i as f32 * 0.02).sin() * 0.5).collect()
}

pub fn write_sine_wav(path: &Path, len: usize, sample_rate: u32) {
    AudioIo::write_wav(path, &sine(len), sample_rate).expect("write wav");
}

/// Serialize zero-filled f32 tensors to a safetensors file.
fn write_zero_safetensors(path: &Path, shapes: &[(String, Vec<usize>)]) {
    let buffers: Vec<Vec<u8>> = shapes
        .iter()
        .map(|(_, shape)| vec![0u8; shape.iter().product::<usize>() * 4])
        .collect();
    let tensors: HashMap<String, TensorView<'_>> = shapes
        .iter()
        .zip(buffers.iter())
        .map(|((name, shape), data)| {
            let view = TensorView::new(Dtype::F32, shape.clone(), data).expect("tensor view");
            (name.clone(), view)
        })
        .collect();
    let bytes = safetensors::serialize(&tensors, &None).expect("serialize");
    std::fs::write(path, bytes).expect("write safetensors");
}

/// Write generator and F0 estimator checkpoints matching `config`, with all
/// weights zeroed. Returns `(generator_path, f0_estimator_path)`.
pub fn write_checkpoints(dir: &Path, config: &Config) -> (PathBuf, PathBuf) {
    let n_mels = config.mel.n_mels;
    let g = &config.generator;
    let mut shapes: Vec<(String, Vec<usize>)> = vec![
        ("input_conv.weight".into(), vec![g.channels, n_mels, 7]),
        ("input_conv.bias".into(), vec![g.channels]),
        ("formant_cond.weight".into(), vec![g.channels, g.n_formants, 1]),
        ("formant_cond.bias".into(), vec![g.channels]),
    ];
    for i in 0..g.num_blocks {
        for conv in ["conv1", "conv2"] {
            shapes.push((
                format!("blocks.{i}.{conv}.weight"),
                vec![g.channels, g.channels, g.kernel_size],
            ));
            shapes.push((format!("blocks.{i}.{conv}.bias"), vec![g.channels]));
        }
    }
    let mut channels = g.channels;
    for (i, &ratio) in g.upsample_ratios.iter().enumerate() {
        let out_channels = (channels / 2).max(1);
        shapes.push((
            format!("upsample.{i}.weight"),
            vec![channels, out_channels, 3 * ratio],
        ));
        shapes.push((format!("upsample.{i}.bias"), vec![out_channels]));
        channels = out_channels;
    }
    for head in ["harmonic_head", "noise_head"] {
        shapes.push((format!("{head}.weight"), vec![1, channels, 7]));
        shapes.push((format!("{head}.bias"), vec![1]));
    }
    let generator_path = dir.join("generator.safetensors");
    write_zero_safetensors(&generator_path, &shapes);

    let f = &config.f0_estimator;
    let f0_shapes: Vec<(String, Vec<usize>)> = vec![
        ("input_conv.weight".into(), vec![f.channels, n_mels, 5]),
        ("input_conv.bias".into(), vec![f.channels]),
        ("hidden_conv.weight".into(), vec![f.channels, f.channels, 5]),
        ("hidden_conv.bias".into(), vec![f.channels]),
        ("output_conv.weight".into(), vec![f.n_formants, f.channels, 1]),
        ("output_conv.bias".into(), vec![f.n_formants]),
    ];
    let f0_path = dir.join("f0_estimator.safetensors");
    write_zero_safetensors(&f0_path, &f0_shapes);

    (generator_path, f0_path)
}

/// Write `config` as YAML next to the checkpoints.
pub fn write_config_yaml(dir: &Path, config: &Config) -> PathBuf {
    let path = dir.join("model.yaml");
    let yaml = serde_yaml::to_string(config).expect("serialize config");
    std::fs::write(&path, yaml).expect("write config");
    path
}
