//! Log-mel spectrogram extraction.
//!
//! One extractor instance is shared between model input features and the
//! reconstruction scorer so both sides compare waveforms in an identical
//! feature space. The transform is pure: the same samples always produce the
//! same features.
//!
//! Frames are windowed on the CPU, then the DFT and mel projection run as two
//! matmuls against precomputed bases: a periodic Hann window, a direct DFT
//! (no FFT) for exactness, and an HTK-scale triangular filterbank, matching
//! the reference preprocessing with `log(mel + 1e-5)` compression.

use crate::config::MelConfig;
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

const LOG_EPS: f32 = 1e-5;

#[inline]
fn hertz_to_mel(freq: f32) -> f32 {
    2595.0 * (1.0 + freq / 700.0).log10()
}

#[inline]
fn mel_to_hertz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank, flattened `[n_freq * n_mels]` row-major.
fn build_mel_filters(config: &MelConfig) -> Vec<f32> {
    let n_freq = config.n_fft / 2 + 1;
    let nyquist = config.sample_rate as f32 / 2.0;
    let f_max = if config.f_max > 0.0 {
        config.f_max
    } else {
        nyquist
    };

    let mel_min = hertz_to_mel(config.f_min);
    let mel_max = hertz_to_mel(f_max);
    let mut edges = vec![0.0_f32; config.n_mels + 2];
    for (i, edge) in edges.iter_mut().enumerate() {
        let mel = mel_min + (mel_max - mel_min) * i as f32 / (config.n_mels + 1) as f32;
        *edge = mel_to_hertz(mel);
    }

    let mut filters = vec![0.0_f32; n_freq * config.n_mels];
    for f in 0..n_freq {
        let freq = f as f32 * config.sample_rate as f32 / config.n_fft as f32;
        for m in 0..config.n_mels {
            let lower = edges[m];
            let center = edges[m + 1];
            let upper = edges[m + 2];
            let up = (freq - lower) / (center - lower).max(1e-6);
            let down = (upper - freq) / (upper - center).max(1e-6);
            filters[f * config.n_mels + m] = up.min(down).max(0.0);
        }
    }
    filters
}

/// Cos/sin DFT bases, flattened `[n_fft * n_freq]` row-major.
fn build_dft_bases(n_fft: usize) -> (Vec<f32>, Vec<f32>) {
    let n_freq = n_fft / 2 + 1;
    let mut cos_t = vec![0.0_f32; n_fft * n_freq];
    let mut sin_t = vec![0.0_f32; n_fft * n_freq];
    for n in 0..n_fft {
        for k in 0..n_freq {
            let angle = 2.0 * std::f32::consts::PI * (k as f32) * (n as f32) / (n_fft as f32);
            cos_t[n * n_freq + k] = angle.cos();
            sin_t[n * n_freq + k] = angle.sin();
        }
    }
    (cos_t, sin_t)
}

fn build_hann_window(n_fft: usize) -> Vec<f32> {
    (0..n_fft)
        .map(|i| {
            let angle = 2.0 * std::f32::consts::PI * (i as f32) / (n_fft as f32);
            0.5 * (1.0 - angle.cos())
        })
        .collect()
}

/// Reflect an out-of-range index back into `[0, len)`.
fn reflect_index(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let mut i = index.rem_euclid(period);
    if i >= len as isize {
        i = period - i;
    }
    i as usize
}

/// Log-mel spectrogram extractor with device-resident projection bases.
#[derive(Debug, Clone)]
pub struct LogMelSpectrogram<B: Backend> {
    /// DFT cosine basis `[n_fft, n_freq]`.
    dft_cos: Tensor<B, 2>,
    /// DFT sine basis `[n_fft, n_freq]`.
    dft_sin: Tensor<B, 2>,
    /// Mel filterbank `[n_freq, n_mels]`.
    filters: Tensor<B, 2>,
    /// Periodic Hann window, kept on the CPU for framing.
    window: Vec<f32>,
    n_fft: usize,
    hop_length: usize,
    n_mels: usize,
}

impl<B: Backend> LogMelSpectrogram<B> {
    /// Build the extractor for one mel configuration.
    pub fn new(config: &MelConfig, device: &B::Device) -> Self {
        let n_freq = config.n_fft / 2 + 1;
        let (cos_t, sin_t) = build_dft_bases(config.n_fft);
        let filters = build_mel_filters(config);
        Self {
            dft_cos: Tensor::from_data(TensorData::new(cos_t, [config.n_fft, n_freq]), device),
            dft_sin: Tensor::from_data(TensorData::new(sin_t, [config.n_fft, n_freq]), device),
            filters: Tensor::from_data(TensorData::new(filters, [n_freq, config.n_mels]), device),
            window: build_hann_window(config.n_fft),
            n_fft: config.n_fft,
            hop_length: config.hop_length,
            n_mels: config.n_mels,
        }
    }

    /// Number of mel bins per frame.
    pub fn n_mels(&self) -> usize {
        self.n_mels
    }

    /// Device the projection bases live on.
    pub fn device(&self) -> B::Device {
        self.filters.device()
    }

    /// Hop length between frames in samples.
    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Number of frames produced for a waveform of `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        len / self.hop_length + 1
    }

    /// Compute the log-mel spectrogram of a mono waveform.
    ///
    /// Output shape is `[1, n_mels, frames]` with `frames = len / hop + 1`
    /// (frames are centered; edges use reflection padding).
    pub fn extract(&self, samples: &[f32]) -> Tensor<B, 3> {
        let frames = self.frame_count(samples.len());
        let half = (self.n_fft / 2) as isize;

        let mut framed = vec![0.0_f32; frames * self.n_fft];
        for t in 0..frames {
            let start = (t * self.hop_length) as isize - half;
            let row = &mut framed[t * self.n_fft..(t + 1) * self.n_fft];
            for (n, out) in row.iter_mut().enumerate() {
                let index = start + n as isize;
                let value = if samples.is_empty() {
                    0.0
                } else {
                    samples[reflect_index(index, samples.len())]
                };
                *out = value * self.window[n];
            }
        }

        let device = self.filters.device();
        let framed =
            Tensor::<B, 2>::from_data(TensorData::new(framed, [frames, self.n_fft]), &device);
        let re = framed.clone().matmul(self.dft_cos.clone());
        let im = framed.matmul(self.dft_sin.clone());
        let power = re.clone() * re + im.clone() * im;
        let mel = power.matmul(self.filters.clone());
        let logmel = mel.add_scalar(LOG_EPS).log();

        // [frames, n_mels] -> [1, n_mels, frames]
        logmel.swap_dims(0, 1).unsqueeze_dim::<3>(0)
    }
}
