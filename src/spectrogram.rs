//! Diagnostic spectrogram images.
//!
//! Optionally rendered per file: the input, the output, and their absolute
//! difference, as grayscale PNGs of a high-resolution log-mel spectrogram
//! (n_fft 3840, hop 240, 256 mels). Diagnostics only; never fed back into
//! the pipeline.

use crate::config::MelConfig;
use crate::mel::LogMelSpectrogram;
use anyhow::Result;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use image::{GrayImage, Luma};
use std::path::Path;

/// High-resolution mel settings used only for rendering.
pub fn render_config(sample_rate: u32) -> MelConfig {
    MelConfig {
        sample_rate,
        n_fft: 3840,
        hop_length: 240,
        n_mels: 256,
        f_min: 0.0,
        f_max: 0.0,
    }
}

/// Renderer holding its own high-resolution extractor.
#[derive(Debug, Clone)]
pub struct SpectrogramRenderer<B: Backend> {
    mel: LogMelSpectrogram<B>,
}

impl<B: Backend> SpectrogramRenderer<B> {
    /// Build a renderer for waveforms at `sample_rate`.
    pub fn new(sample_rate: u32, device: &B::Device) -> Self {
        Self {
            mel: LogMelSpectrogram::new(&render_config(sample_rate), device),
        }
    }

    /// Render one waveform's log-mel spectrogram to a PNG.
    pub fn render(&self, samples: &[f32], path: impl AsRef<Path>) -> Result<()> {
        let features = self.mel.extract(samples);
        save_image(features, path)
    }

    /// Render the absolute log-mel difference of two waveforms to a PNG.
    pub fn render_diff(&self, a: &[f32], b: &[f32], path: impl AsRef<Path>) -> Result<()> {
        let diff = (self.mel.extract(a) - self.mel.extract(b)).abs();
        save_image(diff, path)
    }
}

/// Map `[1, n_mels, frames]` onto a grayscale image, low frequencies at the
/// bottom, values normalized over the full image range.
fn save_image<B: Backend>(features: Tensor<B, 3>, path: impl AsRef<Path>) -> Result<()> {
    let [_, n_mels, frames] = features.dims();
    let values = features
        .into_data()
        .into_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("spectrogram transfer failed: {e:?}"))?;

    let (mut lo, mut hi) = (f32::INFINITY, f32::NEG_INFINITY);
    for &v in &values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    let range = if hi > lo { hi - lo } else { 1.0 };

    let mut image = GrayImage::new(frames.max(1) as u32, n_mels.max(1) as u32);
    for m in 0..n_mels {
        for t in 0..frames {
            let v = (values[m * frames + t] - lo) / range;
            // Row 0 is the top of the image; flip so bin 0 lands at the bottom.
            let y = (n_mels - 1 - m) as u32;
            image.put_pixel(t as u32, y, Luma([(v * 255.0).round() as u8]));
        }
    }
    image.save(path.as_ref())?;
    Ok(())
}
