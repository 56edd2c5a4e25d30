//! Bandlimited sample-rate conversion and mono mixdown.

use anyhow::Result;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

#[derive(Debug, Default)]
pub struct AudioResampler;

impl AudioResampler {
    /// Mix multi-channel audio down to mono and convert it to `to_rate`.
    ///
    /// This is the forward conversion applied once per file before windowing;
    /// the original channel buffers are consumed, not mutated in place.
    pub fn to_mono_at(samples: Vec<Vec<f32>>, from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
        let mono = mix_to_mono(samples)?;
        Self::resample_mono(mono, from_rate, to_rate)
    }

    /// Convert a mono waveform between sample rates with a bandlimited sinc
    /// interpolator. Identical rates and empty input pass through unchanged.
    pub fn resample_mono(samples: Vec<f32>, from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
        if from_rate == to_rate || samples.is_empty() {
            return Ok(samples);
        }

        let input_len = samples.len();
        let ratio = to_rate as f64 / from_rate as f64;
        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        // The whole clip is processed as a single chunk; this is an offline
        // pipeline and never streams partial buffers through the resampler.
        let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, input_len, 1)?;
        let mut output = resampler.process(&[samples], None)?;
        Ok(output.remove(0))
    }
}

/// Average all channels into one.
fn mix_to_mono(samples: Vec<Vec<f32>>) -> Result<Vec<f32>> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }
    if samples.len() == 1 {
        let mut samples = samples;
        return Ok(samples.remove(0));
    }

    let channels = samples.len();
    let len = samples[0].len();
    let mut mixed = vec![0.0_f32; len];
    for channel in &samples {
        if channel.len() != len {
            anyhow::bail!("Channel length mismatch in mono mixdown");
        }
        for (out, value) in mixed.iter_mut().zip(channel.iter()) {
            *out += *value;
        }
    }
    let scale = 1.0 / channels as f32;
    for value in &mut mixed {
        *value *= scale;
    }
    Ok(mixed)
}

#[cfg(test)]
mod tests {
    use super::AudioResampler;

    #[test]
    fn stereo_mixes_to_mono_and_resamples() {
        let left = vec![1.0_f32; 4800];
        let right = vec![0.0_f32; 4800];
        let output =
            AudioResampler::to_mono_at(vec![left, right], 44100, 48000).expect("convert audio");
        assert!(!output.is_empty());
        // Interior samples should sit near the 0.5 channel average.
        let mid = output[output.len() / 2];
        assert!((mid - 0.5).abs() < 0.05, "mid sample {mid}");
    }

    #[test]
    fn matching_rates_pass_through_exactly() {
        let samples = vec![0.25_f32, -0.5, 0.75];
        let output =
            AudioResampler::resample_mono(samples.clone(), 48000, 48000).expect("resample");
        assert_eq!(output, samples);
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let output = AudioResampler::resample_mono(Vec::new(), 44100, 48000).expect("resample");
        assert!(output.is_empty());
    }

    #[test]
    fn output_length_tracks_the_rate_ratio() {
        let samples = vec![0.0_f32; 44100];
        let output = AudioResampler::resample_mono(samples, 44100, 48000).expect("resample");
        let expected = 48000_f64;
        assert!(
            (output.len() as f64 - expected).abs() < expected * 0.01,
            "got {} samples",
            output.len()
        );
    }
}
