//! Per-file processing: resample, window, infer, score, reassemble.
//!
//! One call to [`process_file`] takes decoded audio through the whole chain:
//! mono mixdown and forward resample, context-padded windowing, per-window
//! inference and scoring, and reassembly back to the file's native sample
//! rate. The model is only reached through the [`WindowTransform`] interface.

use crate::audio::level::{apply_gain_db, peak_normalize};
use crate::audio::resample::AudioResampler;
use crate::chunk::{reassemble, ChunkPlan};
use crate::error::VcError;
use crate::mel::LogMelSpectrogram;
use crate::model::vc::WindowTransform;
use crate::perf::{self, Metric};
use burn::tensor::backend::Backend;
use burn::tensor::ElementConversion;

/// Knobs governing one file's trip through the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineParams {
    /// Core chunk width C in samples at the processing rate.
    pub chunk_size: usize,
    /// Sample rate the model operates at.
    pub target_rate: u32,
    /// Peak-normalize the input before windowing and the output before writing.
    pub normalize: bool,
    /// Output gain in decibels (0 = no change).
    pub gain_db: f32,
}

/// Result of processing one file.
#[derive(Debug)]
pub struct FileOutcome {
    /// Transformed waveform at the file's native sample rate.
    pub samples: Vec<f32>,
    /// The file's native sample rate.
    pub sample_rate: u32,
    /// One mel-distance score per window.
    pub scores: Vec<f32>,
    /// Concatenated formant tracks, one vector per formant, truncated to the
    /// processing-rate length. Only consumed by diagnostics.
    pub formants: Vec<Vec<f32>>,
}

/// Mean absolute log-mel distance between two equal-length waveforms.
///
/// Both sides go through the same shared extractor so they are compared in an
/// identical feature space. The metric is absolute, not energy-normalized:
/// cross-file comparisons assume comparable input loudness, which is what the
/// optional upstream peak normalization provides.
pub fn mel_distance<B: Backend>(mel: &LogMelSpectrogram<B>, a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let fa = mel.extract(a);
    let fb = mel.extract(b);
    (fa - fb).abs().mean().into_scalar().elem::<f32>()
}

/// Run one file's audio through the model.
///
/// `samples` is the decoded per-channel audio at `sample_rate`. `on_window`
/// is invoked after each window with `(index, count, score)` for progress
/// reporting. Errors are file-scoped: the caller abandons this file and
/// continues with the next one.
pub fn process_file<B: Backend>(
    transform: &dyn WindowTransform,
    mel: &LogMelSpectrogram<B>,
    samples: Vec<Vec<f32>>,
    sample_rate: u32,
    params: &PipelineParams,
    mut on_window: impl FnMut(usize, usize, f32),
) -> Result<FileOutcome, VcError> {
    // Forward conversion: mono at the processing rate.
    let mut wave = {
        let _span = perf::span(Metric::ResampleForward);
        AudioResampler::to_mono_at(samples, sample_rate, params.target_rate)
            .map_err(VcError::InferenceFailure)?
    };
    perf::add_count(Metric::SamplesIn, wave.len() as u64);

    if params.normalize {
        match peak_normalize(&mut wave) {
            Ok(_) | Err(VcError::SilentInput) => {
                // Silence is processable audio; normalization is just skipped.
            }
            Err(err) => return Err(err),
        }
    }

    let total_len = wave.len();
    let plan = ChunkPlan::new(params.chunk_size, total_len)?;
    let padded = plan.pad(&wave);
    let window_count = plan.window_count();

    let mut cores: Vec<Vec<f32>> = Vec::with_capacity(window_count);
    let mut formant_cores: Vec<Vec<Vec<f32>>> = Vec::new();
    let mut scores = Vec::with_capacity(window_count);
    let chunk = plan.chunk_size();

    for (index, window) in plan.windows(&padded).enumerate() {
        let output = {
            let _span = perf::span(Metric::WindowTransform);
            transform.transform(window).map_err(VcError::InferenceFailure)?
        };
        if output.wave.len() != window.len() {
            return Err(VcError::InferenceFailure(anyhow::anyhow!(
                "model returned {} samples for a {}-sample window",
                output.wave.len(),
                window.len()
            )));
        }

        // Drop the context margins; only the core survives.
        let core_out = output.wave[chunk..2 * chunk].to_vec();
        let core_in = plan.core(window);

        let score = {
            let _span = perf::span(Metric::Score);
            mel_distance(mel, core_in, &core_out)
        };
        on_window(index, window_count, score);

        cores.push(core_out);
        formant_cores.push(
            output
                .formants
                .iter()
                .map(|track| track[chunk..2 * chunk].to_vec())
                .collect(),
        );
        scores.push(score);
        perf::add_count(Metric::WindowsProcessed, 1);
    }

    let rebuilt = reassemble(&cores, total_len);
    debug_assert_eq!(rebuilt.len(), total_len);

    let n_formants = formant_cores.first().map(Vec::len).unwrap_or(0);
    let formants: Vec<Vec<f32>> = (0..n_formants)
        .map(|f| {
            let tracks: Vec<Vec<f32>> =
                formant_cores.iter().map(|cores| cores[f].clone()).collect();
            reassemble(&tracks, total_len)
        })
        .collect();

    // Inverse conversion back to the file's native rate, then gain and the
    // optional output normalization.
    let mut output = {
        let _span = perf::span(Metric::ResampleInverse);
        AudioResampler::resample_mono(rebuilt, params.target_rate, sample_rate)
            .map_err(VcError::InferenceFailure)?
    };
    apply_gain_db(&mut output, params.gain_db);
    if params.normalize {
        match peak_normalize(&mut output) {
            Ok(_) | Err(VcError::SilentInput) => {}
            Err(err) => return Err(err),
        }
    }
    perf::add_count(Metric::SamplesOut, output.len() as u64);

    Ok(FileOutcome {
        samples: output,
        sample_rate,
        scores,
        formants,
    })
}

#[cfg(test)]
mod tests {
    use super::{mel_distance, process_file, PipelineParams};
    use crate::config::MelConfig;
    use crate::mel::LogMelSpectrogram;
    use crate::model::vc::{WindowOutput, WindowTransform};
    use burn_ndarray::{NdArray, NdArrayDevice};

    type TestBackend = NdArray<f32>;

    /// Passes every window through untouched.
    struct Identity;

    impl WindowTransform for Identity {
        fn transform(&self, window: &[f32]) -> anyhow::Result<WindowOutput> {
            Ok(WindowOutput {
                wave: window.to_vec(),
                formants: vec![vec![100.0; window.len()]],
            })
        }
    }

    /// Fails on every window.
    struct Broken;

    impl WindowTransform for Broken {
        fn transform(&self, _window: &[f32]) -> anyhow::Result<WindowOutput> {
            anyhow::bail!("tensor shape mismatch")
        }
    }

    fn test_mel() -> LogMelSpectrogram<TestBackend> {
        let config = MelConfig {
            sample_rate: 48000,
            n_fft: 64,
            hop_length: 16,
            n_mels: 8,
            f_min: 0.0,
            f_max: 0.0,
        };
        LogMelSpectrogram::new(&config, &NdArrayDevice::default())
    }

    fn params(chunk_size: usize) -> PipelineParams {
        PipelineParams {
            chunk_size,
            target_rate: 48000,
            normalize: false,
            gain_db: 0.0,
        }
    }

    fn sine(len: usize) -> Vec<f32> {
        (0..len).map(|i| (i as f32 * 0.01).sin() * 0.5).collect()
    }

    #[test]
    fn identity_model_reconstructs_the_input_exactly() {
        let mel = test_mel();
        // Input already at the target rate, so no resampling blurs the check.
        let input = sine(1000);
        let outcome = process_file(
            &Identity,
            &mel,
            vec![input.clone()],
            48000,
            &params(64),
            |_, _, _| {},
        )
        .expect("process");

        assert_eq!(outcome.samples, input);
        for score in &outcome.scores {
            assert!(score.abs() < 1e-5, "expected zero mel loss, got {score}");
        }
    }

    #[test]
    fn output_length_equals_input_length_at_target_rate() {
        let mel = test_mel();
        for len in [1, 63, 64, 65, 1000] {
            let outcome = process_file(
                &Identity,
                &mel,
                vec![sine(len)],
                48000,
                &params(64),
                |_, _, _| {},
            )
            .expect("process");
            assert_eq!(outcome.samples.len(), len, "length invariant broke at L={len}");
        }
    }

    #[test]
    fn five_seconds_of_audio_yields_six_windows() {
        let mel = test_mel();
        // 240000 samples at 48 kHz with 48000-sample chunks: 5 full chunks
        // plus the trailing one.
        let input = sine(240_000);
        let mut seen = Vec::new();
        let outcome = process_file(
            &Identity,
            &mel,
            vec![input.clone()],
            48000,
            &params(48000),
            |index, count, _| seen.push((index, count)),
        )
        .expect("process");

        assert_eq!(outcome.scores.len(), 6);
        assert_eq!(seen.len(), 6);
        assert!(seen.iter().all(|&(_, count)| count == 6));
        assert_eq!(outcome.samples.len(), input.len());
    }

    #[test]
    fn native_rate_is_restored_after_processing() {
        let mel = test_mel();
        // 1 s at 44100 Hz goes through a forward and an inverse resample.
        let input = sine(44100);
        let outcome = process_file(
            &Identity,
            &mel,
            vec![input.clone()],
            44100,
            &params(4800),
            |_, _, _| {},
        )
        .expect("process");

        assert_eq!(outcome.sample_rate, 44100);
        let expected = input.len() as f64;
        assert!(
            (outcome.samples.len() as f64 - expected).abs() < expected * 0.01,
            "got {} samples",
            outcome.samples.len()
        );
    }

    #[test]
    fn silent_input_with_normalization_does_not_crash() {
        let mel = test_mel();
        let mut p = params(64);
        p.normalize = true;
        let outcome = process_file(
            &Identity,
            &mel,
            vec![vec![0.0_f32; 500]],
            48000,
            &p,
            |_, _, _| {},
        )
        .expect("process");
        assert_eq!(outcome.samples.len(), 500);
        assert!(outcome.samples.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn empty_waveform_is_a_no_op() {
        let mel = test_mel();
        let outcome = process_file(
            &Identity,
            &mel,
            vec![Vec::new()],
            48000,
            &params(64),
            |_, _, _| {},
        )
        .expect("process");
        assert!(outcome.samples.is_empty());
        assert!(outcome.scores.is_empty());
    }

    #[test]
    fn model_failure_is_reported_as_inference_failure() {
        let mel = test_mel();
        let err = process_file(
            &Broken,
            &mel,
            vec![sine(200)],
            48000,
            &params(64),
            |_, _, _| {},
        )
        .unwrap_err();
        assert!(err.to_string().contains("Inference failed"));
    }

    #[test]
    fn gain_scales_the_output() {
        let mel = test_mel();
        let mut p = params(64);
        p.gain_db = -20.0;
        let input = sine(256);
        let outcome = process_file(
            &Identity,
            &mel,
            vec![input.clone()],
            48000,
            &p,
            |_, _, _| {},
        )
        .expect("process");
        for (out, inp) in outcome.samples.iter().zip(input.iter()) {
            assert!((out - inp * 0.1).abs() < 1e-6);
        }
    }

    #[test]
    fn identical_waveforms_have_zero_distance() {
        let mel = test_mel();
        let wave = sine(128);
        assert!(mel_distance(&mel, &wave, &wave).abs() < 1e-6);
        let other = vec![0.0_f32; 128];
        assert!(mel_distance(&mel, &wave, &other) > 0.0);
    }
}
