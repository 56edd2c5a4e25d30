//! Batch driver: file discovery, per-file isolation, aggregate reporting.
//!
//! Files are processed strictly one at a time, in sorted path order. A
//! failure on one file abandons that file (no partial output is written) and
//! the batch moves on; the aggregate score covers only windows of files that
//! completed.

use crate::audio::io::AudioIo;
use crate::error::VcError;
use crate::mel::LogMelSpectrogram;
use crate::model::vc::WindowTransform;
use crate::perf::{self, Metric};
use crate::pipeline::{process_file, PipelineParams};
use crate::spectrogram::SpectrogramRenderer;
use burn::tensor::backend::Backend;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use walkdir::WalkDir;

/// Extensions the discovery scan admits.
const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg"];

/// Options for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Directory scanned recursively for input files.
    pub inputs: PathBuf,
    /// Directory transformed files are written to (created if absent).
    pub outputs: PathBuf,
    /// Per-file pipeline parameters.
    pub params: PipelineParams,
    /// Also render input/output/diff spectrogram PNGs per file.
    pub spectrograms: bool,
    /// Show per-window progress bars.
    pub progress: bool,
}

/// How one file ended up.
#[derive(Debug)]
pub enum FileStatus {
    /// Output written; per-window scores recorded.
    Done {
        /// Path of the written WAV file.
        output: PathBuf,
        /// One score per window.
        scores: Vec<f32>,
    },
    /// File abandoned; diagnostic recorded, no output written.
    Failed {
        /// Human-readable failure description.
        message: String,
    },
}

/// Per-file entry in the batch report.
#[derive(Debug)]
pub struct FileReport {
    /// The input file.
    pub path: PathBuf,
    /// Outcome for this file.
    pub status: FileStatus,
}

/// Result of a whole batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per discovered file, in processing order.
    pub files: Vec<FileReport>,
    /// True when the run stopped early on an interrupt.
    pub interrupted: bool,
}

impl BatchReport {
    /// Mean score across all windows of all successful files, or `None` when
    /// no window contributed.
    pub fn mean_score(&self) -> Option<f32> {
        let mut sum = 0.0_f64;
        let mut count = 0_usize;
        for file in &self.files {
            if let FileStatus::Done { scores, .. } = &file.status {
                sum += scores.iter().map(|&s| s as f64).sum::<f64>();
                count += scores.len();
            }
        }
        (count > 0).then(|| (sum / count as f64) as f32)
    }

    /// Number of files that completed.
    pub fn succeeded(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Done { .. }))
            .count()
    }
}

/// Recursively discover audio files under `dir`, sorted for determinism.
pub fn discover_files(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    AUDIO_EXTENSIONS
                        .iter()
                        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
                })
        })
        .collect();
    paths.sort();
    paths
}

/// Output path for input file number `index`: `<outputs>/<index>_<stem>.wav`.
fn output_path(outputs: &Path, index: usize, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    outputs.join(format!("{index}_{stem}.wav"))
}

/// Run the batch: discover, process each file independently, report.
///
/// # Errors
///
/// [`VcError::EmptyBatch`] when no candidate file is found — a terminal
/// informational state, not a processing failure. [`VcError::InvalidConfiguration`]
/// for a zero chunk size, before any file is touched.
pub fn run<B: Backend>(
    transform: &dyn WindowTransform,
    mel: &LogMelSpectrogram<B>,
    options: &BatchOptions,
    interrupted: &AtomicBool,
) -> Result<BatchReport, VcError> {
    // Surface a bad chunk size before touching any file.
    crate::chunk::ChunkPlan::new(options.params.chunk_size, 0)?;

    let paths = discover_files(&options.inputs);
    if paths.is_empty() {
        return Err(VcError::EmptyBatch {
            dir: options.inputs.clone(),
        });
    }

    std::fs::create_dir_all(&options.outputs).map_err(|e| {
        VcError::InvalidConfiguration(format!(
            "cannot create output directory {}: {e}",
            options.outputs.display()
        ))
    })?;

    let renderer = options
        .spectrograms
        .then(|| SpectrogramRenderer::<B>::new(options.params.target_rate, &mel.device()));

    let total = paths.len();
    let mut report = BatchReport::default();

    for (index, path) in paths.iter().enumerate() {
        if interrupted.load(Ordering::SeqCst) {
            report.interrupted = true;
            break;
        }
        eprintln!("{index} / {total} : processing {}", path.display());

        let status = match run_one(transform, mel, options, renderer.as_ref(), index, path) {
            Ok(status) => {
                perf::add_count(Metric::FilesSucceeded, 1);
                status
            }
            Err(err) => {
                perf::add_count(Metric::FilesFailed, 1);
                log::error!("{}: {err:#}", path.display());
                eprintln!("Skipping {}: {err:#}", path.display());
                FileStatus::Failed {
                    message: format!("{err:#}"),
                }
            }
        };
        report.files.push(FileReport {
            path: path.clone(),
            status,
        });
    }

    Ok(report)
}

fn run_one<B: Backend>(
    transform: &dyn WindowTransform,
    mel: &LogMelSpectrogram<B>,
    options: &BatchOptions,
    renderer: Option<&SpectrogramRenderer<B>>,
    index: usize,
    path: &Path,
) -> Result<FileStatus, VcError> {
    let (samples, sample_rate) = {
        let _span = perf::span(Metric::DecodeFile);
        AudioIo::read_audio(path).map_err(|source| VcError::UnsupportedFormat {
            path: path.to_path_buf(),
            source,
        })?
    };

    // Keep a processing-rate copy of the input for the diff spectrogram.
    let input_for_diff = renderer.map(|_| {
        crate::audio::resample::AudioResampler::to_mono_at(
            samples.clone(),
            sample_rate,
            options.params.target_rate,
        )
    });

    let bar = if options.progress {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40}] {pos}/{len} {msg}")
                .expect("static template"),
        );
        Some(bar)
    } else {
        None
    };

    let outcome = process_file(
        transform,
        mel,
        samples,
        sample_rate,
        &options.params,
        |_, count, score| {
            if let Some(bar) = &bar {
                if bar.length() != Some(count as u64) {
                    bar.set_length(count as u64);
                }
                bar.set_message(format!("Mel loss: {score:.5}"));
                bar.inc(1);
            }
        },
    )?;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let output = output_path(&options.outputs, index, path);
    {
        let _span = perf::span(Metric::WriteOutput);
        AudioIo::write_wav(&output, &outcome.samples, outcome.sample_rate)
            .map_err(VcError::InferenceFailure)?;
    }

    if let (Some(renderer), Some(input)) = (renderer, input_for_diff) {
        let _span = perf::span(Metric::RenderSpectrograms);
        let input = input.map_err(VcError::InferenceFailure)?;
        // Compare in the processing-rate domain, like the scorer does.
        let rebuilt = crate::audio::resample::AudioResampler::resample_mono(
            outcome.samples.clone(),
            outcome.sample_rate,
            options.params.target_rate,
        )
        .map_err(VcError::InferenceFailure)?;
        let stem = output.with_extension("");
        let stem = stem.to_string_lossy();
        let render = |suffix: &str, result: anyhow::Result<()>| {
            if let Err(err) = result {
                log::warn!("spectrogram {suffix} for {}: {err:#}", path.display());
            }
        };
        render("input", renderer.render(&input, format!("{stem}_input.png")));
        render("output", renderer.render(&rebuilt, format!("{stem}_output.png")));
        let len = input.len().min(rebuilt.len());
        render(
            "diff",
            renderer.render_diff(&input[..len], &rebuilt[..len], format!("{stem}_diff.png")),
        );
    }

    Ok(FileStatus::Done {
        output,
        scores: outcome.scores,
    })
}

#[cfg(test)]
mod tests {
    use super::{discover_files, output_path};
    use std::path::Path;

    #[test]
    fn discovery_honors_the_extension_allow_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("sub");
        std::fs::create_dir_all(&nested).expect("mkdir");
        for name in ["a.wav", "b.MP3", "c.ogg", "d.flac", "notes.txt"] {
            std::fs::write(nested.join(name), b"x").expect("write");
        }

        let found = discover_files(dir.path());
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.wav", "b.MP3", "c.ogg"]);
    }

    #[test]
    fn discovery_of_missing_directory_is_empty() {
        assert!(discover_files(Path::new("no/such/directory")).is_empty());
    }

    #[test]
    fn output_names_carry_index_and_stem() {
        let out = output_path(Path::new("out"), 3, Path::new("in/voice sample.mp3"));
        assert_eq!(out, Path::new("out").join("3_voice sample.wav"));
    }
}
