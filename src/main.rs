//! Command-line interface for batch voice conversion.
//!
//! The CLI wraps the core model to convert every audio file under an input
//! directory, writing transformed WAVs (and optional diagnostic spectrograms)
//! to an output directory.

use anyhow::Result;
use burn::tensor::backend::Backend;
use burn_ndarray::{NdArray, NdArrayDevice};
use clap::Parser;
use clap::ValueEnum;
use revoice::batch::{self, BatchOptions, FileStatus};
use revoice::config::{load_config, resolve_relative_path, Config};
use revoice::perf;
use revoice::pipeline::PipelineParams;
use revoice::runtime::{RuntimeParams, VcRuntime};
use revoice::VcError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "backend-wgpu")]
use burn_wgpu::graphics::AutoGraphicsApi;
#[cfg(feature = "backend-wgpu")]
use burn_wgpu::{init_setup, Wgpu, WgpuDevice};

/// Supported compute backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
enum BackendChoice {
    /// Use the WGPU backend (GPU acceleration when available).
    Wgpu,
    /// Use the ndarray backend (CPU).
    Ndarray,
}

#[cfg(feature = "backend-wgpu")]
const DEFAULT_BACKEND: BackendChoice = BackendChoice::Wgpu;
#[cfg(not(feature = "backend-wgpu"))]
const DEFAULT_BACKEND: BackendChoice = BackendChoice::Ndarray;

/// CLI options.
#[derive(Parser)]
#[command(name = "revoice")]
#[command(about = "Batch neural voice conversion", long_about = None)]
struct Cli {
    /// Directory scanned recursively for input audio (wav/mp3/ogg).
    #[arg(long, default_value = "inputs")]
    inputs: PathBuf,
    /// Directory converted files are written to.
    #[arg(long, default_value = "outputs")]
    outputs: PathBuf,
    /// Generator checkpoint: local path, hf://owner/repo/file, or https URL.
    #[arg(long)]
    generator_path: Option<String>,
    /// F0 estimator checkpoint: local path, hf://owner/repo/file, or https URL.
    #[arg(long)]
    f0_estimator_path: Option<String>,
    /// Model configuration YAML (defaults match the shipped checkpoints).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Compute backend to use.
    #[arg(long, value_enum, default_value_t = DEFAULT_BACKEND)]
    backend: BackendChoice,
    /// Core chunk size in samples at the model's sample rate.
    #[arg(long, default_value_t = 48000)]
    chunk: usize,
    /// Peak-normalize each file before inference and again before writing.
    #[arg(long)]
    normalize: bool,
    /// Scale on the noise synthesis branch.
    #[arg(long, default_value_t = 1.0)]
    noise: f32,
    /// Scale on the harmonic synthesis branch.
    #[arg(long, default_value_t = 1.0)]
    harmonics: f32,
    /// Output gain in decibels.
    #[arg(long, default_value_t = 0.0)]
    gain_db: f32,
    /// Also write input/output/diff spectrogram PNGs per file.
    #[arg(long)]
    spectrograms: bool,
    /// Print performance summary at the end of the run.
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupt_flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        interrupt_flag.store(true, Ordering::SeqCst);
    })?;

    match cli.backend {
        BackendChoice::Wgpu => {
            #[cfg(feature = "backend-wgpu")]
            {
                let device = WgpuDevice::default();
                init_setup::<AutoGraphicsApi>(&device, Default::default());
                run::<Wgpu>(cli, &device, &interrupted)?;
            }
            #[cfg(not(feature = "backend-wgpu"))]
            {
                let _ = &cli;
                anyhow::bail!("WGPU backend not enabled; build with --features backend-wgpu");
            }
        }
        BackendChoice::Ndarray => {
            let device = NdArrayDevice::default();
            run::<NdArray<f32>>(cli, &device, &interrupted)?;
        }
    }

    if verbose {
        eprintln!("{}", perf::report());
    }

    Ok(())
}

fn run<B: Backend>(cli: Cli, device: &B::Device, interrupted: &AtomicBool) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    let params = RuntimeParams {
        generator_path: checkpoint_path(
            cli.generator_path.as_deref(),
            config.generator.weights_path.as_deref(),
            cli.config.as_deref(),
            "generator.safetensors",
        ),
        f0_estimator_path: checkpoint_path(
            cli.f0_estimator_path.as_deref(),
            config.f0_estimator.weights_path.as_deref(),
            cli.config.as_deref(),
            "f0_estimator.safetensors",
        ),
        noise: cli.noise,
        harmonics: cli.harmonics,
    };
    let runtime = VcRuntime::<B>::from_config(&config, &params, device)?;

    let options = BatchOptions {
        inputs: cli.inputs,
        outputs: cli.outputs,
        params: PipelineParams {
            chunk_size: cli.chunk,
            target_rate: config.mel.sample_rate,
            normalize: cli.normalize,
            gain_db: cli.gain_db,
        },
        spectrograms: cli.spectrograms,
        progress: true,
    };

    let report = match batch::run(runtime.model(), runtime.mel(), &options, interrupted) {
        Ok(report) => report,
        // An empty batch is an informational outcome, not a failure.
        Err(err @ VcError::EmptyBatch { .. }) => {
            eprintln!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if report.interrupted {
        eprintln!("Interrupted; processed {} file(s)", report.files.len());
    }
    for file in &report.files {
        if let FileStatus::Failed { message } = &file.status {
            eprintln!("Failed {}: {message}", file.path.display());
        }
    }

    println!("Complete!");
    println!("{}", "-".repeat(80));
    match report.mean_score() {
        Some(mean) => println!("Total Valid. Mel loss: {mean:.5}"),
        None => println!("No files completed; no mel loss to report."),
    }

    Ok(())
}

/// Pick the checkpoint source: CLI flag, config entry (resolved next to the
/// config file), then the conventional filename.
fn checkpoint_path(
    cli: Option<&str>,
    configured: Option<&str>,
    config_path: Option<&std::path::Path>,
    fallback: &str,
) -> String {
    if let Some(path) = cli {
        return path.to_string();
    }
    if let Some(path) = configured {
        // Remote schemes pass through untouched.
        if path.contains("://") {
            return path.to_string();
        }
        return match config_path {
            Some(config) => resolve_relative_path(config, path).to_string_lossy().into_owned(),
            None => path.to_string(),
        };
    }
    fallback.to_string()
}
