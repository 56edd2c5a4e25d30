//! # revoice - Batch Neural Voice Conversion
//!
//! A Rust implementation of chunked voice-conversion inference, built for
//! deterministic batch processing of audio files on CPU or GPU.
//!
//! ## Architecture Overview
//!
//! The pipeline consists of three main components:
//!
//! 1. **Windowing** ([`chunk::ChunkPlan`]): Splits a waveform into overlapping
//!    windows of three chunks each, advancing one chunk at a time, so every
//!    inferred chunk sees a full chunk of context on both sides.
//!
//! 2. **Model** ([`VcModel`]): Extracts log-mel features from each window,
//!    estimates formant frequency tracks, and synthesizes the converted
//!    window with a dilated-convolution generator. Any other model can stand
//!    in through the [`WindowTransform`] trait.
//!
//! 3. **Scoring and Reassembly** ([`pipeline`]): Crops the context margins,
//!    scores each chunk by log-mel distance against its input, and
//!    concatenates the chunks back into a waveform at the file's native
//!    sample rate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use burn_ndarray::{NdArray, NdArrayDevice};
//! use revoice::audio::io::AudioIo;
//! use revoice::pipeline::{process_file, PipelineParams};
//! use revoice::{load_config, RuntimeParams, VcRuntime};
//!
//! // Load configuration and both checkpoints
//! let device = NdArrayDevice::default();
//! let config = load_config("model.yaml").unwrap();
//! let params = RuntimeParams {
//!     generator_path: "hf://owner/voice-model/generator.safetensors".into(),
//!     f0_estimator_path: "hf://owner/voice-model/f0_estimator.safetensors".into(),
//!     ..RuntimeParams::default()
//! };
//! let runtime = VcRuntime::<NdArray<f32>>::from_config(&config, &params, &device).unwrap();
//!
//! // Convert one file
//! let (samples, sample_rate) = AudioIo::read_audio("input.wav").unwrap();
//! let outcome = process_file(
//!     runtime.model(),
//!     runtime.mel(),
//!     samples,
//!     sample_rate,
//!     &PipelineParams {
//!         chunk_size: 48000,
//!         target_rate: config.mel.sample_rate,
//!         normalize: true,
//!         gain_db: 0.0,
//!     },
//!     |window, count, score| println!("{}/{count}: mel loss {score:.4}", window + 1),
//! )
//! .unwrap();
//! AudioIo::write_wav("output.wav", &outcome.samples, outcome.sample_rate).unwrap();
//! ```
//!
//! ## Batch Processing
//!
//! [`batch::run`] scans a directory tree for `wav`/`mp3`/`ogg` files and
//! processes them one at a time. A file that fails to decode or infer is
//! logged and skipped; the rest of the batch still completes. Each output is
//! written as `{index}_{stem}.wav`, optionally next to input/output/diff
//! spectrogram PNGs.
//!
//! ## Configuration
//!
//! Models are configured via YAML files that specify architecture parameters.
//! Checkpoints can be loaded from local files or automatically downloaded
//! from HuggingFace Hub using the `hf://` URL scheme.
//!
//! See [`Config`] for the full configuration structure.

// Public modules - these are part of the stable API
pub mod audio;
pub mod batch;
pub mod chunk;
pub mod config;
pub mod download;
pub mod error;
pub mod mel;
pub mod perf;
pub mod pipeline;
pub mod runtime;
pub mod spectrogram;

// Internal modules - exposed for integration tests but not part of stable API.
// These may change without notice between versions.
#[doc(hidden)]
pub mod model;
#[doc(hidden)]
pub mod modules;
#[doc(hidden)]
pub mod weights;

// Re-exports forming the public API
pub use config::{load_config, Config};
pub use download::download_if_necessary;
pub use error::VcError;
pub use model::vc::{VcModel, WindowOutput, WindowTransform};
pub use runtime::{RuntimeParams, VcRuntime};
