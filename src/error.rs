//! Error kinds for the batch inference pipeline.
//!
//! Fatal configuration problems abort the run before any file is touched;
//! everything else is scoped to a single file so the batch can continue.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the voice-conversion pipeline.
#[derive(Error, Debug)]
pub enum VcError {
    /// Invalid run configuration: zero chunk size, missing or unreadable
    /// model checkpoints, broken YAML. Fatal before any file is processed.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A buffer of all-zero samples was handed to peak normalization.
    /// Callers skip normalization and continue.
    #[error("Input is silent; peak normalization would divide by zero")]
    SilentInput,

    /// Discovery matched the file extension but the decoder could not read it.
    #[error("Unsupported or unreadable audio file: {path}")]
    UnsupportedFormat {
        /// The offending file.
        path: PathBuf,
        /// Decoder diagnostic.
        #[source]
        source: anyhow::Error,
    },

    /// The model raised during a forward pass.
    #[error("Inference failed: {0}")]
    InferenceFailure(#[source] anyhow::Error),

    /// No candidate files were discovered in the input directory.
    #[error("No input files found under {dir}")]
    EmptyBatch {
        /// The directory that was scanned.
        dir: PathBuf,
    },
}
