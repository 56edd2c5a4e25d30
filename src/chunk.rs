//! Context-padded windowing over long waveforms.
//!
//! A waveform of length `L` is processed in windows of `3 * C` samples at
//! stride `C`: each window carries `C` samples of left context, a `C`-sample
//! core, and `C` samples of right context. Only the core survives inference;
//! concatenating all cores in order reconstructs the zero-extended waveform,
//! and truncating that to `L` recovers the original timeline exactly.

use crate::error::VcError;

/// Windowing plan for one waveform.
///
/// Precomputes the window count for a given waveform length and chunk size,
/// and owns the padded buffer the windows are sliced from.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    chunk_size: usize,
    total_len: usize,
    count: usize,
}

impl ChunkPlan {
    /// Build a plan for a waveform of `total_len` samples and core width
    /// `chunk_size`.
    ///
    /// # Errors
    ///
    /// Returns [`VcError::InvalidConfiguration`] when `chunk_size` is zero.
    pub fn new(chunk_size: usize, total_len: usize) -> Result<Self, VcError> {
        if chunk_size == 0 {
            return Err(VcError::InvalidConfiguration(
                "chunk size must be a positive number of samples".to_string(),
            ));
        }
        // One core per started chunk, plus one trailing core so the last real
        // samples always have a full right context made of real zeros.
        let count = if total_len == 0 {
            0
        } else {
            total_len / chunk_size + 1
        };
        Ok(Self {
            chunk_size,
            total_len,
            count,
        })
    }

    /// Core width in samples.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Original (unpadded) waveform length.
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Number of windows the plan will yield.
    pub fn window_count(&self) -> usize {
        self.count
    }

    /// Window length in samples (`3 * C`).
    pub fn window_len(&self) -> usize {
        self.chunk_size * 3
    }

    /// Build the padded buffer windows are sliced from.
    ///
    /// Layout: `[C zeros | waveform | zeros]`, zero-filled on the right up to
    /// `(count + 2) * C` so that window `k` is exactly
    /// `padded[k*C .. k*C + 3*C]` and its core aligns with
    /// `[k*C, (k+1)*C)` of the original timeline.
    pub fn pad(&self, samples: &[f32]) -> Vec<f32> {
        debug_assert_eq!(samples.len(), self.total_len);
        let padded_len = (self.count + 2) * self.chunk_size;
        let mut padded = vec![0.0_f32; padded_len];
        if !samples.is_empty() {
            padded[self.chunk_size..self.chunk_size + samples.len()].copy_from_slice(samples);
        }
        padded
    }

    /// Iterate over the windows of a padded buffer produced by [`ChunkPlan::pad`].
    ///
    /// Windows are yielded lazily in index order; nothing beyond the padded
    /// buffer is ever materialized.
    pub fn windows<'a>(&self, padded: &'a [f32]) -> impl ExactSizeIterator<Item = &'a [f32]> {
        let chunk = self.chunk_size;
        let window = self.window_len();
        debug_assert_eq!(padded.len(), (self.count + 2) * chunk);
        (0..self.count).map(move |k| &padded[k * chunk..k * chunk + window])
    }

    /// Extract the core region (`[C, 2C)`) of one window.
    pub fn core<'a>(&self, window: &'a [f32]) -> &'a [f32] {
        &window[self.chunk_size..2 * self.chunk_size]
    }
}

/// Concatenate per-window core outputs and truncate to the original length.
///
/// The concatenation covers `count * C >= total_len` samples; truncation back
/// to `total_len` discards only the trailing silence padding.
pub fn reassemble(cores: &[Vec<f32>], total_len: usize) -> Vec<f32> {
    let mut out: Vec<f32> = Vec::with_capacity(cores.iter().map(Vec::len).sum());
    for core in cores {
        out.extend_from_slice(core);
    }
    debug_assert!(out.len() >= total_len);
    out.truncate(total_len);
    out
}
