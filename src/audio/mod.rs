//! Audio decoding, resampling, and level utilities.
//!
//! These helpers keep waveform handling separate from the model itself:
//! reading and writing files, converting sample rates and channel counts,
//! and gain/normalization.

pub mod io;
pub mod level;
pub mod resample;
