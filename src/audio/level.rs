//! Gain and peak normalization.

use crate::error::VcError;

/// Divide all samples by the peak absolute value, returning the peak.
///
/// # Errors
///
/// Returns [`VcError::SilentInput`] for an all-zero buffer instead of
/// producing NaNs. Callers treat this as recoverable and skip normalization.
pub fn peak_normalize(samples: &mut [f32]) -> Result<f32, VcError> {
    let peak = samples.iter().fold(0.0_f32, |acc, &v| acc.max(v.abs()));
    if peak == 0.0 {
        return Err(VcError::SilentInput);
    }
    let inv = 1.0 / peak;
    for value in samples.iter_mut() {
        *value *= inv;
    }
    Ok(peak)
}

/// Convert a gain in decibels to a linear multiplier.
pub fn db_to_linear(gain_db: f32) -> f32 {
    10.0_f32.powf(gain_db / 20.0)
}

/// Apply a gain in decibels in place. 0 dB leaves the buffer untouched.
pub fn apply_gain_db(samples: &mut [f32], gain_db: f32) {
    if gain_db == 0.0 {
        return;
    }
    let scale = db_to_linear(gain_db);
    for value in samples.iter_mut() {
        *value *= scale;
    }
}
