//! Numeric conventions shared by analysis and synthesis.
//!
//! # Level Conversions
//!
//! Model amplitudes are stored in dB relative to a magnitude threshold, so
//! that every audible value is positive and silence is exactly zero.
//! [`MagnitudeScale`] owns that threshold per session.
//!
//! # Utilities
//!
//! - [`next_power_of_two`] - Transform sizing
//! - [`round_to_odd`] - Odd window lengths
//! - [`tempered_to_ratio`] - Semitones to frequency ratio
//! - [`rms`] - Root mean square of a block
//! - [`spectral_approx`] - Resample a magnitude curve
//! - [`NoiseSource`] - Deterministic xorshift noise

use libm::{log10f, powf};

/// Lowest magnitude threshold a [`MagnitudeScale`] accepts (-100 dB).
pub const MIN_THRESHOLD: f32 = 1e-5;

/// Frequency ratio of one equal-tempered semitone.
pub const SEMITONE_RATIO: f32 = 1.059_463_1;

/// Smallest power of two greater than or equal to `n`.
///
/// # Example
/// ```rust
/// use sms_core::next_power_of_two;
///
/// assert_eq!(next_power_of_two(1001), 1024);
/// assert_eq!(next_power_of_two(1024), 1024);
/// ```
#[inline]
pub fn next_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Odd integer obtained by halving, truncating and doubling `x`, plus one.
///
/// Window lengths are kept odd so every window has a center sample.
#[inline]
pub fn round_to_odd(x: f32) -> usize {
    ((x * 0.5).max(0.0) as usize) * 2 + 1
}

/// Convert a transposition in equal-tempered semitones to a frequency ratio.
///
/// # Example
/// ```rust
/// use sms_core::tempered_to_ratio;
///
/// assert!((tempered_to_ratio(12.0) - 2.0).abs() < 1e-4);
/// assert!((tempered_to_ratio(0.0) - 1.0).abs() < 1e-6);
/// ```
#[inline]
pub fn tempered_to_ratio(semitones: f32) -> f32 {
    powf(SEMITONE_RATIO, semitones)
}

/// Root mean square of a block, zero for an empty block.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Resample a magnitude curve to `output.len()` points.
///
/// Shrinking keeps the maximum of each block of input values, so narrow
/// spectral peaks survive; growing interpolates linearly.
pub fn spectral_approx(input: &[f32], output: &mut [f32]) {
    let (n_in, n_out) = (input.len(), output.len());
    if n_out == 0 {
        return;
    }
    if n_in == 0 {
        output.fill(0.0);
        return;
    }
    if n_out < n_in {
        for (i, o) in output.iter_mut().enumerate() {
            let start = i * n_in / n_out;
            let end = ((i + 1) * n_in / n_out).max(start + 1);
            *o = input[start..end].iter().copied().fold(f32::MIN, f32::max);
        }
    } else if n_in == 1 {
        output.fill(input[0]);
    } else {
        let step = (n_in - 1) as f32 / (n_out - 1) as f32;
        for (i, o) in output.iter_mut().enumerate() {
            let pos = i as f32 * step;
            let left = (pos as usize).min(n_in - 1);
            let right = (left + 1).min(n_in - 1);
            let frac = pos - left as f32;
            *o = input[left] + frac * (input[right] - input[left]);
        }
    }
}

/// Session-local dB scale anchored at a magnitude threshold.
///
/// `mag_to_db(x) = 20 log10(x / threshold)` for `x` at or above the
/// threshold, and exactly zero below it. `db_to_mag` inverts it, mapping
/// anything under a hair above zero dB back to silence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeScale {
    threshold: f32,
    inv_threshold: f32,
}

impl Default for MagnitudeScale {
    fn default() -> Self {
        Self::new(MIN_THRESHOLD)
    }
}

impl MagnitudeScale {
    /// Create a scale with the given threshold, clamped to [`MIN_THRESHOLD`].
    pub fn new(threshold: f32) -> Self {
        let threshold = threshold.max(MIN_THRESHOLD);
        Self {
            threshold,
            inv_threshold: 1.0 / threshold,
        }
    }

    /// Create a scale from a threshold expressed in dBFS (e.g. -100.0).
    pub fn from_db(threshold_db: f32) -> Self {
        Self::new(powf(10.0, threshold_db / 20.0))
    }

    /// Current linear threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Change the threshold, clamped to [`MIN_THRESHOLD`].
    pub fn set_threshold(&mut self, threshold: f32) {
        *self = Self::new(threshold);
    }

    /// Linear magnitude to dB above the threshold.
    #[inline]
    pub fn mag_to_db(&self, mag: f32) -> f32 {
        if mag < self.threshold {
            0.0
        } else {
            20.0 * log10f(mag * self.inv_threshold)
        }
    }

    /// dB above the threshold back to linear magnitude.
    #[inline]
    pub fn db_to_mag(&self, db: f32) -> f32 {
        if db < MIN_THRESHOLD {
            0.0
        } else {
            self.threshold * powf(10.0, db / 20.0)
        }
    }

    /// In-place [`mag_to_db`](Self::mag_to_db) over a slice.
    pub fn mags_to_db(&self, values: &mut [f32]) {
        for v in values.iter_mut() {
            *v = self.mag_to_db(*v);
        }
    }

    /// In-place [`db_to_mag`](Self::db_to_mag) over a slice.
    pub fn dbs_to_mag(&self, values: &mut [f32]) {
        for v in values.iter_mut() {
            *v = self.db_to_mag(*v);
        }
    }
}

/// Xorshift noise generator producing values in `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    state: u32,
}

impl Default for NoiseSource {
    fn default() -> Self {
        Self::new(0x12345678)
    }
}

impl NoiseSource {
    /// Create a generator from a non-zero seed.
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x12345678 } else { seed },
        }
    }

    /// Next value in `[-1, 1]`.
    #[inline]
    pub fn next_bipolar(&mut self) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        ((x as i32 as f32) / (i32::MAX as f32)).clamp(-1.0, 1.0)
    }
}
