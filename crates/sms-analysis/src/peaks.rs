//! Spectral peak detection.

use sms_core::{Result, SpectralPeak};
use std::f32::consts::PI;

/// Finds sinusoidal peaks in a dB magnitude spectrum.
pub trait PeakDetector {
    /// Replace `peaks` with the peaks of one spectrum.
    ///
    /// `mag_db` and `phase` hold `transform_size / 2` bins. Implementations
    /// must not grow `peaks` past its capacity.
    fn detect(
        &mut self,
        mag_db: &[f32],
        phase: &[f32],
        sample_rate: f32,
        transform_size: usize,
        peaks: &mut Vec<SpectralPeak>,
    ) -> Result<()>;
}

/// Local-maximum peak picking with parabolic interpolation.
///
/// A bin is a peak when it is louder than its left neighbour, at least as
/// loud as its right neighbour and above `min_magnitude`. Frequency and
/// magnitude come from the parabola through the three bins; phase is
/// interpolated linearly towards the neighbour on the side of the vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMaximumDetector {
    /// Lowest peak frequency in Hz.
    pub lowest_frequency: f32,
    /// Highest peak frequency in Hz.
    pub highest_frequency: f32,
    /// Minimum peak magnitude in dB.
    pub min_magnitude: f32,
    /// Maximum number of peaks, lowest frequencies first.
    pub max_peaks: usize,
}

impl LocalMaximumDetector {
    /// Detector for the given frequency range.
    pub fn new(lowest_frequency: f32, highest_frequency: f32, min_magnitude: f32, max_peaks: usize) -> Self {
        Self {
            lowest_frequency,
            highest_frequency,
            min_magnitude,
            max_peaks,
        }
    }
}

/// Wrap a phase difference into `[-π, π)`.
#[inline]
fn wrap_phase(x: f32) -> f32 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}

impl PeakDetector for LocalMaximumDetector {
    fn detect(
        &mut self,
        mag_db: &[f32],
        phase: &[f32],
        sample_rate: f32,
        transform_size: usize,
        peaks: &mut Vec<SpectralPeak>,
    ) -> Result<()> {
        peaks.clear();
        let bins = mag_db.len().min(phase.len()).min(transform_size / 2);
        if bins < 3 || transform_size == 0 {
            return Ok(());
        }
        let bin_hz = sample_rate / transform_size as f32;
        let limit = self.max_peaks.min(peaks.capacity());

        let first = ((self.lowest_frequency / bin_hz) as usize).max(1);
        let last = ((self.highest_frequency / bin_hz).ceil() as usize).min(bins - 2);

        for k in first..=last {
            if peaks.len() >= limit {
                break;
            }
            let (l, c, r) = (mag_db[k - 1], mag_db[k], mag_db[k + 1]);
            if c <= self.min_magnitude || c <= l || c < r {
                continue;
            }

            let denom = l - 2.0 * c + r;
            let p = if denom == 0.0 { 0.0 } else { 0.5 * (l - r) / denom };
            let freq = (k as f32 + p) * bin_hz;
            if freq < self.lowest_frequency || freq > self.highest_frequency {
                continue;
            }
            let mag = c - 0.25 * (l - r) * p;

            let neighbour = if p >= 0.0 { k + 1 } else { k - 1 };
            let phase = phase[k] + p.abs() * wrap_phase(phase[neighbour] - phase[k]);

            peaks.push(SpectralPeak {
                freq,
                mag,
                phase: wrap_phase(phase),
            });
        }
        Ok(())
    }
}
