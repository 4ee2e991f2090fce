//! Fundamental frequency estimation from spectral peaks.

use sms_core::SpectralPeak;

/// Estimates the fundamental of one frame.
pub trait FundamentalEstimator {
    /// Fundamental in Hz, or 0 when the frame has none.
    ///
    /// `previous` is the estimate of the preceding frame (0 if unknown).
    fn estimate(&mut self, peaks: &[SpectralPeak], previous: f32) -> f32;
}

/// Takes the lowest strong peak in the fundamental range as the fundamental.
///
/// A candidate must lie within `[lowest, highest]`, be at least
/// `min_reference_magnitude` dB and be no more than `max_magnitude_diff` dB
/// below the strongest peak of the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePeakEstimator {
    /// Lowest fundamental in Hz.
    pub lowest: f32,
    /// Highest fundamental in Hz.
    pub highest: f32,
    /// Largest dB distance from the strongest peak.
    pub max_magnitude_diff: f32,
    /// Minimum reference peak magnitude in dB.
    pub min_reference_magnitude: f32,
}

impl FundamentalEstimator for ReferencePeakEstimator {
    fn estimate(&mut self, peaks: &[SpectralPeak], _previous: f32) -> f32 {
        let Some(max_mag) = peaks.iter().map(|p| p.mag).reduce(f32::max) else {
            return 0.0;
        };
        let floor = self
            .min_reference_magnitude
            .max(max_mag - self.max_magnitude_diff);

        peaks
            .iter()
            .filter(|p| p.freq >= self.lowest && p.freq <= self.highest && p.mag >= floor)
            .map(|p| p.freq)
            .reduce(f32::min)
            .unwrap_or(0.0)
    }
}
