//! Spectral peaks.

/// A local maximum of a magnitude spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpectralPeak {
    /// Interpolated frequency in Hz.
    pub freq: f32,
    /// Interpolated magnitude in dB.
    pub mag: f32,
    /// Phase in radians.
    pub phase: f32,
}
