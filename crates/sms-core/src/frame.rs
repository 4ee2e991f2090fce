//! Spectral model frames.
//!
//! A [`ModelFrame`] is one analyzed or synthesized instant stored as a single
//! contiguous block of `f32` values. Field offsets are fixed by a
//! [`FrameLayout`] when the frame is allocated, in the same order the model
//! file uses:
//!
//! | field | length |
//! |-------|--------|
//! | track frequencies (Hz) | `tracks` |
//! | track amplitudes (dB) | `tracks` |
//! | track phases (rad) | `tracks` if the format stores phase |
//! | stochastic coefficients | `coefficients` unless stochastic type is none |
//! | stochastic gain (dB) | 1 unless stochastic type is none |
//! | residual phases (rad) | `coefficients` for the exact residual type |
//! | envelope coefficients | `envelope_coefficients` |

use crate::error::{Result, zeroed};
use crate::header::StochasticType;
use std::ops::Range;

/// Field offsets of a [`ModelFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameLayout {
    tracks: usize,
    has_phase: bool,
    stochastic: StochasticType,
    coefficients: usize,
    envelope_coefficients: usize,
}

impl FrameLayout {
    /// Describe a frame with the given capacities.
    ///
    /// The coefficient count is ignored when `stochastic` is
    /// [`StochasticType::None`].
    pub fn new(
        tracks: usize,
        has_phase: bool,
        stochastic: StochasticType,
        coefficients: usize,
        envelope_coefficients: usize,
    ) -> Self {
        let coefficients = if stochastic == StochasticType::None {
            0
        } else {
            coefficients
        };
        Self {
            tracks,
            has_phase,
            stochastic,
            coefficients,
            envelope_coefficients,
        }
    }

    /// Number of sinusoidal tracks.
    pub fn tracks(&self) -> usize {
        self.tracks
    }

    /// Whether track phases are stored.
    pub fn has_phase(&self) -> bool {
        self.has_phase
    }

    /// Stochastic representation.
    pub fn stochastic(&self) -> StochasticType {
        self.stochastic
    }

    /// Number of stochastic coefficients.
    pub fn coefficients(&self) -> usize {
        self.coefficients
    }

    /// Number of envelope coefficients.
    pub fn envelope_coefficients(&self) -> usize {
        self.envelope_coefficients
    }

    /// Total number of `f32` values in a frame.
    pub fn len(&self) -> usize {
        self.envelope_range().end
    }

    /// Whether the frame holds no values at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn freq_range(&self) -> Range<usize> {
        0..self.tracks
    }

    fn amp_range(&self) -> Range<usize> {
        self.tracks..2 * self.tracks
    }

    fn phase_range(&self) -> Range<usize> {
        let start = 2 * self.tracks;
        start..start + if self.has_phase { self.tracks } else { 0 }
    }

    fn coeff_range(&self) -> Range<usize> {
        let start = self.phase_range().end;
        start..start + self.coefficients
    }

    fn gain_range(&self) -> Range<usize> {
        let start = self.coeff_range().end;
        let len = usize::from(self.stochastic != StochasticType::None);
        start..start + len
    }

    fn residual_phase_range(&self) -> Range<usize> {
        let start = self.gain_range().end;
        let len = if self.stochastic == StochasticType::Ifft {
            self.coefficients
        } else {
            0
        };
        start..start + len
    }

    fn envelope_range(&self) -> Range<usize> {
        let start = self.residual_phase_range().end;
        start..start + self.envelope_coefficients
    }
}

/// Mutable views of every field of a frame at once.
#[derive(Debug)]
pub struct FrameFieldsMut<'a> {
    /// Track frequencies in Hz.
    pub freq: &'a mut [f32],
    /// Track amplitudes in dB.
    pub amp: &'a mut [f32],
    /// Track phases in radians (empty without phase).
    pub phase: &'a mut [f32],
    /// Stochastic coefficients.
    pub coefficients: &'a mut [f32],
    /// Stochastic gain in dB (empty without a stochastic part).
    pub gain: &'a mut [f32],
    /// Residual phase spectrum.
    pub residual_phase: &'a mut [f32],
    /// Envelope coefficients.
    pub envelope: &'a mut [f32],
}

/// One instant of a spectral model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFrame {
    layout: FrameLayout,
    data: Vec<f32>,
}

impl ModelFrame {
    /// Allocate a zeroed frame.
    pub fn new(layout: FrameLayout) -> Result<Self> {
        Ok(Self {
            layout,
            data: zeroed(layout.len(), "model frame")?,
        })
    }

    /// Field layout of this frame.
    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// The contiguous data block.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// The contiguous data block, mutable.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Track frequencies in Hz; zero marks an inactive track.
    pub fn freq(&self) -> &[f32] {
        &self.data[self.layout.freq_range()]
    }

    /// Mutable track frequencies.
    pub fn freq_mut(&mut self) -> &mut [f32] {
        let r = self.layout.freq_range();
        &mut self.data[r]
    }

    /// Track amplitudes in dB.
    pub fn amp(&self) -> &[f32] {
        &self.data[self.layout.amp_range()]
    }

    /// Mutable track amplitudes.
    pub fn amp_mut(&mut self) -> &mut [f32] {
        let r = self.layout.amp_range();
        &mut self.data[r]
    }

    /// Track phases, if the format stores them.
    pub fn phase(&self) -> Option<&[f32]> {
        self.layout
            .has_phase
            .then(|| &self.data[self.layout.phase_range()])
    }

    /// Stochastic coefficients.
    pub fn coefficients(&self) -> &[f32] {
        &self.data[self.layout.coeff_range()]
    }

    /// Stochastic gain in dB, zero without a stochastic part.
    pub fn gain(&self) -> f32 {
        self.data
            .get(self.layout.gain_range())
            .and_then(|g| g.first().copied())
            .unwrap_or(0.0)
    }

    /// Set the stochastic gain; ignored without a stochastic part.
    pub fn set_gain(&mut self, gain_db: f32) {
        let r = self.layout.gain_range();
        if let Some(g) = self.data[r].first_mut() {
            *g = gain_db;
        }
    }

    /// Residual phase spectrum (empty unless the exact residual is stored).
    pub fn residual_phase(&self) -> &[f32] {
        &self.data[self.layout.residual_phase_range()]
    }

    /// Spectral envelope coefficients.
    pub fn envelope(&self) -> &[f32] {
        &self.data[self.layout.envelope_range()]
    }

    /// Borrow all fields mutably at once.
    pub fn fields_mut(&mut self) -> FrameFieldsMut<'_> {
        let l = self.layout;
        let (freq, rest) = self.data.split_at_mut(l.tracks);
        let (amp, rest) = rest.split_at_mut(l.tracks);
        let (phase, rest) = rest.split_at_mut(l.phase_range().len());
        let (coefficients, rest) = rest.split_at_mut(l.coefficients);
        let (gain, rest) = rest.split_at_mut(l.gain_range().len());
        let (residual_phase, envelope) = rest.split_at_mut(l.residual_phase_range().len());
        FrameFieldsMut {
            freq,
            amp,
            phase,
            coefficients,
            gain,
            residual_phase,
            envelope,
        }
    }

    /// Number of tracks with a non-zero frequency.
    pub fn active_tracks(&self) -> usize {
        self.freq().iter().filter(|&&f| f > 0.0).count()
    }

    /// Zero every value.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Copy `src` into this frame.
    ///
    /// Frames with the same layout are copied as one block; otherwise each
    /// field copies as many values as both frames hold.
    pub fn copy_from(&mut self, src: &ModelFrame) {
        if self.layout == src.layout {
            self.data.copy_from_slice(&src.data);
            return;
        }
        let (sl, dl) = (src.layout, self.layout);
        let pairs = [
            (sl.freq_range(), dl.freq_range()),
            (sl.amp_range(), dl.amp_range()),
            (sl.phase_range(), dl.phase_range()),
            (sl.coeff_range(), dl.coeff_range()),
            (sl.gain_range(), dl.gain_range()),
            (sl.residual_phase_range(), dl.residual_phase_range()),
            (sl.envelope_range(), dl.envelope_range()),
        ];
        for (s, d) in pairs {
            let n = s.len().min(d.len());
            self.data[d.start..d.start + n].copy_from_slice(&src.data[s.start..s.start + n]);
        }
    }

    /// Fill this frame with `left + factor * (right - left)`.
    ///
    /// All three frames must share one layout. A track that is silent on one
    /// side (frequency zero) keeps the other side's frequency so it fades in
    /// or out at pitch instead of gliding from 0 Hz. Phases are wrapped
    /// angles and are taken from `left` unchanged.
    pub fn interpolate(&mut self, left: &ModelFrame, right: &ModelFrame, factor: f32) {
        debug_assert_eq!(left.layout, right.layout);
        debug_assert_eq!(self.layout, left.layout);
        let tracks = self.layout.tracks;
        let lerp = |a: f32, b: f32| a + factor * (b - a);

        for i in 0..tracks {
            let mut f1 = left.data[i];
            let mut f2 = right.data[i];
            if f1 <= 0.0 {
                f1 = f2;
            }
            if f2 <= 0.0 {
                f2 = f1;
            }
            self.data[i] = lerp(f1, f2);
        }
        for i in tracks..self.data.len() {
            self.data[i] = lerp(left.data[i], right.data[i]);
        }
        for range in [self.layout.phase_range(), self.layout.residual_phase_range()] {
            self.data[range.clone()].copy_from_slice(&left.data[range]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> FrameLayout {
        FrameLayout::new(4, true, StochasticType::Approx, 8, 2)
    }

    #[test]
    fn test_layout_offsets() {
        let l = layout();
        assert_eq!(l.len(), 4 * 3 + 8 + 1 + 2);
        let exact = FrameLayout::new(4, false, StochasticType::Ifft, 8, 0);
        assert_eq!(exact.len(), 8 + 8 + 1 + 8);
        let none = FrameLayout::new(4, false, StochasticType::None, 8, 0);
        assert_eq!(none.len(), 8);
        assert_eq!(none.coefficients(), 0);
    }

    #[test]
    fn test_fields_are_disjoint() {
        let mut frame = ModelFrame::new(layout()).unwrap();
        {
            let f = frame.fields_mut();
            f.freq.fill(1.0);
            f.amp.fill(2.0);
            f.phase.fill(3.0);
            f.coefficients.fill(4.0);
            f.gain.fill(5.0);
            f.envelope.fill(6.0);
        }
        assert!(frame.freq().iter().all(|&x| x == 1.0));
        assert!(frame.amp().iter().all(|&x| x == 2.0));
        assert!(frame.phase().unwrap().iter().all(|&x| x == 3.0));
        assert!(frame.coefficients().iter().all(|&x| x == 4.0));
        assert_eq!(frame.gain(), 5.0);
        assert!(frame.envelope().iter().all(|&x| x == 6.0));
        assert!(frame.residual_phase().is_empty());
    }

    #[test]
    fn test_interpolate_keeps_pitch_of_silent_side() {
        let l = FrameLayout::new(2, false, StochasticType::Approx, 2, 0);
        let mut left = ModelFrame::new(l).unwrap();
        let mut right = ModelFrame::new(l).unwrap();
        left.freq_mut().copy_from_slice(&[440.0, 0.0]);
        left.amp_mut().copy_from_slice(&[60.0, 0.0]);
        right.freq_mut().copy_from_slice(&[460.0, 880.0]);
        right.amp_mut().copy_from_slice(&[40.0, 50.0]);
        right.set_gain(20.0);

        let mut out = ModelFrame::new(l).unwrap();
        out.interpolate(&left, &right, 0.5);
        assert_eq!(out.freq(), &[450.0, 880.0]);
        assert_eq!(out.amp(), &[50.0, 25.0]);
        assert_eq!(out.gain(), 10.0);
    }

    #[test]
    fn test_interpolate_takes_left_phases() {
        let l = FrameLayout::new(1, true, StochasticType::Ifft, 4, 0);
        let mut left = ModelFrame::new(l).unwrap();
        let mut right = ModelFrame::new(l).unwrap();
        left.freq_mut()[0] = 440.0;
        right.freq_mut()[0] = 440.0;
        // both near pi, a blend would land near zero
        left.fields_mut().phase[0] = 3.1;
        right.fields_mut().phase[0] = -3.1;
        left.fields_mut().residual_phase.fill(3.0);
        right.fields_mut().residual_phase.fill(-3.0);
        left.amp_mut()[0] = 40.0;
        right.amp_mut()[0] = 60.0;

        let mut out = ModelFrame::new(l).unwrap();
        out.interpolate(&left, &right, 0.5);
        assert_eq!(out.phase().unwrap(), &[3.1]);
        assert!(out.residual_phase().iter().all(|&p| p == 3.0));
        assert_eq!(out.amp(), &[50.0]);
    }

    #[test]
    fn test_copy_between_layouts() {
        let big = FrameLayout::new(4, true, StochasticType::Approx, 8, 0);
        let small = FrameLayout::new(2, false, StochasticType::Approx, 4, 0);
        let mut src = ModelFrame::new(big).unwrap();
        src.freq_mut().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        src.set_gain(9.0);
        let mut dst = ModelFrame::new(small).unwrap();
        dst.copy_from(&src);
        assert_eq!(dst.freq(), &[1.0, 2.0]);
        assert_eq!(dst.gain(), 9.0);
        assert_eq!(dst.phase(), None);
    }

    #[test]
    fn test_clear() {
        let mut frame = ModelFrame::new(layout()).unwrap();
        frame.as_mut_slice().fill(7.0);
        frame.clear();
        assert!(frame.as_slice().iter().all(|&x| x == 0.0));
        assert_eq!(frame.active_tracks(), 0);
    }
}
