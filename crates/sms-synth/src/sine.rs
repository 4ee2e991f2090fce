//! Track phase bookkeeping and the oscillator bank.
//!
//! Both deterministic methods share one phase model: a track's frequency
//! moves linearly from the previous frame to the current one, so its phase
//! advances by `π (f_prev + f_cur) hop / sr` per frame. A track that is born
//! in the current frame takes the phase stored in the frame (zero when the
//! model has none) and is rendered as if it had been running at its new
//! frequency since the previous frame.

use std::f64::consts::{PI, TAU};

use sms_core::{MagnitudeScale, ModelFrame, SineTable};

/// Phase advance over `hop` samples of a frequency ramp from `f0` to `f1`.
pub fn phase_advance(f0: f32, f1: f32, sample_rate: f32, hop: usize) -> f64 {
    PI * (f64::from(f0) + f64::from(f1)) * hop as f64 / f64::from(sample_rate)
}

fn wrap(phase: f64) -> f64 {
    (phase + PI).rem_euclid(TAU) - PI
}

/// Write the end-of-hop phase of every track of `current`.
///
/// Continuing tracks integrate their frequency ramp from `previous`; births
/// keep the phase `current` already holds; silent tracks get phase 0.
pub fn advance_phases(
    previous: &ModelFrame,
    current: &mut ModelFrame,
    sample_rate: f32,
    hop: usize,
) {
    let prev_freq = previous.freq();
    let prev_phase = previous.phase().unwrap_or(&[]);
    let fields = current.fields_mut();
    for (t, (&f, phase)) in fields.freq.iter().zip(fields.phase.iter_mut()).enumerate() {
        if f <= 0.0 {
            *phase = 0.0;
            continue;
        }
        let f_prev = prev_freq.get(t).copied().unwrap_or(0.0);
        if f_prev > 0.0 {
            let start = f64::from(prev_phase.get(t).copied().unwrap_or(0.0));
            *phase = wrap(start + phase_advance(f_prev, f, sample_rate, hop)) as f32;
        }
    }
}

/// Table-lookup oscillators ramped linearly between frames.
///
/// Each hop renders the span from the previous frame to the current one:
/// frequency and amplitude move in straight lines, tracks that start fade
/// in from silence at their new frequency and tracks that stop fade out at
/// their old one.
///
/// # Example
///
/// ```rust
/// use sms_core::{FrameLayout, MagnitudeScale, ModelFrame, StochasticType};
/// use sms_synth::{OscillatorBank, advance_phases};
///
/// let layout = FrameLayout::new(1, true, StochasticType::None, 0, 0);
/// let previous = ModelFrame::new(layout).unwrap();
/// let mut current = ModelFrame::new(layout).unwrap();
/// let scale = MagnitudeScale::default();
/// current.freq_mut()[0] = 1000.0;
/// current.amp_mut()[0] = scale.mag_to_db(0.5);
///
/// advance_phases(&previous, &mut current, 8000.0, 64);
/// let mut out = vec![0.0; 64];
/// OscillatorBank::default().render(&previous, &current, &scale, 8000.0, &mut out);
/// assert!(out.iter().all(|s| s.abs() <= 0.5 + 1e-3));
/// ```
#[derive(Debug, Clone, Default)]
pub struct OscillatorBank {
    table: SineTable,
}

impl OscillatorBank {
    /// Oscillator bank reading from `table`.
    pub fn with_table(table: SineTable) -> Self {
        Self { table }
    }

    /// Add the tracks' hop from `previous` to `current` into `out`.
    ///
    /// `current` must hold phases from [`advance_phases`]; the hop length is
    /// `out.len()`. Returns the number of rendered tracks.
    pub fn render(
        &self,
        previous: &ModelFrame,
        current: &ModelFrame,
        scale: &MagnitudeScale,
        sample_rate: f32,
        out: &mut [f32],
    ) -> usize {
        let hop = out.len();
        if hop == 0 {
            return 0;
        }
        let nyquist = 0.5 * sample_rate;
        let cur_phase = current.phase().unwrap_or(&[]);
        let prev_phase = previous.phase().unwrap_or(&[]);
        let step = TAU / f64::from(sample_rate);
        let mut rendered = 0;

        for t in 0..current.freq().len() {
            let f_cur = current.freq()[t];
            let f_prev = previous.freq().get(t).copied().unwrap_or(0.0);
            if f_cur <= 0.0 && f_prev <= 0.0 {
                continue;
            }
            let audible = |f: f32| f > 0.0 && f < nyquist;
            let a0 = if audible(f_prev) {
                scale.db_to_mag(previous.amp()[t])
            } else {
                0.0
            };
            let a1 = if audible(f_cur) {
                scale.db_to_mag(current.amp()[t])
            } else {
                0.0
            };
            if a0 == 0.0 && a1 == 0.0 {
                continue;
            }
            let f0 = if f_prev > 0.0 { f_prev } else { f_cur };
            let f1 = if f_cur > 0.0 { f_cur } else { f_prev };

            let start = if f_prev > 0.0 {
                f64::from(prev_phase.get(t).copied().unwrap_or(0.0))
            } else {
                f64::from(cur_phase.get(t).copied().unwrap_or(0.0))
                    - phase_advance(f1, f1, sample_rate, hop)
            };

            let slope = f64::from(f1 - f0) / (2.0 * hop as f64);
            let amp_step = (a1 - a0) / hop as f32;
            for (i, s) in out.iter_mut().enumerate() {
                let n = (i + 1) as f64;
                let theta = start + step * (f64::from(f0) * n + slope * n * n);
                let a = a0 + amp_step * (i + 1) as f32;
                *s += a * self.table.cos(theta);
            }
            rendered += 1;
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sms_core::{FrameLayout, StochasticType};

    const SR: f32 = 8000.0;

    fn frames() -> (ModelFrame, ModelFrame) {
        let layout = FrameLayout::new(2, true, StochasticType::None, 0, 0);
        (
            ModelFrame::new(layout).unwrap(),
            ModelFrame::new(layout).unwrap(),
        )
    }

    #[test]
    fn test_phase_advance() {
        // 1000 Hz over 8 samples at 8 kHz is exactly one cycle
        assert!((phase_advance(1000.0, 1000.0, SR, 8) - TAU).abs() < 1e-9);
        assert!((phase_advance(0.0, 2000.0, SR, 8) - TAU).abs() < 1e-9);
    }

    #[test]
    fn test_advance_phases() {
        let (mut prev, mut cur) = frames();
        prev.freq_mut()[0] = 500.0;
        prev.fields_mut().phase[0] = 0.25;
        cur.freq_mut()[0] = 500.0;
        cur.freq_mut()[1] = 700.0;
        cur.fields_mut().phase[1] = 1.5;
        advance_phases(&prev, &mut cur, SR, 4);
        let phase = cur.phase().unwrap();
        // a quarter cycle later
        assert!((phase[0] - (0.25 + std::f32::consts::FRAC_PI_2)).abs() < 1e-5);
        // births keep their stored phase
        assert_eq!(phase[1], 1.5);
    }

    #[test]
    fn test_silent_tracks_reset_phase() {
        let (prev, mut cur) = frames();
        cur.fields_mut().phase[0] = 2.0;
        advance_phases(&prev, &mut cur, SR, 4);
        assert_eq!(cur.phase().unwrap()[0], 0.0);
    }

    #[test]
    fn test_steady_track_is_continuous_sinusoid() {
        let scale = MagnitudeScale::default();
        let bank = OscillatorBank::default();
        let (mut prev, mut cur) = frames();
        let hop = 64;
        let f = 440.0;
        let amp = scale.mag_to_db(0.5);
        prev.freq_mut()[0] = f;
        prev.amp_mut()[0] = amp;
        let mut out = vec![0.0; 4 * hop];

        for block in out.chunks_mut(hop) {
            cur.copy_from(&prev);
            advance_phases(&prev, &mut cur, SR, hop);
            bank.render(&prev, &cur, &scale, SR, block);
            prev.copy_from(&cur);
        }

        for (i, &s) in out.iter().enumerate() {
            let expected = 0.5 * (TAU * f64::from(f) * (i + 1) as f64 / f64::from(SR)).cos();
            assert!((f64::from(s) - expected).abs() < 5e-3, "sample {i}: {s} vs {expected}");
        }
    }

    #[test]
    fn test_birth_fades_in() {
        let scale = MagnitudeScale::default();
        let (prev, mut cur) = frames();
        cur.freq_mut()[0] = 1000.0;
        cur.amp_mut()[0] = scale.mag_to_db(1.0);
        advance_phases(&prev, &mut cur, SR, 8);
        let mut out = vec![0.0; 8];
        let n = OscillatorBank::default().render(&prev, &cur, &scale, SR, &mut out);
        assert_eq!(n, 1);
        // ends on the stored phase 0 at full amplitude
        assert!((out[7] - 1.0).abs() < 1e-3, "{out:?}");
        assert!(out[0].abs() < 0.2);
    }

    #[test]
    fn test_death_fades_out() {
        let scale = MagnitudeScale::default();
        let (mut prev, mut cur) = frames();
        prev.freq_mut()[0] = 1000.0;
        prev.amp_mut()[0] = scale.mag_to_db(1.0);
        advance_phases(&prev, &mut cur, SR, 8);
        let mut out = vec![0.0; 8];
        OscillatorBank::default().render(&prev, &cur, &scale, SR, &mut out);
        assert!(out[7].abs() < 1e-6);
        assert!(out[0].abs() > 0.5);
    }

    #[test]
    fn test_tracks_above_nyquist_are_skipped() {
        let scale = MagnitudeScale::default();
        let (prev, mut cur) = frames();
        cur.freq_mut()[0] = 5000.0;
        cur.amp_mut()[0] = scale.mag_to_db(1.0);
        let mut out = vec![0.0; 8];
        assert_eq!(OscillatorBank::default().render(&prev, &cur, &scale, SR, &mut out), 0);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
