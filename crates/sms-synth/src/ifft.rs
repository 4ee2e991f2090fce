//! Deterministic synthesis by inverse transform.
//!
//! Every track contributes the main lobe of a Blackman-Harris 92 dB window
//! centred on its frequency to a spectrum of two hops. The inverse transform
//! yields the windowed sinusoids centred in the block; multiplying by
//! [`WindowType::IfftSynthesis`](sms_core::WindowType::IfftSynthesis) turns
//! the Blackman-Harris envelope into a triangle, which overlap-adds to one
//! at a hop of half the block.

use std::f32::consts::PI;

use libm::sinf;
use sms_analysis::SpectrumEngine;
use sms_core::{BH92, Error, MagnitudeScale, ModelFrame, Result};

/// Bins on each side of a track frequency that receive its lobe.
pub const LOBE_HALF_WIDTH: f32 = 4.0;

/// Spectrum of a centred periodic Blackman-Harris 92 dB window of `size`
/// points, `offset` bins away from its peak.
pub fn bh92_lobe(offset: f32, size: usize) -> f32 {
    let n = size as f32;
    let kernel = |y: f32| {
        if y.abs() < 1e-5 {
            n
        } else {
            sinf(PI * y) / sinf(PI * y / n)
        }
    };
    let mut value = BH92[0] * kernel(offset);
    for (k, &a) in BH92.iter().enumerate().skip(1) {
        let k = k as f32;
        value += 0.5 * a * (kernel(offset - k) + kernel(offset + k));
    }
    value
}

/// Add the lobe of a sinusoid of amplitude `amp` and phase `phase` at
/// fractional bin `bin` into a packed spectrum.
///
/// The phase refers to the centre of the block. Lobe bins that wrap below
/// DC are folded back as the negative-frequency image.
pub fn add_lobe(spectrum: &mut [f32], bin: f32, amp: f32, phase: f32) {
    let size = spectrum.len();
    let half = size / 2;
    if half < 2 || bin <= 0.0 || bin >= half as f32 {
        return;
    }
    let (sin, cos) = phase.sin_cos();

    let first = (bin - LOBE_HALF_WIDTH).ceil().max(0.0) as usize;
    let last = ((bin + LOBE_HALF_WIDTH).floor() as usize).min(half - 1);
    for m in first..=last {
        let w = 0.5 * amp * bh92_lobe(m as f32 - bin, size);
        if m == 0 {
            spectrum[0] += 2.0 * w * cos;
        } else {
            spectrum[2 * m] += w * cos;
            spectrum[2 * m + 1] += w * sin;
        }
    }

    // image of the negative frequency
    let mut m = 1;
    while (m as f32) + bin <= LOBE_HALF_WIDTH && m < half {
        let w = 0.5 * amp * bh92_lobe(m as f32 + bin, size);
        spectrum[2 * m] += w * cos;
        spectrum[2 * m + 1] -= w * sin;
        m += 1;
    }
}

/// Render the tracks of `frame` into `accumulator` by inverse transform.
///
/// `frame` holds the block-centre phases; `spectrum`, `block`, `window` and
/// `accumulator` are all one transform long. Returns the number of rendered
/// tracks.
pub fn synthesize_lobes(
    engine: &mut SpectrumEngine,
    frame: &ModelFrame,
    scale: &MagnitudeScale,
    sample_rate: f32,
    window: &[f32],
    spectrum: &mut [f32],
    accumulator: &mut [f32],
) -> Result<usize> {
    let size = spectrum.len();
    for (what, len) in [("synthesis window", window.len()), ("accumulator", accumulator.len())] {
        if len != size {
            return Err(Error::SizeMismatch {
                what,
                expected: size,
                actual: len,
            });
        }
    }

    spectrum.fill(0.0);
    let bins_per_hz = size as f32 / sample_rate;
    let limit = size as f32 / 2.0 - LOBE_HALF_WIDTH;
    let phases = frame.phase().unwrap_or(&[]);
    let mut rendered = 0;
    for (t, (&f, &a)) in frame.freq().iter().zip(frame.amp()).enumerate() {
        let bin = f * bins_per_hz;
        if f <= 0.0 || bin >= limit {
            continue;
        }
        let amp = scale.db_to_mag(a);
        if amp <= 0.0 {
            continue;
        }
        add_lobe(spectrum, bin, amp, phases.get(t).copied().unwrap_or(0.0));
        rendered += 1;
    }
    if rendered == 0 {
        return Ok(0);
    }

    engine.inverse_packed(spectrum)?;
    let half = size / 2;
    for (i, (acc, &w)) in accumulator.iter_mut().zip(window).enumerate() {
        *acc += spectrum[(i + half) % size] * w;
    }
    Ok(rendered)
}
