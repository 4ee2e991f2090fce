//! Stochastic resynthesis.
//!
//! A frame's noise curve is its coefficients stretched to one hop of bins
//! and scaled by the frame gain. The approximated model draws random phases
//! and shapes each block with a Hann window; the exact model reuses the
//! stored residual phases, and since the stored magnitudes already describe
//! a Hann-windowed block, the inverse transform is overlap-added as is.

use std::f32::consts::PI;

use sms_analysis::SpectrumEngine;
use sms_core::{MagnitudeScale, ModelFrame, NoiseSource, Result, StochasticType, spectral_approx};

use crate::params::SynthesisParams;

/// Renders the stochastic part of frames into the synthesis accumulator.
#[derive(Debug, Clone, Default)]
pub struct StochasticSynthesis {
    noise: NoiseSource,
}

impl StochasticSynthesis {
    /// Synthesis drawing random phases from `noise`.
    pub fn new(noise: NoiseSource) -> Self {
        Self { noise }
    }

    /// Add the noise of `frame` into the accumulator of `params`.
    ///
    /// `gain` multiplies the frame gain linearly. Returns whether anything
    /// was rendered.
    pub fn render(
        &mut self,
        engine: &mut SpectrumEngine,
        params: &mut SynthesisParams,
        frame: &ModelFrame,
        scale: &MagnitudeScale,
        gain: f32,
    ) -> Result<bool> {
        let kind = frame.layout().stochastic();
        let coefficients = frame.coefficients();
        if kind == StochasticType::None || coefficients.is_empty() || gain <= 0.0 {
            return Ok(false);
        }
        let level = scale.db_to_mag(frame.gain()) * gain;
        if level <= 0.0 {
            return Ok(false);
        }

        let size = params.transform_size();
        let SynthesisParams {
            mag,
            phase,
            block,
            accumulator,
            stochastic_window,
            stochastic_ola_gain,
            stochastic_window_norm,
            ..
        } = params;

        spectral_approx(coefficients, mag);
        match kind {
            StochasticType::Approx => {
                let bin_gain = level * (size as f32).sqrt();
                for (m, p) in mag.iter_mut().zip(phase.iter_mut()) {
                    *m *= bin_gain;
                    *p = PI * self.noise.next_bipolar();
                }
            }
            _ => {
                let bin_gain = level * *stochastic_window_norm;
                let stored = frame.residual_phase();
                let bins = phase.len();
                for (i, (m, p)) in mag.iter_mut().zip(phase.iter_mut()).enumerate() {
                    *m *= bin_gain;
                    *p = if stored.is_empty() {
                        0.0
                    } else {
                        stored[(i * stored.len() / bins).min(stored.len() - 1)]
                    };
                }
            }
        }
        // no DC or Nyquist
        mag[0] = 0.0;

        block.fill(0.0);
        engine.inv_quick_spectrum(mag, phase, size, block)?;
        if kind == StochasticType::Approx {
            let g = *stochastic_ola_gain;
            for ((acc, &b), &w) in accumulator.iter_mut().zip(block.iter()).zip(stochastic_window.iter()) {
                *acc += b * w * g;
            }
        } else {
            for (acc, &b) in accumulator.iter_mut().zip(block.iter()) {
                *acc += b;
            }
        }
        Ok(true)
    }
}
