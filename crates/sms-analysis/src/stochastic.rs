//! Residual extraction and stochastic modeling.
//!
//! The residual of a frame is the source minus the deterministic
//! resynthesis over the two hops around the frame center. Its Hann-windowed
//! magnitude spectrum, divided by the root of the window energy, is reduced
//! to the frame's coefficient count; the mean of the reduced curve becomes
//! the gain (dB) and the curve itself is stored normalized to unit mean.

use crate::spectrum::SpectrumEngine;
use sms_core::{
    Error, MagnitudeScale, ModelFrame, Result, StochasticType, WindowType, next_power_of_two,
    scale_window, spectral_approx, zeroed,
};

/// Running energy comparison of residual and source.
///
/// The averages live in the session, so two analyses never share state.
#[derive(Debug, Clone, Default)]
pub struct ResidualEnergy {
    residual_mag: f32,
    original_mag: f32,
}

impl ResidualEnergy {
    /// Fresh averages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `original - synthesis` into `residual`.
    ///
    /// When the running residual level exceeds the running source level, the
    /// residual is scaled down to it. Returns the ratio of windowed residual
    /// to windowed source magnitude for this block, 0 for a silent residual.
    pub fn residual(
        &mut self,
        original: &[f32],
        synthesis: &[f32],
        window: &[f32],
        residual: &mut [f32],
    ) -> Result<f32> {
        let n = window.len();
        for (what, len) in [
            ("original", original.len()),
            ("synthesis", synthesis.len()),
            ("residual", residual.len()),
        ] {
            if len != n {
                return Err(Error::SizeMismatch {
                    what,
                    expected: n,
                    actual: len,
                });
            }
        }

        for ((r, &o), &s) in residual.iter_mut().zip(original).zip(synthesis) {
            *r = o - s;
        }
        let current_residual: f32 = residual.iter().zip(window).map(|(r, w)| (r * w).abs()).sum();
        if current_residual == 0.0 {
            return Ok(0.0);
        }
        let current_original: f32 = original.iter().zip(window).map(|(o, w)| (o * w).abs()).sum();

        self.original_mag = 0.5 * (current_original / n as f32 + self.original_mag);
        self.residual_mag = 0.5 * (current_residual / n as f32 + self.residual_mag);

        if self.residual_mag > self.original_mag {
            let scale = self.original_mag / self.residual_mag;
            for r in residual.iter_mut() {
                *r *= scale;
            }
        }

        Ok(if current_original > 0.0 {
            current_residual / current_original
        } else {
            0.0
        })
    }
}

/// Stochastic part of each analyzed frame.
pub struct StochasticAnalyzer {
    kind: StochasticType,
    hop: usize,
    transform_size: usize,
    energy_window: Vec<f32>,
    spectrum_window: Vec<f32>,
    inv_window_norm: f32,
    energy: ResidualEnergy,
    residual: Vec<f32>,
    mag: Vec<f32>,
    phase: Vec<f32>,
    scale: MagnitudeScale,
    ratio_sum: f64,
    frames: usize,
}

impl StochasticAnalyzer {
    /// Analyzer for residual blocks of two hops.
    pub fn new(kind: StochasticType, hop: usize, scale: MagnitudeScale) -> Result<Self> {
        if hop == 0 {
            return Err(Error::invalid_config("hop size must be positive"));
        }
        let size = 2 * hop;
        let transform_size = next_power_of_two(size);

        let mut energy_window: Vec<f32> = zeroed(size, "residual window")?;
        WindowType::Hamming.fill(&mut energy_window);
        scale_window(&mut energy_window);

        let mut spectrum_window: Vec<f32> = zeroed(size, "stochastic window")?;
        WindowType::Hann.fill(&mut spectrum_window);
        let window_energy: f32 = spectrum_window.iter().map(|w| w * w).sum();

        Ok(Self {
            kind,
            hop,
            transform_size,
            energy_window,
            spectrum_window,
            inv_window_norm: 1.0 / window_energy.sqrt(),
            energy: ResidualEnergy::new(),
            residual: zeroed(size, "residual")?,
            mag: zeroed(transform_size / 2, "stochastic magnitudes")?,
            phase: zeroed(transform_size / 2, "stochastic phases")?,
            scale,
            ratio_sum: 0.0,
            frames: 0,
        })
    }

    /// Samples per residual block.
    pub fn block_size(&self) -> usize {
        2 * self.hop
    }

    /// Residual of the most recent block.
    pub fn residual(&self) -> &[f32] {
        &self.residual
    }

    /// Mean residual-to-source ratio over all blocks, in percent.
    pub fn residual_percentage(&self) -> f32 {
        if self.frames == 0 {
            0.0
        } else {
            (100.0 * self.ratio_sum / self.frames as f64) as f32
        }
    }

    /// Compute the residual of one block and store its stochastic model.
    ///
    /// `original` and `synthesis` hold [`block_size`](Self::block_size)
    /// samples. Frames without a stochastic part only update the residual
    /// statistics.
    pub fn analyze(
        &mut self,
        engine: &mut SpectrumEngine,
        original: &[f32],
        synthesis: &[f32],
        frame: &mut ModelFrame,
    ) -> Result<()> {
        let ratio = self.energy.residual(
            original,
            synthesis,
            &self.energy_window,
            &mut self.residual,
        )?;
        self.ratio_sum += f64::from(ratio);
        self.frames += 1;

        if self.kind == StochasticType::None {
            return Ok(());
        }

        self.mag.fill(0.0);
        self.phase.fill(0.0);
        engine.quick_spectrum(
            &self.residual,
            &self.spectrum_window,
            self.transform_size,
            &mut self.mag,
            Some(&mut self.phase),
        )?;
        for m in &mut self.mag {
            *m *= self.inv_window_norm;
        }

        let fields = frame.fields_mut();
        spectral_approx(&self.mag, fields.coefficients);
        let n = fields.coefficients.len();
        let mean = if n == 0 {
            0.0
        } else {
            fields.coefficients.iter().sum::<f32>() / n as f32
        };

        let gain = self.scale.mag_to_db(mean);
        if gain > 0.0 {
            for c in fields.coefficients.iter_mut() {
                *c /= mean;
            }
        } else {
            fields.coefficients.fill(0.0);
        }
        if let Some(g) = fields.gain.first_mut() {
            *g = gain;
        }
        if self.kind == StochasticType::Ifft {
            let len = fields.residual_phase.len().min(self.phase.len());
            fields.residual_phase[..len].copy_from_slice(&self.phase[..len]);
        }
        Ok(())
    }
}
