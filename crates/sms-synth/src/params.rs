//! Scratch state of a synthesis session.

use sms_core::{
    Error, FrameLayout, ModelFrame, Result, WindowType, next_power_of_two, zeroed,
};

/// Buffers and frame history sized for one synthesis hop.
///
/// Every hop-dependent buffer is rebuilt by [`change_hop`](Self::change_hop);
/// the frame history is kept, so a hop change does not break phase
/// continuity.
#[derive(Debug, Clone)]
pub struct SynthesisParams {
    sample_rate: u32,
    hop: usize,
    /// Last synthesized frame, frequencies transposed and phases advanced.
    pub(crate) previous: ModelFrame,
    /// Frame being synthesized.
    pub(crate) current: ModelFrame,
    /// Inverse-transform synthesis window, two hops long.
    pub(crate) deterministic_window: Vec<f32>,
    /// Hann window for the approximated noise, two hops long.
    pub(crate) stochastic_window: Vec<f32>,
    /// Restores unit power after Hann-windowed overlap-add.
    pub(crate) stochastic_ola_gain: f32,
    /// Root energy of the Hann window.
    pub(crate) stochastic_window_norm: f32,
    /// Overlap-add accumulator, two hops long.
    pub(crate) accumulator: Vec<f32>,
    /// Packed spectrum, two hops long.
    pub(crate) spectrum: Vec<f32>,
    /// One inverse-transformed block, two hops long.
    pub(crate) block: Vec<f32>,
    /// Per-bin magnitudes, one hop long.
    pub(crate) mag: Vec<f32>,
    /// Per-bin phases, one hop long.
    pub(crate) phase: Vec<f32>,
}

impl SynthesisParams {
    /// State for frames of `layout` rendered at `sample_rate`.
    ///
    /// `hop` is rounded up to a power of two.
    pub fn new(layout: FrameLayout, sample_rate: u32, hop: usize) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::invalid_config("synthesis sample rate must be positive"));
        }
        // phases are always tracked, whether or not the model stores them
        let history = FrameLayout::new(
            layout.tracks(),
            true,
            layout.stochastic(),
            layout.coefficients(),
            layout.envelope_coefficients(),
        );
        let mut params = Self {
            sample_rate,
            hop: 0,
            previous: ModelFrame::new(history)?,
            current: ModelFrame::new(history)?,
            deterministic_window: Vec::new(),
            stochastic_window: Vec::new(),
            stochastic_ola_gain: 1.0,
            stochastic_window_norm: 1.0,
            accumulator: Vec::new(),
            spectrum: Vec::new(),
            block: Vec::new(),
            mag: Vec::new(),
            phase: Vec::new(),
        };
        params.change_hop(hop)?;
        Ok(params)
    }

    /// Output samples per frame.
    pub fn hop_size(&self) -> usize {
        self.hop
    }

    /// Inverse transform size, two hops.
    pub fn transform_size(&self) -> usize {
        2 * self.hop
    }

    /// Output rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Last synthesized frame.
    pub fn previous(&self) -> &ModelFrame {
        &self.previous
    }

    /// Resize every hop-dependent buffer for a new hop.
    ///
    /// Hops that are not a power of two are rounded up with a warning. The
    /// overlap-add tail of the old hop is discarded.
    pub fn change_hop(&mut self, hop: usize) -> Result<()> {
        if hop < 2 {
            return Err(Error::invalid_config(format!(
                "synthesis hop {hop} is too small"
            )));
        }
        let rounded = next_power_of_two(hop);
        if rounded != hop {
            tracing::warn!(requested = hop, used = rounded, "synthesis hop rounded to a power of two");
        }
        let size = 2 * rounded;

        let mut deterministic_window: Vec<f32> = zeroed(size, "deterministic synthesis window")?;
        WindowType::IfftSynthesis.fill(&mut deterministic_window);
        let mut stochastic_window: Vec<f32> = zeroed(size, "stochastic synthesis window")?;
        WindowType::Hann.fill(&mut stochastic_window);

        let energy: f32 = stochastic_window.iter().map(|w| w * w).sum();
        let overlap_power = (0..rounded)
            .map(|n| stochastic_window[n].powi(2) + stochastic_window[n + rounded].powi(2))
            .sum::<f32>()
            / rounded as f32;

        self.accumulator = zeroed(size, "synthesis accumulator")?;
        self.spectrum = zeroed(size, "synthesis spectrum")?;
        self.block = zeroed(size, "synthesis block")?;
        self.mag = zeroed(rounded, "synthesis magnitudes")?;
        self.phase = zeroed(rounded, "synthesis phases")?;
        self.stochastic_ola_gain = 1.0 / overlap_power.sqrt();
        self.stochastic_window_norm = energy.sqrt();
        self.deterministic_window = deterministic_window;
        self.stochastic_window = stochastic_window;
        self.hop = rounded;
        tracing::debug!(hop = rounded, "synthesis buffers sized");
        Ok(())
    }

    /// Forget frame history and pending overlap-add samples.
    pub fn reset(&mut self) {
        self.previous.clear();
        self.current.clear();
        self.accumulator.fill(0.0);
    }

    /// Move the first hop of the accumulator into `out` and shift the rest.
    pub(crate) fn emit(&mut self, out: &mut [f32]) {
        let hop = self.hop;
        out.copy_from_slice(&self.accumulator[..hop]);
        self.accumulator.copy_within(hop.., 0);
        self.accumulator[hop..].fill(0.0);
    }
}
