//! Frame-by-frame resynthesis.

use sms_analysis::{SpectrumEngine, TransformStrategy};
use sms_core::{DeEmphasis, Error, MagnitudeScale, ModelFrame, ModelHeader, Result};

use crate::config::{DeterministicMethod, SynthesisConfig, SynthesisMode};
use crate::ifft::synthesize_lobes;
use crate::params::SynthesisParams;
use crate::sine::{OscillatorBank, advance_phases};
use crate::stochastic::StochasticSynthesis;

/// Turns model frames into one hop of audio each.
///
/// Frames must arrive in time order: track phases and the overlap-add tail
/// carry over from one call to the next. The output of a frame is delayed by
/// one hop, so the block returned for frame `k` ends at the centre of frame
/// `k`.
pub struct Synthesizer {
    params: SynthesisParams,
    engine: SpectrumEngine,
    bank: OscillatorBank,
    stochastic: StochasticSynthesis,
    de_emphasis: Option<DeEmphasis>,
    scale: MagnitudeScale,
    mode: SynthesisMode,
    method: DeterministicMethod,
    transpose_ratio: f32,
    stochastic_gain: f32,
}

impl Synthesizer {
    /// Synthesizer for frames described by `header`.
    pub fn new(header: &ModelHeader, config: &SynthesisConfig) -> Result<Self> {
        config.validate()?;
        let sample_rate = config.output_rate(header.sample_rate);
        let params = SynthesisParams::new(header.layout(), sample_rate, config.hop_size)?;
        tracing::debug!(
            sample_rate,
            hop = params.hop_size(),
            mode = %config.mode,
            deterministic = %config.deterministic,
            "synthesizer ready"
        );
        Ok(Self {
            params,
            engine: SpectrumEngine::new(TransformStrategy::default(), MagnitudeScale::default()),
            bank: OscillatorBank::default(),
            stochastic: StochasticSynthesis::default(),
            de_emphasis: (config.de_emphasis && header.pre_emphasis).then(DeEmphasis::new),
            scale: MagnitudeScale::default(),
            mode: config.mode,
            method: config.deterministic,
            transpose_ratio: config.transpose_ratio(),
            stochastic_gain: config.stochastic_gain,
        })
    }

    /// Output samples per frame.
    pub fn hop_size(&self) -> usize {
        self.params.hop_size()
    }

    /// Output rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.params.sample_rate()
    }

    /// Scratch state and frame history.
    pub fn params(&self) -> &SynthesisParams {
        &self.params
    }

    /// Switch to a new hop between frames.
    pub fn change_hop(&mut self, hop: usize) -> Result<()> {
        self.params.change_hop(hop)
    }

    /// Forget phases, the overlap-add tail and the de-emphasis history.
    pub fn reset(&mut self) {
        self.params.reset();
        if let Some(filter) = self.de_emphasis.as_mut() {
            *filter = DeEmphasis::new();
        }
    }

    /// Synthesize one frame into `out`, which holds exactly one hop.
    pub fn synthesize(&mut self, frame: &ModelFrame, out: &mut [f32]) -> Result<()> {
        let hop = self.params.hop_size();
        if out.len() != hop {
            return Err(Error::SizeMismatch {
                what: "synthesis output",
                expected: hop,
                actual: out.len(),
            });
        }
        let sample_rate = self.params.sample_rate() as f32;

        {
            let current = &mut self.params.current;
            current.clear();
            current.copy_from(frame);
            if self.transpose_ratio != 1.0 {
                for f in current.freq_mut() {
                    *f *= self.transpose_ratio;
                }
            }
        }

        if self.mode.renders_deterministic() {
            let SynthesisParams {
                previous,
                current,
                deterministic_window,
                spectrum,
                accumulator,
                ..
            } = &mut self.params;
            advance_phases(previous, current, sample_rate, hop);
            match self.method {
                DeterministicMethod::Ifft => {
                    synthesize_lobes(
                        &mut self.engine,
                        current,
                        &self.scale,
                        sample_rate,
                        deterministic_window,
                        spectrum,
                        accumulator,
                    )?;
                }
                DeterministicMethod::OscillatorBank => {
                    self.bank
                        .render(previous, current, &self.scale, sample_rate, &mut accumulator[..hop]);
                }
            }
        }

        if self.mode.renders_stochastic() {
            self.stochastic.render(
                &mut self.engine,
                &mut self.params,
                frame,
                &self.scale,
                self.stochastic_gain,
            )?;
        }

        self.params.emit(out);
        if let Some(filter) = self.de_emphasis.as_mut() {
            filter.process_block(out);
        }
        let SynthesisParams {
            previous, current, ..
        } = &mut self.params;
        previous.copy_from(current);
        Ok(())
    }
}
