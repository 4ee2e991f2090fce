//! Mapping of output time onto model frames.
//!
//! The scheduler walks a fractional frame coordinate through the model, one
//! synthesis hop at a time, and hands each hop's frame (interpolated between
//! the two neighbouring model frames, or the floor frame verbatim) to a
//! [`Synthesizer`].

use sms_core::{FrameSource, ModelFrame, ModelHeader, Result, StochasticType};

use crate::config::SynthesisConfig;
use crate::synthesizer::Synthesizer;

/// Output length and frame walk of one resynthesis run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResynthesisScheduler {
    frame_count: usize,
    source_rate: u32,
    source_hop: usize,
    output_rate: u32,
    time_stretch: f32,
    interpolate: bool,
}

impl ResynthesisScheduler {
    /// Schedule the frames of `header` under `config`.
    ///
    /// Models storing the exact residual phase spectrum are never
    /// interpolated: phases of neighbouring frames do not average.
    pub fn new(header: &ModelHeader, config: &SynthesisConfig) -> Self {
        Self {
            frame_count: header.frame_count,
            source_rate: header.sample_rate,
            source_hop: header.hop_size(),
            output_rate: config.output_rate(header.sample_rate),
            time_stretch: config.time_stretch,
            interpolate: config.interpolate && header.stochastic != StochasticType::Ifft,
        }
    }

    /// Whether neighbouring frames are interpolated.
    pub fn interpolates(&self) -> bool {
        self.interpolate
    }

    /// Number of samples the run produces.
    pub fn output_sample_count(&self) -> usize {
        let rate_ratio = f64::from(self.output_rate) / f64::from(self.source_rate.max(1));
        (self.frame_count as f64 * self.source_hop as f64 * f64::from(self.time_stretch) * rate_ratio)
            as usize
    }

    /// Frame coordinate advance per output sample.
    pub fn location_increment(&self) -> f64 {
        f64::from(self.source_rate)
            / (self.source_hop.max(1) as f64
                * f64::from(self.output_rate)
                * f64::from(self.time_stretch))
    }

    /// Frames around `location` and the weight of the right one.
    ///
    /// Both indices are clamped to the last frame, so past the end the
    /// interpolation collapses onto the last frame.
    pub fn bracket(&self, location: f64) -> (usize, usize, f32) {
        let last = self.frame_count.saturating_sub(1);
        let left = (location.max(0.0).floor() as usize).min(last);
        let right = (left + 1).min(last);
        let factor = (location - left as f64).clamp(0.0, 1.0) as f32;
        (left, right, factor)
    }

    /// The same schedule over `frame_count` frames.
    pub fn with_frame_count(&self, frame_count: usize) -> Self {
        Self {
            frame_count,
            ..self.clone()
        }
    }

    /// Synthesize the whole model, passing each output block to `sink`.
    ///
    /// The walk covers the frames `source` actually holds, so a header whose
    /// frame count was never filled in still renders every frame. Returns
    /// the number of samples produced, which equals the
    /// [`output_sample_count`](Self::output_sample_count) of that schedule;
    /// the last block is cut short to land on it exactly.
    pub fn run<S, F>(&self, source: &mut S, synth: &mut Synthesizer, sink: F) -> Result<usize>
    where
        S: FrameSource + ?Sized,
        F: FnMut(&[f32]) -> Result<()>,
    {
        let frames = source.frame_count();
        if frames != self.frame_count {
            tracing::debug!(
                scheduled = self.frame_count,
                available = frames,
                "frame count taken from the source"
            );
            return self.with_frame_count(frames).walk(source, synth, sink);
        }
        self.walk(source, synth, sink)
    }

    fn walk<S, F>(&self, source: &mut S, synth: &mut Synthesizer, mut sink: F) -> Result<usize>
    where
        S: FrameSource + ?Sized,
        F: FnMut(&[f32]) -> Result<()>,
    {
        let total = self.output_sample_count();
        if total == 0 || self.frame_count == 0 {
            return Ok(0);
        }
        let layout = source.header().layout();
        let mut left = ModelFrame::new(layout)?;
        let mut right = ModelFrame::new(layout)?;
        let mut frame = ModelFrame::new(layout)?;
        let mut loaded: (Option<usize>, Option<usize>) = (None, None);

        let hop = synth.hop_size();
        let step = self.location_increment() * hop as f64;
        let mut block = vec![0.0; hop];
        let mut location = 0.0f64;
        let mut written = 0;
        tracing::debug!(
            frames = self.frame_count,
            samples = total,
            hop,
            interpolate = self.interpolate,
            "resynthesis started"
        );

        while written < total {
            let (l, r, factor) = self.bracket(location);
            if loaded.0 != Some(l) {
                if loaded.1 == Some(l) {
                    std::mem::swap(&mut left, &mut right);
                    loaded.0 = loaded.1.take();
                } else {
                    source.read_frame(l, &mut left)?;
                    loaded.0 = Some(l);
                }
            }
            if self.interpolate && r != l {
                if loaded.1 != Some(r) {
                    source.read_frame(r, &mut right)?;
                    loaded.1 = Some(r);
                }
                frame.interpolate(&left, &right, factor);
                synth.synthesize(&frame, &mut block)?;
            } else {
                synth.synthesize(&left, &mut block)?;
            }

            let n = hop.min(total - written);
            sink(&block[..n])?;
            written += n;
            location += step;
        }
        Ok(written)
    }

    /// Synthesize the whole model into memory.
    pub fn render<S>(&self, source: &mut S, synth: &mut Synthesizer) -> Result<Vec<f32>>
    where
        S: FrameSource + ?Sized,
    {
        let mut out = Vec::with_capacity(
            self.with_frame_count(source.frame_count())
                .output_sample_count(),
        );
        self.run(source, synth, |block| {
            out.extend_from_slice(block);
            Ok(())
        })?;
        Ok(out)
    }
}
