//! Whole-sound analysis.
//!
//! [`AnalysisSession`] drives the frame sequencer over a sound. Each step
//! positions a frame, feeds the sound buffer far enough for its window,
//! analyzes it (spectrum, peaks, fundamental, tracks) and, once the ring is
//! full, finishes the oldest frame: short tracks are cleaned, the residual is
//! computed against a local resynthesis and the stochastic part is stored.
//! Finished frames come out in order; the ring is drained at end of stream.

use crate::clean::TrackCleaner;
use crate::fundamental::{FundamentalEstimator, ReferencePeakEstimator};
use crate::params::AnalysisParams;
use crate::peaks::{LocalMaximumDetector, PeakDetector};
use crate::sequencer::{AnalysisFrame, FrameSequencer, FrameStatus, SequencerConfig};
use crate::spectrum::{SpectrumEngine, analysis_transform_size};
use crate::stochastic::StochasticAnalyzer;
use crate::tracking::{ContinuationSettings, GuideContinuation, PeakContinuation};
use sms_core::{
    EnvelopeType, Error, FrameLayout, MagnitudeScale, ModelFrame, ModelHeader, PreEmphasis,
    Result, SpectralModel, scale_window, zeroed,
};
use std::f32::consts::PI;

/// One analysis of one sound.
pub struct AnalysisSession {
    params: AnalysisParams,
    scale: MagnitudeScale,
    engine: SpectrumEngine,
    detector: Box<dyn PeakDetector>,
    estimator: Box<dyn FundamentalEstimator>,
    continuation: Box<dyn PeakContinuation>,
    window: Vec<f32>,
    mag: Vec<f32>,
    phase: Vec<f32>,
    original: Vec<f32>,
    synthesis: Vec<f32>,
}

impl AnalysisSession {
    /// Validate `params` and set up the default collaborators.
    pub fn new(params: AnalysisParams) -> Result<Self> {
        params.validate()?;
        let scale = MagnitudeScale::from_db(params.magnitude_threshold_db);
        let detector = LocalMaximumDetector::new(
            params.lowest_fundamental,
            params.highest_frequency,
            params.min_peak_magnitude,
            params.max_peaks,
        );
        let estimator = ReferencePeakEstimator {
            lowest: params.lowest_fundamental,
            highest: params.highest_fundamental,
            max_magnitude_diff: params.ref_harmonic_magnitude_diff,
            min_reference_magnitude: params.min_ref_harmonic_magnitude,
        };
        let continuation = GuideContinuation::new(ContinuationSettings {
            guides: params.guides,
            harmonic: params.format.is_harmonic(),
            freq_deviation: params.freq_deviation,
            peak_contribution: params.peak_contribution,
            fundamental_contribution: params.fundamental_contribution,
            max_sleeping_time: params.max_sleeping_time,
            default_spacing: params.clamped_default_fundamental(),
        })?;
        let block = 2 * params.hop_size();

        Ok(Self {
            engine: SpectrumEngine::new(params.transform, scale),
            scale,
            detector: Box::new(detector),
            estimator: Box::new(estimator),
            continuation: Box::new(continuation),
            window: Vec::new(),
            mag: Vec::new(),
            phase: Vec::new(),
            original: zeroed(block, "residual source block")?,
            synthesis: zeroed(block, "residual synthesis block")?,
            params,
        })
    }

    /// Replace the peak detector.
    pub fn with_peak_detector(mut self, detector: Box<dyn PeakDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Replace the fundamental estimator.
    pub fn with_fundamental_estimator(mut self, estimator: Box<dyn FundamentalEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Replace the peak continuation.
    pub fn with_peak_continuation(mut self, continuation: Box<dyn PeakContinuation>) -> Self {
        self.continuation = continuation;
        self
    }

    /// Analysis parameters.
    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    /// Header of a model with `frame_count` frames from these parameters.
    pub fn header(&self, frame_count: usize, residual_percentage: f32) -> ModelHeader {
        let p = &self.params;
        ModelHeader {
            frame_count,
            sample_rate: p.sample_rate,
            format: p.format,
            tracks: p.tracks,
            frame_rate: p.frame_rate,
            stochastic: p.stochastic,
            stochastic_coefficients: p.effective_stochastic_coefficients(),
            envelope: EnvelopeType::None,
            envelope_coefficients: 0,
            max_frequency: p.highest_frequency as u32,
            residual_percentage,
            pre_emphasis: p.pre_emphasis,
            text: p.summary(),
        }
    }

    /// Analyze a mono sound at the configured sample rate.
    pub fn analyze(&mut self, samples: &[f32]) -> Result<SpectralModel> {
        let mut source = samples.to_vec();
        if self.params.pre_emphasis {
            PreEmphasis::new().process_block(&mut source);
        }
        self.continuation.reset();

        let hop = self.params.hop_size();
        let mut seq = FrameSequencer::new(SequencerConfig::from_params(&self.params, source.len()))?;
        let mut cleaner = TrackCleaner::new(if self.params.clean_tracks {
            self.params.min_track_length
        } else {
            0
        });
        let mut stochastic = StochasticAnalyzer::new(self.params.stochastic, hop, self.scale)?;
        let layout = self.header(0, 0.0).layout();
        let mut frames = Vec::new();
        let mut fed = 0;

        tracing::debug!(
            samples = source.len(),
            hop,
            depth = seq.depth(),
            "analysis started"
        );

        loop {
            if seq.slot(0).is_analyzed() {
                frames.push(self.finish_oldest(&mut seq, &mut cleaner, &mut stochastic, layout)?);
            }
            let status = seq.advance()?;
            if status != Some(FrameStatus::Ready) {
                feed(&mut seq, &source, &mut fed, source.len());
                break;
            }
            let cur = seq.slot(seq.current());
            let need = (cur.window_end().max(cur.center + hop as i64)).max(0) as usize;
            feed(&mut seq, &source, &mut fed, need);
            self.analyze_current(&mut seq)?;
        }

        // Drain the ring
        for _ in 0..seq.depth() {
            if seq.slot(0).is_analyzed() {
                frames.push(self.finish_oldest(&mut seq, &mut cleaner, &mut stochastic, layout)?);
            }
            seq.rotate();
        }

        let header = self.header(frames.len(), stochastic.residual_percentage());
        tracing::debug!(
            frames = frames.len(),
            residual = header.residual_percentage,
            "analysis finished"
        );
        Ok(SpectralModel::new(header, frames))
    }

    /// Spectrum, peaks, fundamental and tracks of the newest frame.
    fn analyze_current(&mut self, seq: &mut FrameSequencer) -> Result<()> {
        let pos = seq.current();
        let size = seq.slot(pos).window_size;
        if self.window.len() != size {
            self.window = zeroed(size, "analysis window")?;
            self.params.window.fill(&mut self.window);
            scale_window(&mut self.window);
        }
        let bins = analysis_transform_size(size) / 2;
        if self.mag.len() < bins {
            self.mag = zeroed(bins, "magnitude spectrum")?;
            self.phase = zeroed(bins, "phase spectrum")?;
        }

        let samples = seq.frame_samples(pos)?;
        let bins = self
            .engine
            .analyze(samples, &self.window, &mut self.mag, &mut self.phase)?;

        let previous = seq.slot(pos - 1).fundamental;
        let sample_rate = self.params.sample_rate as f32;
        {
            let AnalysisFrame {
                peaks,
                status,
                fundamental,
                ..
            } = seq.slot_mut(pos);
            self.detector.detect(
                &self.mag[..bins],
                &self.phase[..bins],
                sample_rate,
                2 * bins,
                peaks,
            )?;
            *status = FrameStatus::PeaksFound;
            *fundamental = self.estimator.estimate(peaks, previous);
            *status = FrameStatus::FundamentalFound;
        }

        // Harmonic guidance only on a steady pitch
        let steady = seq
            .fundamental_deviation(pos)
            .is_none_or(|d| d <= self.params.max_deviation);
        let slot = seq.slot_mut(pos);
        let guide_fundamental = if steady { slot.fundamental } else { 0.0 };
        let AnalysisFrame {
            peaks,
            deterministic,
            status,
            ..
        } = slot;
        self.continuation
            .continue_peaks(peaks, guide_fundamental, deterministic)?;
        *status = FrameStatus::TracksFound;
        Ok(())
    }

    /// Clean, model the residual of and emit the oldest frame.
    fn finish_oldest(
        &mut self,
        seq: &mut FrameSequencer,
        cleaner: &mut TrackCleaner,
        stochastic: &mut StochasticAnalyzer,
        layout: FrameLayout,
    ) -> Result<ModelFrame> {
        cleaner.clean_oldest(seq);

        let hop = self.params.hop_size() as i64;
        let slot = seq.slot(0);
        let start = slot.center - hop;
        copy_block(seq, slot.frame_num, start, &mut self.original)?;
        sum_sinusoids(
            &slot.deterministic,
            &self.scale,
            self.params.sample_rate as f32,
            &mut self.synthesis,
        );
        seq.slot_mut(0).status = FrameStatus::DeterministicSynthesized;

        let mut out = ModelFrame::new(layout)?;
        out.copy_from(&seq.slot(0).deterministic);
        stochastic.analyze(&mut self.engine, &self.original, &self.synthesis, &mut out)?;
        seq.slot_mut(0).status = FrameStatus::StochasticComputed;
        seq.mark_done(0);
        Ok(out)
    }
}

/// Push source samples up to index `need` into the sound buffer.
fn feed(seq: &mut FrameSequencer, source: &[f32], fed: &mut usize, need: usize) {
    let need = need.min(source.len());
    if need > *fed {
        seq.buffer_mut().push(&source[*fed..need]);
        *fed = need;
    }
}

/// Copy source samples `start..start + out.len()`; samples past the
/// buffered end are silence.
fn copy_block(seq: &FrameSequencer, frame: usize, start: i64, out: &mut [f32]) -> Result<()> {
    let buffer = seq.buffer();
    let end = start + out.len() as i64;
    if start < buffer.marker() {
        return Err(Error::BufferRunoff {
            frame,
            start,
            end,
            marker: buffer.marker(),
            buffer_end: buffer.end(),
        });
    }
    let available = end.min(buffer.end());
    let n = (available - start).max(0) as usize;
    if let Some(span) = buffer.span(start, start + n as i64) {
        out[..n].copy_from_slice(span);
    }
    out[n..].fill(0.0);
    Ok(())
}

/// Stationary resynthesis of a frame's tracks over a block centered on the
/// frame: sample `i` lies `i - len / 2` samples from the center.
fn sum_sinusoids(frame: &ModelFrame, scale: &MagnitudeScale, sample_rate: f32, out: &mut [f32]) {
    out.fill(0.0);
    let half = (out.len() / 2) as f32;
    let phases = frame.phase().unwrap_or(&[]);
    for (t, (&freq, &amp)) in frame.freq().iter().zip(frame.amp()).enumerate() {
        if freq <= 0.0 {
            continue;
        }
        let a = scale.db_to_mag(amp);
        let phi = phases.get(t).copied().unwrap_or(0.0);
        let w = 2.0 * PI * freq / sample_rate;
        for (i, y) in out.iter_mut().enumerate() {
            *y += a * (phi + w * (i as f32 - half)).cos();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sms_core::{FrameSource, StochasticType};

    fn harmonic_tone(sr: f32, fund: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / sr;
                (1..=4)
                    .map(|h| 0.2 / h as f32 * (2.0 * PI * fund * h as f32 * t).sin())
                    .sum()
            })
            .collect()
    }

    fn small_params() -> AnalysisParams {
        AnalysisParams {
            sample_rate: 8000,
            frame_rate: 100,
            window_periods: 5.0,
            tracks: 8,
            guides: 12,
            highest_frequency: 3500.0,
            analysis_delay: 4,
            min_track_length: 3,
            max_sleeping_time: 3,
            stochastic_coefficients: 16,
            ..Default::default()
        }
    }

    #[test]
    fn test_frame_count_and_header() {
        let params = small_params();
        let hop = params.hop_size();
        let window = params.default_window_size();
        let samples = harmonic_tone(8000.0, 200.0, 8000);
        let mut session = AnalysisSession::new(params).unwrap();
        let mut model = session.analyze(&samples).unwrap();

        // frames centered at 0, hop, ... while center + (window + 1) / 2 < len;
        // pitch-synchronous windows are shorter than the default one
        let count = model.frame_count();
        let at_least = (8000 - (window + 1) / 2 - 1) / hop + 1;
        assert!(count >= at_least && count <= 8000 / hop, "{count} frames");
        let header = model.header().clone();
        assert_eq!(header.tracks, 8);
        assert_eq!(header.stochastic_coefficients, 16);
        assert!(!header.text.is_empty());

        let mut frame = ModelFrame::new(header.layout()).unwrap();
        model.read_frame(count / 2, &mut frame).unwrap();
        assert!(frame.active_tracks() >= 3, "{:?}", frame.freq());
    }

    #[test]
    fn test_harmonics_land_on_their_tracks() {
        let params = AnalysisParams {
            pre_emphasis: false,
            ..small_params()
        };
        let samples = harmonic_tone(8000.0, 200.0, 8000);
        let mut session = AnalysisSession::new(params).unwrap();
        let mut model = session.analyze(&samples).unwrap();
        let mut frame = ModelFrame::new(model.header().layout()).unwrap();
        model.read_frame(model.frame_count() / 2, &mut frame).unwrap();
        for h in 0..4 {
            let f = frame.freq()[h];
            let target = 200.0 * (h + 1) as f32;
            assert!((f - target).abs() < 5.0, "track {h}: {f}");
        }
    }

    #[test]
    fn test_residual_of_pure_tone_is_small() {
        let params = AnalysisParams {
            pre_emphasis: false,
            format: sms_core::ModelFormat::HarmonicWithPhase,
            ..small_params()
        };
        let samples = harmonic_tone(8000.0, 200.0, 8000);
        let mut session = AnalysisSession::new(params).unwrap();
        let model = session.analyze(&samples).unwrap();
        assert!(
            model.header().residual_percentage < 20.0,
            "residual {}%",
            model.header().residual_percentage
        );
    }

    #[test]
    fn test_silence_has_no_tracks() {
        let params = AnalysisParams {
            stochastic: StochasticType::None,
            ..small_params()
        };
        let mut session = AnalysisSession::new(params).unwrap();
        let mut model = session.analyze(&vec![0.0; 4000]).unwrap();
        assert!(model.frame_count() > 0);
        let mut frame = ModelFrame::new(model.header().layout()).unwrap();
        for i in 0..model.frame_count() {
            model.read_frame(i, &mut frame).unwrap();
            assert_eq!(frame.active_tracks(), 0);
        }
    }

    #[test]
    fn test_short_input_gives_empty_model() {
        let mut session = AnalysisSession::new(small_params()).unwrap();
        let model = session.analyze(&[0.1; 50]).unwrap();
        assert_eq!(model.frame_count(), 0);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = AnalysisParams {
            tracks: 0,
            ..Default::default()
        };
        assert!(matches!(
            AnalysisSession::new(params),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_copy_block_pads_past_end() {
        let mut seq = FrameSequencer::new(SequencerConfig::from_params(&small_params(), 100)).unwrap();
        seq.buffer_mut().push(&[1.0; 10]);
        let mut out = [9.0; 6];
        copy_block(&seq, 1, 7, &mut out).unwrap();
        assert_eq!(out, [1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
    }
}
