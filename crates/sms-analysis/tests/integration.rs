//! Integration tests for sms-analysis crate.
//!
//! Tests drive the public API of the spectrum engine, the frame sequencer and
//! the analysis session with synthetic signals of known content.

use std::f32::consts::PI;

use sms_analysis::{
    AnalysisParams, AnalysisSession, FrameSequencer, FrameStatus, PeakDetector, SequencerConfig,
    SpectrumEngine, TransformStrategy,
};
use sms_core::{
    FrameSource, MagnitudeScale, ModelFormat, ModelFrame, Result, SpectralPeak, StochasticType,
    WindowType,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Sum of sines with the given (frequency, amplitude) pairs.
fn partials(pairs: &[(f32, f32)], sample_rate: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate;
            pairs
                .iter()
                .map(|&(f, a)| a * (2.0 * PI * f * t).sin())
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

// ===========================================================================
// 1. Spectrum engine
// ===========================================================================

#[test]
fn quick_spectrum_overlap_add_reconstructs_with_both_strategies() {
    let hop = 128;
    let size = 2 * hop;
    let window = WindowType::Hann.coefficients(size);
    let input = partials(&[(300.0, 0.4), (1700.0, 0.2)], 8000.0, hop * 16);

    for strategy in [TransformStrategy::Planned, TransformStrategy::HalfSizeReal] {
        let mut engine = SpectrumEngine::new(strategy, MagnitudeScale::default());
        let mut output = vec![0.0; input.len()];
        let mut mag = vec![0.0; hop];
        let mut phase = vec![0.0; hop];

        let mut start = 0;
        while start + size <= input.len() {
            engine
                .quick_spectrum(&input[start..], &window, size, &mut mag, Some(&mut phase))
                .unwrap();
            engine
                .inv_quick_spectrum(&mag, &phase, size, &mut output[start..start + size])
                .unwrap();
            start += hop;
        }

        for i in hop..input.len() - size {
            assert!(
                (output[i] - input[i]).abs() < 1e-4,
                "{strategy} sample {i}: {} vs {}",
                output[i],
                input[i]
            );
        }
    }
}

#[test]
fn zero_padded_quick_spectrum_uses_only_window_samples() {
    let mut engine = SpectrumEngine::new(TransformStrategy::Planned, MagnitudeScale::default());
    let window = vec![1.0; 4];
    // samples past the window must not leak into the transform
    let input = [1.0, 1.0, 1.0, 1.0, 100.0, 100.0];
    let mut mag = vec![0.0; 8];
    engine.quick_spectrum(&input, &window, 16, &mut mag, None).unwrap();
    assert!((mag[0] - 4.0).abs() < 1e-5, "dc {}", mag[0]);
}

// ===========================================================================
// 2. Frame sequencer
// ===========================================================================

#[test]
fn sequencer_ends_once_window_reaches_end_of_source() {
    let mut seq = FrameSequencer::new(SequencerConfig {
        sample_rate: 10000,
        hop_size: 100,
        total_samples: 10000,
        default_window: 201,
        max_window: 1001,
        window_periods: 3.0,
        min_good_frames: 3,
        depth: 8,
        guides: 4,
        max_peaks: 8,
    })
    .unwrap();

    let source = vec![0.0f32; 10000];
    let mut fed = 0usize;
    let mut last = None;
    let mut frames = 0;
    while let Some(status) = seq.advance().unwrap() {
        let frame = seq.slot(seq.current());
        last = Some((frame.center, status));
        frames += 1;
        let need = (frame.window_end().max(0) as usize).min(source.len());
        if need > fed {
            seq.buffer_mut().push(&source[fed..need]);
            fed = need;
        }
    }

    assert_eq!(last, Some((9900, FrameStatus::End)));
    assert_eq!(frames, 100);
}

// ===========================================================================
// 3. Analysis session
// ===========================================================================

#[test]
fn inharmonic_partials_are_tracked() {
    let params = AnalysisParams {
        format: ModelFormat::InharmonicWithPhase,
        pre_emphasis: false,
        stochastic: StochasticType::None,
        ..small_params()
    };
    let signal = partials(&[(310.0, 0.3), (1130.0, 0.2), (2570.0, 0.1)], 8000.0, 8000);
    let mut session = AnalysisSession::new(params).unwrap();
    let mut model = session.analyze(&signal).unwrap();

    let mut frame = ModelFrame::new(model.header().layout()).unwrap();
    model.read_frame(model.frame_count() / 2, &mut frame).unwrap();
    assert!(frame.phase().is_some());
    for target in [310.0, 1130.0, 2570.0] {
        assert!(
            frame.freq().iter().any(|&f| (f - target).abs() < 5.0),
            "{target} Hz missing from {:?}",
            frame.freq()
        );
    }
}

#[test]
fn exact_residual_model_stores_phases() {
    let params = AnalysisParams {
        stochastic: StochasticType::Ifft,
        ..small_params()
    };
    // hop 80 -> 128 residual bins
    let mut noise = sms_core::NoiseSource::new(7);
    let signal: Vec<f32> = (0..4000).map(|_| 0.1 * noise.next_bipolar()).collect();
    let mut session = AnalysisSession::new(params).unwrap();
    let mut model = session.analyze(&signal).unwrap();

    assert_eq!(model.header().stochastic_coefficients, 128);
    let mut frame = ModelFrame::new(model.header().layout()).unwrap();
    model.read_frame(10, &mut frame).unwrap();
    assert_eq!(frame.residual_phase().len(), 128);
    assert!(frame.gain() > 0.0);
}

struct NoPeaks;

impl PeakDetector for NoPeaks {
    fn detect(
        &mut self,
        _mag_db: &[f32],
        _phase: &[f32],
        _sample_rate: f32,
        _transform_size: usize,
        peaks: &mut Vec<SpectralPeak>,
    ) -> Result<()> {
        peaks.clear();
        Ok(())
    }
}

#[test]
fn custom_peak_detector_replaces_default() {
    let signal = partials(&[(440.0, 0.5)], 8000.0, 4000);
    let mut session = AnalysisSession::new(small_params())
        .unwrap()
        .with_peak_detector(Box::new(NoPeaks));
    let mut model = session.analyze(&signal).unwrap();

    let mut frame = ModelFrame::new(model.header().layout()).unwrap();
    for i in 0..model.frame_count() {
        model.read_frame(i, &mut frame).unwrap();
        assert_eq!(frame.active_tracks(), 0);
    }
    // everything ends up in the residual
    assert!(model.header().residual_percentage > 90.0);
}
