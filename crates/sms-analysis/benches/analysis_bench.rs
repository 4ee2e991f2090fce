//! Criterion benchmarks for sms-analysis components
//!
//! Run with: cargo bench -p sms-analysis

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sms_analysis::{AnalysisParams, AnalysisSession, SpectrumEngine, TransformStrategy};
use sms_core::{MagnitudeScale, WindowType, scale_window};
use std::f32::consts::PI;

const SAMPLE_RATE: f32 = 44100.0;

/// Generate a test signal with four harmonics of 220 Hz
fn generate_harmonic_signal(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE;
            (1..=4)
                .map(|h| 0.5 / h as f32 * (2.0 * PI * 220.0 * h as f32 * t).sin())
                .sum()
        })
        .collect()
}

// ============================================================================
// Spectrum engine benchmarks
// ============================================================================

fn bench_spectrum_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("Spectrum_Analyze");

    let window_sizes = [255, 511, 1023, 2047, 4095];

    for strategy in [TransformStrategy::Planned, TransformStrategy::HalfSizeReal] {
        for &size in &window_sizes {
            let mut engine = SpectrumEngine::new(strategy, MagnitudeScale::default());
            let input = generate_harmonic_signal(size);
            let mut window = WindowType::BlackmanHarris70.coefficients(size);
            scale_window(&mut window);
            let bins = sms_analysis::analysis_transform_size(size) / 2;
            let mut mag = vec![0.0; bins];
            let mut phase = vec![0.0; bins];

            group.bench_with_input(
                BenchmarkId::new(strategy.name(), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        let n = engine
                            .analyze(black_box(&input), &window, &mut mag, &mut phase)
                            .unwrap();
                        black_box(n)
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_quick_spectrum_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("Quick_Spectrum_Roundtrip");

    for &hop in &[128usize, 256, 512] {
        let size = 2 * hop;
        let mut engine = SpectrumEngine::new(TransformStrategy::Planned, MagnitudeScale::default());
        let input = generate_harmonic_signal(size);
        let window = WindowType::Hann.coefficients(size);
        let mut mag = vec![0.0; hop];
        let mut phase = vec![0.0; hop];
        let mut output = vec![0.0; size];

        group.bench_with_input(BenchmarkId::from_parameter(hop), &hop, |b, _| {
            b.iter(|| {
                engine
                    .quick_spectrum(black_box(&input), &window, size, &mut mag, Some(&mut phase))
                    .unwrap();
                engine
                    .inv_quick_spectrum(&mag, &phase, size, &mut output)
                    .unwrap();
                black_box(&output);
            })
        });
    }

    group.finish();
}

// ============================================================================
// Full analysis
// ============================================================================

fn bench_full_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("Full_Analysis");
    group.sample_size(10);

    let input = generate_harmonic_signal(SAMPLE_RATE as usize);
    let params = AnalysisParams {
        analysis_delay: 10,
        ..Default::default()
    };

    group.bench_function("one_second_harmonic", |b| {
        b.iter(|| {
            let mut session = AnalysisSession::new(params.clone()).unwrap();
            let model = session.analyze(black_box(&input)).unwrap();
            black_box(model)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_spectrum_analyze,
    bench_quick_spectrum_roundtrip,
    bench_full_analysis,
);

criterion_main!(benches);
