use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use voice_resonance::{
    AnalysisConfig, DecimationPolicy, PitchEstimator, SampleFrame, SessionAnalyzer,
    SpectrumAnalyzer,
};

const SAMPLE_RATE: f32 = 44100.0;

fn sine(freq: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE;
            (2.0 * std::f32::consts::PI * freq * t).sin() * 0.5
        })
        .collect()
}

fn benchmark_pitch_estimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pitch Estimation");

    for size in [1024usize, 2048, 4096].iter() {
        group.bench_with_input(BenchmarkId::new("estimate", size), size, |b, &size| {
            let mut estimator = PitchEstimator::new(&AnalysisConfig::default());
            let samples = sine(220.0, size);

            b.iter(|| {
                let _ = black_box(estimator.estimate(black_box(&samples), SAMPLE_RATE));
            });
        });
    }

    group.finish();
}

fn benchmark_spectrum(c: &mut Criterion) {
    let mut group = c.benchmark_group("Spectrum Analysis");

    for size in [1024usize, 2048, 4096].iter() {
        group.bench_with_input(BenchmarkId::new("magnitudes_db", size), size, |b, &size| {
            let mut fft = SpectrumAnalyzer::new(size);
            let samples = sine(220.0, size);
            let mut spectrum = Vec::new();

            b.iter(|| {
                fft.magnitudes_db(black_box(&samples), &mut spectrum);
                black_box(&spectrum);
            });
        });
    }

    group.finish();
}

fn benchmark_session_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("Session Tick");

    let fft_size = 2048usize;
    let samples = sine(220.0, fft_size);
    let mut fft = SpectrumAnalyzer::new(fft_size);
    let mut spectrum = Vec::new();
    fft.magnitudes_db(&samples, &mut spectrum);

    group.bench_function("process_frame_full", |b| {
        let mut analyzer = SessionAnalyzer::with_policy(
            AnalysisConfig::default(),
            DecimationPolicy::every_tick(),
        )
        .unwrap();
        analyzer.start().unwrap();

        b.iter(|| {
            let frame = SampleFrame {
                samples: &samples,
                spectrum_db: &spectrum,
                sample_rate: SAMPLE_RATE,
                fft_size,
            };
            let _ = black_box(analyzer.process_frame(black_box(&frame)));
        });
    });

    group.bench_function("process_frame_decimated", |b| {
        let mut analyzer = SessionAnalyzer::with_policy(
            AnalysisConfig::default(),
            DecimationPolicy::every(4),
        )
        .unwrap();
        analyzer.start().unwrap();

        b.iter(|| {
            let frame = SampleFrame {
                samples: &samples,
                spectrum_db: &spectrum,
                sample_rate: SAMPLE_RATE,
                fft_size,
            };
            let _ = black_box(analyzer.process_frame(black_box(&frame)));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_pitch_estimation,
    benchmark_spectrum,
    benchmark_session_tick
);
criterion_main!(benches);
