//! Benchmarks for the analysis pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use neurotwin_core::types::Recording;
use neurotwin_native::ml::features::FeatureExtractor;
use neurotwin_native::pipeline::Pipeline;
use neurotwin_native::processing::fft::WelchEstimator;
use neurotwin_native::processing::preprocess::Preprocessor;

const SAMPLE_RATE: f64 = 250.0;

/// Generate synthetic EEG data (sinusoidal with noise)
fn generate_eeg_samples(n: usize, freq_hz: f64, sample_rate: f64) -> Vec<f64> {
    use std::f64::consts::PI;

    (0..n)
        .map(|i| {
            let t = i as f64 / sample_rate;
            let signal = (2.0 * PI * freq_hz * t).sin();
            let noise = (i as f64 * 0.123).sin() * 0.1; // Pseudo-noise
            (signal + noise) * 50.0 // Scale to ~50 µV
        })
        .collect()
}

fn montage(n_samples: usize, with_eog: bool) -> Recording {
    let mut names: Vec<String> = ["Fp1", "Fp2", "F3", "F4", "Fz", "T3", "T4", "P3", "P4", "O1", "O2"]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    let mut data: Vec<Vec<f64>> = (0..names.len())
        .map(|i| generate_eeg_samples(n_samples, 6.0 + i as f64 * 1.7, SAMPLE_RATE))
        .collect();
    if with_eog {
        names.push("EOG".to_string());
        data.push(generate_eeg_samples(n_samples, 1.2, SAMPLE_RATE));
    }
    Recording::new(names, SAMPLE_RATE, data).expect("valid synthetic recording")
}

fn bench_welch_psd(c: &mut Criterion) {
    let mut group = c.benchmark_group("welch_psd");

    for seconds in [4, 30, 120].iter() {
        let samples = generate_eeg_samples(seconds * SAMPLE_RATE as usize, 10.0, SAMPLE_RATE);

        group.bench_with_input(BenchmarkId::from_parameter(seconds), seconds, |b, _| {
            let mut welch = WelchEstimator::new(SAMPLE_RATE);
            b.iter(|| {
                let psd = welch.compute_psd(black_box(&samples));
                black_box(psd.band_powers())
            });
        });
    }

    group.finish();
}

fn bench_feature_extraction(c: &mut Criterion) {
    let recording = montage(30 * SAMPLE_RATE as usize, false);
    let extractor = FeatureExtractor::new();

    c.bench_function("feature_extraction_30s", |b| {
        b.iter(|| black_box(extractor.extract(black_box(&recording))));
    });
}

fn bench_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocess");
    group.sample_size(10);

    let preprocessor = Preprocessor::default();
    for with_eog in [false, true] {
        let recording = montage(30 * SAMPLE_RATE as usize, with_eog);
        let label = if with_eog { "with_ica" } else { "filters_only" };
        group.bench_function(label, |b| {
            b.iter(|| black_box(preprocessor.preprocess(black_box(&recording))));
        });
    }

    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    let pipeline = Pipeline::default();
    let recording = montage(30 * SAMPLE_RATE as usize, true);
    let votes = [1.0, 0.3, 0.2, 0.7, 0.4, 0.6];

    group.bench_function("analyze_30s", |b| {
        b.iter(|| black_box(pipeline.analyze(black_box(&recording), Some(&votes[..]))));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_welch_psd,
    bench_feature_extraction,
    bench_preprocessing,
    bench_full_pipeline,
);
criterion_main!(benches);
