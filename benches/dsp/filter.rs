//! Benchmarks for the resonant lowpass.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use monosynth::dsp::filter::SVFilter;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        // Sawtooth-like ramp
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();
        let mut buffer = input.clone();

        let mut filter = SVFilter::new();
        group.bench_with_input(BenchmarkId::new("static", size), &size, |b, _| {
            b.iter(|| {
                for (out, &x) in buffer.iter_mut().zip(&input) {
                    *out = filter.process(black_box(x), 1_000.0, 6.0, SAMPLE_RATE);
                }
            })
        });

        // Cutoff moving every sample, as under filter modulation
        let mut filter = SVFilter::new();
        group.bench_with_input(BenchmarkId::new("swept", size), &size, |b, _| {
            b.iter(|| {
                for (i, (out, &x)) in buffer.iter_mut().zip(&input).enumerate() {
                    let cutoff = 500.0 + 4_000.0 * (i as f32 / size as f32);
                    *out = filter.process(black_box(x), cutoff, 6.0, SAMPLE_RATE);
                }
            })
        });
    }

    group.finish();
}
