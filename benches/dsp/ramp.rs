//! Benchmarks for parameter ramps, read once per sample by every stage.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use monosynth::dsp::AudioParam;

use crate::BLOCK_SIZES;

pub fn bench_ramp(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/ramp");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        let mut param = AudioParam::new(0.0);
        param.ramp_to(0, 1.0, size as u64);
        group.bench_with_input(BenchmarkId::new("ramping", size), &size, |b, _| {
            b.iter(|| {
                for (t, out) in buffer.iter_mut().enumerate() {
                    *out = param.value_at(black_box(t as u64));
                }
            })
        });

        let held = AudioParam::new(0.5);
        group.bench_with_input(BenchmarkId::new("held", size), &size, |b, _| {
            b.iter(|| {
                for (t, out) in buffer.iter_mut().enumerate() {
                    *out = held.value_at(black_box(t as u64));
                }
            })
        });
    }

    group.finish();
}
