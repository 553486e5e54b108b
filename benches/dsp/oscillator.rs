//! Benchmarks for the band-limited oscillator.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use monosynth::dsp::{oscillator::Oscillator, Waveform};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for waveform in Waveform::ALL {
            let mut osc = Oscillator::new(waveform);
            group.bench_with_input(BenchmarkId::new(waveform.name(), size), &size, |b, _| {
                b.iter(|| {
                    for out in buffer.iter_mut() {
                        *out = osc.next_sample(black_box(440.0), SAMPLE_RATE);
                    }
                })
            });
        }
    }

    group.finish();
}
