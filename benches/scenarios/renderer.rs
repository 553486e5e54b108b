//! Full renderer blocks.
//!
//! The engine is set up through its public commands, then the renderer is
//! measured alone, the way the audio callback runs it.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use monosynth::{
    synth::{InputSource, ModTarget, SynthCommand, SynthEngine},
    EngineConfig,
};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_renderer(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/renderer");
    let config = EngineConfig::with_sample_rate(SAMPLE_RATE);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // === SILENCE ===
        // Baseline: sources tick, no voice allocated
        let (_engine, mut renderer, _scope) = SynthEngine::new(&config);
        group.bench_with_input(BenchmarkId::new("idle", size), &size, |b, _| {
            b.iter(|| renderer.render_block(black_box(&mut buffer)))
        });

        // === ONE NOTE ===
        let (mut engine, mut renderer, _scope) = SynthEngine::new(&config);
        engine.dispatch(SynthCommand::PressNote {
            name: "A3".into(),
            source: InputSource::Pointer,
        });
        group.bench_with_input(BenchmarkId::new("note", size), &size, |b, _| {
            b.iter(|| renderer.render_block(black_box(&mut buffer)))
        });

        // === MODULATED NOTE ===
        // Filter and amplitude modulation both routed to the voice
        let (mut engine, mut renderer, _scope) = SynthEngine::new(&config);
        for (source, target) in [(0, ModTarget::Filter), (1, ModTarget::Amplitude)] {
            engine.dispatch(SynthCommand::SetSourceTarget { source, target });
            engine.dispatch(SynthCommand::SetSourceDepth { source, depth: 0.5 });
        }
        engine.dispatch(SynthCommand::PressNote {
            name: "A3".into(),
            source: InputSource::Pointer,
        });
        group.bench_with_input(BenchmarkId::new("modulated", size), &size, |b, _| {
            b.iter(|| renderer.render_block(black_box(&mut buffer)))
        });
    }

    group.finish();
}
