//! Benchmarks for complete engine blocks.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use tract_voice::{dsp::Touch, EngineConfig, VoiceEngine};

use crate::BLOCK_SIZES;

pub fn bench_voice(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voice");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];
        let config = EngineConfig::default().with_block_size(size);

        // === STEADY VOWEL ===
        // Baseline: default articulation, engine noise on
        let mut vowel = VoiceEngine::new(config.clone()).expect("valid config");
        group.bench_with_input(BenchmarkId::new("vowel", size), &size, |b, _| {
            b.iter(|| vowel.render(black_box(&mut buffer)))
        });

        // === BABBLING ===
        // Lip closure changes every block, so release transients keep firing
        let mut babble = VoiceEngine::new(config.clone()).expect("valid config");
        let mut closed = false;
        group.bench_with_input(BenchmarkId::new("babble", size), &size, |b, _| {
            b.iter(|| {
                closed = !closed;
                babble.set_lip_closure(if closed { 1.0 } else { 0.0 });
                babble.render(black_box(&mut buffer));
            })
        });

        // === FRICATIVE ===
        // Held constriction: turbulence injection every waveguide step
        let mut fricative = VoiceEngine::new(config.clone()).expect("valid config");
        fricative.set_constriction_touch(Some(Touch::new(34.0, 0.5)));
        group.bench_with_input(BenchmarkId::new("fricative", size), &size, |b, _| {
            b.iter(|| fricative.render(black_box(&mut buffer)))
        });

        // === DOWNSAMPLED ===
        let mut cheap = VoiceEngine::new(config.with_downsampling(4)).expect("valid config");
        group.bench_with_input(BenchmarkId::new("downsample_4", size), &size, |b, _| {
            b.iter(|| cheap.render(black_box(&mut buffer)))
        });
    }

    group.finish();
}
