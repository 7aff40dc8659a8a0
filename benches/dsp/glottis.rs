//! Benchmarks for the LF glottal source.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use tract_voice::dsp::{glottis::GlottalSource, noise::DEFAULT_NOISE_SEED};

use crate::BLOCK_SIZES;

pub fn bench_glottis(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/glottis");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f64; size];

        // Plain voiced excitation plus the per-block update
        let mut glottis = GlottalSource::new(48_000.0, DEFAULT_NOISE_SEED);
        group.bench_with_input(BenchmarkId::new("block", size), &size, |b, _| {
            b.iter(|| {
                let len = buffer.len() as f64;
                for (j, out) in buffer.iter_mut().enumerate() {
                    *out = glottis.run_step(j as f64 / len, 0.0);
                }
                glottis.finish_block();
                black_box(&buffer);
            })
        });

        // High pitch re-derives the LF coefficients far more often
        let mut glottis = GlottalSource::new(48_000.0, DEFAULT_NOISE_SEED);
        glottis.set_frequency(1_000.0);
        group.bench_with_input(BenchmarkId::new("high_pitch", size), &size, |b, _| {
            b.iter(|| {
                let len = buffer.len() as f64;
                for (j, out) in buffer.iter_mut().enumerate() {
                    *out = glottis.run_step(j as f64 / len, 0.0);
                }
                glottis.finish_block();
                black_box(&buffer);
            })
        });
    }

    group.finish();
}
