//! Benchmarks for the noise-shaping band-pass.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use tract_voice::dsp::{
    filter::{BandPass, NoiseShaper},
    noise::WhiteNoise,
};

use crate::BLOCK_SIZES;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        let mut white = WhiteNoise::new(7);
        let input: Vec<f64> = (0..size).map(|_| white.next_sample() * 2.0 - 1.0).collect();

        // Aspiration band
        let mut filter = BandPass::new(48_000.0, 500.0, 0.5);
        group.bench_with_input(BenchmarkId::new("aspiration", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0.0;
                for &x in &input {
                    acc += filter.process(black_box(x));
                }
                black_box(acc)
            })
        });

        // Fricative band
        let mut filter = BandPass::new(48_000.0, 1_000.0, 0.5);
        group.bench_with_input(BenchmarkId::new("fricative", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0.0;
                for &x in &input {
                    acc += filter.process(black_box(x));
                }
                black_box(acc)
            })
        });
    }

    group.finish();
}
