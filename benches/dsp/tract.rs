//! Benchmarks for the waveguide tract.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use tract_voice::dsp::tract::TractWaveguide;

use crate::BLOCK_SIZES;

pub fn bench_tract(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/tract");

    for &size in BLOCK_SIZES {
        let input: Vec<f64> = (0..size)
            .map(|i| (i as f64 / size as f64) * 2.0 - 1.0)
            .collect();
        let block_time = size as f64 / 48_000.0;

        // Two waveguide steps per sample, as the engine runs it
        for (name, nasal) in [("oral", false), ("nasal", true)] {
            let mut tract = TractWaveguide::new(44, 48_000.0, nasal).expect("valid tract");
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    let len = size as f64;
                    let mut acc = 0.0;
                    for (j, &x) in input.iter().enumerate() {
                        tract.run_step(black_box(x), 0.0, j as f64 / len);
                        acc += tract.lip_output();
                        tract.run_step(black_box(x), 0.0, (j as f64 + 0.5) / len);
                        acc += tract.lip_output();
                    }
                    tract.finish_block(block_time);
                    black_box(acc)
                })
            });
        }

        // Finer tract: cost grows with segment count
        let mut tract = TractWaveguide::new(88, 96_000.0, true).expect("valid tract");
        group.bench_with_input(BenchmarkId::new("segments_88", size), &size, |b, _| {
            b.iter(|| {
                for &x in &input {
                    tract.run_step(black_box(x), 0.0, 0.5);
                    tract.run_step(black_box(x), 0.0, 0.5);
                }
                tract.finish_block(block_time);
                black_box(tract.lip_output())
            })
        });
    }

    group.finish();
}
