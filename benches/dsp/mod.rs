//! Benchmarks for low-level DSP primitives.

mod filter;
mod glottis;
mod tract;

pub use filter::bench_filter;
pub use glottis::bench_glottis;
pub use tract::bench_tract;
