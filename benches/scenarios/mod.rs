//! Real-world scenario benchmarks.
//!
//! These benchmarks model actual usage patterns from the demos: a full
//! engine rendering steady vowels, babbling, and fricatives.

mod voice;

pub use voice::bench_voice;
