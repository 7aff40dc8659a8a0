//! Low-level DSP primitives the voice is built from.
//!
//! Everything here is allocation-free after construction and safe to run on
//! a realtime thread. Components are plain structs driven per sample
//! (`run_step`) and per block (`finish_block`); wiring them together is the
//! job of [`crate::synth::VoiceEngine`].

/// Noise-shaping band-pass filter.
pub mod filter;
/// Liljencrants–Fant glottal source.
pub mod glottis;
pub mod math;
/// Simplex jitter and white noise.
pub mod noise;
/// Articulator controls that write the tract's target shape.
pub mod shaper;
/// Digital waveguide model of the vocal and nasal tract.
pub mod tract;
pub mod transient;

pub use filter::{BandPass, BandSettings, NoiseShaper};
pub use glottis::GlottalSource;
pub use shaper::{ControlLayout, Touch, TractShaper};
pub use tract::{TractGeometry, TractLayout, TractWaveguide, TurbulenceSource};
