//! Construction-time errors.
//!
//! Rendering never fails: out-of-range control values are clamped where they
//! enter the engine. Only a configuration that cannot describe a vocal tract
//! is rejected, and it is rejected up front.

use thiserror::Error;

/// Result type for engine construction.
pub type TractResult<T> = Result<T, TractError>;

/// Errors raised while building a synthesis session.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TractError {
    /// Sample rate is zero or too low to run the waveguide.
    #[error("invalid sample rate: {rate} Hz (minimum {min} Hz)")]
    InvalidSampleRate {
        /// The rejected sample rate.
        rate: u32,
        /// Smallest accepted sample rate.
        min: u32,
    },

    /// Segment count cannot hold the blade/tip/lip zone layout.
    #[error("invalid segment count {segments}: {reason}")]
    InvalidSegmentCount {
        /// Requested number of tract segments.
        segments: usize,
        /// Which part of the layout failed.
        reason: &'static str,
    },

    /// Nasal branch would be too short to carry a wave.
    #[error("nasal branch length {length} is too short for {segments} tract segments")]
    InvalidNoseLength {
        /// Derived nasal branch length.
        length: usize,
        /// Requested number of tract segments.
        segments: usize,
    },

    /// Block size is zero or larger than [`crate::MAX_BLOCK_SIZE`].
    #[error("invalid block size {size} (expected 1..={max})")]
    InvalidBlockSize {
        /// The rejected block size.
        size: usize,
        /// Largest accepted block size.
        max: usize,
    },
}

impl TractError {
    pub(crate) fn segments(segments: usize, reason: &'static str) -> Self {
        Self::InvalidSegmentCount { segments, reason }
    }
}
