#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::{
        filter::BandSettings,
        glottis::{DEFAULT_FREQUENCY, DEFAULT_TENSENESS, DEFAULT_VIBRATO_AMOUNT},
        noise::DEFAULT_NOISE_SEED,
        shaper::{DEFAULT_TONGUE_DIAMETER, DEFAULT_TONGUE_INDEX},
        tract::TractLayout,
    },
    error::{TractError, TractResult},
    MAX_BLOCK_SIZE,
};

/// Lowest sample rate the waveguide is run at.
pub const MIN_SAMPLE_RATE: u32 = 8_000;
/// Largest accepted downsampling factor.
pub const MAX_DOWNSAMPLING: u32 = 16;

/// Everything fixed for the lifetime of a [`crate::VoiceEngine`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// Number of main-tract segments.
    pub segments: usize,
    pub nasal_enabled: bool,
    /// Frames rendered between `finish_block` updates.
    pub block_size: usize,
    /// Only every Nth frame is simulated; the rest hold the last sample.
    pub downsampling: u32,
    /// Gain applied to mouth + nose before the sample leaves the engine.
    pub output_gain: f32,
    pub noise_seed: u64,
    pub aspiration_band: BandSettings,
    pub fricative_band: BandSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            segments: 44,
            nasal_enabled: true,
            block_size: 512,
            downsampling: 1,
            output_gain: 0.125,
            noise_seed: DEFAULT_NOISE_SEED,
            aspiration_band: BandSettings::new(500.0, 0.5),
            fricative_band: BandSettings::new(1_000.0, 0.5),
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments;
        self
    }

    pub fn with_nasal(mut self, enabled: bool) -> Self {
        self.nasal_enabled = enabled;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_downsampling(mut self, factor: u32) -> Self {
        self.downsampling = factor;
        self
    }

    pub fn with_noise_seed(mut self, seed: u64) -> Self {
        self.noise_seed = seed;
        self
    }

    /// Check everything that would make the engine impossible to build and
    /// return the tract layout it implies.
    pub fn validate(&self) -> TractResult<TractLayout> {
        if self.sample_rate < MIN_SAMPLE_RATE {
            return Err(TractError::InvalidSampleRate {
                rate: self.sample_rate,
                min: MIN_SAMPLE_RATE,
            });
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(TractError::InvalidBlockSize {
                size: self.block_size,
                max: MAX_BLOCK_SIZE,
            });
        }
        TractLayout::new(self.segments)
    }
}

/// Round a downsampling request up to a power of two in `1..=16`.
pub fn normalize_downsampling(factor: u32) -> u32 {
    factor.clamp(1, MAX_DOWNSAMPLING).next_power_of_two()
}

/// The scalar voice controls a host may want to store and restore.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceParams {
    pub frequency: f64,
    pub tenseness: f64,
    pub vibrato_amount: f64,
    pub loudness: f64,
    pub auto_wobble: bool,
    pub pitch_variance: bool,
    pub tenseness_variance: bool,
    pub tongue_index: f64,
    pub tongue_diameter: f64,
    pub lip_closure: f64,
    pub velum_open: bool,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            frequency: DEFAULT_FREQUENCY,
            tenseness: DEFAULT_TENSENESS,
            vibrato_amount: DEFAULT_VIBRATO_AMOUNT,
            loudness: 1.0,
            auto_wobble: false,
            pitch_variance: true,
            tenseness_variance: true,
            tongue_index: DEFAULT_TONGUE_INDEX,
            tongue_diameter: DEFAULT_TONGUE_DIAMETER,
            lip_closure: 0.0,
            velum_open: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let layout = EngineConfig::default().validate().unwrap();
        assert_eq!(layout.segments, 44);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let low_rate = EngineConfig::default().with_sample_rate(100);
        assert!(matches!(low_rate.validate(), Err(TractError::InvalidSampleRate { rate: 100, .. })));

        let empty_block = EngineConfig::default().with_block_size(0);
        assert!(matches!(empty_block.validate(), Err(TractError::InvalidBlockSize { size: 0, .. })));

        let huge_block = EngineConfig::default().with_block_size(MAX_BLOCK_SIZE + 1);
        assert!(huge_block.validate().is_err());

        let tiny_tract = EngineConfig::default().with_segments(6);
        assert!(matches!(tiny_tract.validate(), Err(TractError::InvalidSegmentCount { segments: 6, .. })));
    }

    #[test]
    fn test_downsampling_rounds_to_power_of_two() {
        assert_eq!(normalize_downsampling(0), 1);
        assert_eq!(normalize_downsampling(1), 1);
        assert_eq!(normalize_downsampling(3), 4);
        assert_eq!(normalize_downsampling(8), 8);
        assert_eq!(normalize_downsampling(1000), 16);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_params_deserialize_with_defaults() {
        let params: VoiceParams = serde_json::from_str(r#"{ "frequency": 220.0 }"#).unwrap();
        assert_eq!(params.frequency, 220.0);
        assert_eq!(params.tenseness, DEFAULT_TENSENESS);
    }
}
