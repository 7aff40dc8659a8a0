pub mod config;
pub mod dsp;
pub mod error;
pub mod io; // Block hand-off to the audio callback
#[cfg(feature = "rtrb")]
pub mod runtime; // Background synthesis thread
pub mod synth; // Session object and control messages

pub use config::{EngineConfig, VoiceParams};
pub use error::{TractError, TractResult};
pub use synth::{MessageReceiver, VoiceEngine, VoiceMessage};

pub const MAX_BLOCK_SIZE: usize = 2048;
