// Purpose: the synthesis session and its control messages
// This layer sits above the dsp primitives and wires them into one voice

pub mod engine;
pub mod message;

pub use engine::VoiceEngine;
pub use message::{MessageReceiver, VoiceMessage};
