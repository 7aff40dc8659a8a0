#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::dsp::shaper::Touch;

/// A control-surface update, sent from a UI or control thread and applied
/// by the engine at the next block boundary.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum VoiceMessage {
    SetFrequency(f64),
    SetTenseness(f64),
    SetVibratoAmount(f64),
    SetLoudness(f64),
    SetAutoWobble(bool),
    SetPitchVariance(bool),
    SetTensenessVariance(bool),
    SetTouched(bool),
    SetLipClosure(f64),
    SetTongueTarget { index: f64, diameter: f64 },
    SetConstriction { index: f64, radius: f64, target_diameter: f64 },
    SetVelumOpen(bool),
    TongueTouch(Option<Touch>),
    ConstrictionTouch(Option<Touch>),
    SetDownsampling(u32),
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<VoiceMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<VoiceMessage> {
    fn pop(&mut self) -> Option<VoiceMessage> {
        Consumer::pop(self).ok()
    }
}
