//! Babbling: open and close the lips a few times per second.
//!
//! Every reopening releases a burst, so the result sounds like "bababa".
//!
//! Run with: cargo run --example jaw_flap

use std::f64::consts::PI;

use hound::{SampleFormat, WavSpec, WavWriter};
use tract_voice::{EngineConfig, VoiceEngine};

const FLAP_HZ: f64 = 3.0;
const SECONDS: f64 = 4.0;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let config = EngineConfig::default();
    let sample_rate = config.sample_rate;
    let block_size = config.block_size;
    let mut engine = VoiceEngine::new(config)?;
    engine.set_auto_wobble(true);

    let mut wav = WavWriter::create(
        "jaw_flap.wav",
        WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;

    let total_frames = (SECONDS * sample_rate as f64) as usize;
    let mut block = vec![0.0f32; block_size];
    let mut frames_written = 0;
    let mut bursts = 0;

    while frames_written < total_frames {
        let t = frames_written as f64 / sample_rate as f64;
        let closure = 0.5 - 0.5 * (2.0 * PI * FLAP_HZ * t).cos();
        // Snap the extremes so the lips actually seal
        engine.set_lip_closure(((closure - 0.5) * 1.6 + 0.5).clamp(0.0, 1.0));

        let had_transient = !engine.tract().transients().is_empty();
        engine.render(&mut block);
        if !had_transient && !engine.tract().transients().is_empty() {
            bursts += 1;
        }

        for &sample in &block {
            wav.write_sample(sample)?;
        }
        frames_written += block.len();
    }
    wav.finalize()?;

    println!("Wrote jaw_flap.wav ({} release bursts)", bursts);
    Ok(())
}
