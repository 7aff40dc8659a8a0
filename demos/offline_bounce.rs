//! Render a few seconds of a sustained vowel to `bounce.wav`.
//!
//! Run with: cargo run --example offline_bounce

use hound::{SampleFormat, WavSpec, WavWriter};
use tract_voice::{EngineConfig, VoiceEngine};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let config = EngineConfig::default();
    let sample_rate = config.sample_rate;
    let mut engine = VoiceEngine::new(config)?;
    engine.set_frequency(110.0);
    engine.set_tenseness(0.7);
    // Tongue back and low: an "ah"
    engine.set_tongue_target(12.0, 2.9);

    let mut output = vec![0.0f32; sample_rate as usize * 3];
    engine.render(&mut output);

    let mut wav = WavWriter::create(
        "bounce.wav",
        WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;
    for &sample in &output {
        wav.write_sample(sample)?;
    }
    wav.finalize()?;

    println!("Rendered {} samples to bounce.wav", output.len());
    Ok(())
}
