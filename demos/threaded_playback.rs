//! Play a gliding voice through the default output device.
//!
//! The voice renders on its own thread; the audio callback only copies
//! finished blocks. Pitch updates travel over a lock-free message queue.
//!
//! Run with: cargo run --example threaded_playback

use std::{thread, time::Duration};

use color_eyre::eyre::eyre;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tract_voice::{
    io::block_channel, runtime::SynthesisThread, EngineConfig, VoiceEngine, VoiceMessage,
};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device.default_output_config()?;
    let channels = config.channels() as usize;

    let engine = VoiceEngine::new(EngineConfig::default().with_sample_rate(config.sample_rate().0))?;
    let (producer, mut consumer) = block_channel(engine.block_size());
    let (mut tx, rx) = rtrb::RingBuffer::<VoiceMessage>::new(32);
    let synth = SynthesisThread::spawn_with_messages(engine, producer, rx)?;

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _| consumer.read_interleaved(data, channels),
        |err| eprintln!("Audio error: {}", err),
        None,
    )?;
    stream.play()?;

    // Glide up an octave and back
    for step in 0..=80 {
        let phase = step as f64 / 40.0;
        let octave = if phase <= 1.0 { phase } else { 2.0 - phase };
        let _ = tx.push(VoiceMessage::SetFrequency(120.0 * 2f64.powf(octave)));
        thread::sleep(Duration::from_millis(50));
    }

    let _ = tx.push(VoiceMessage::SetTouched(false));
    thread::sleep(Duration::from_millis(500));
    drop(stream);
    synth.stop();
    Ok(())
}
