//! Offline rendering and live playback

use std::{
    f64::consts::PI,
    path::Path,
    thread,
    time::{Duration, Instant},
};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::{SampleFormat, WavSpec, WavWriter};

use tract_voice::{
    io::block_channel, runtime::SynthesisThread, EngineConfig, VoiceEngine, VoiceMessage,
};

use super::VoiceArgs;

/// How often the control loop updates the lips during playback.
const CONTROL_INTERVAL: Duration = Duration::from_millis(10);

fn lip_closure_at(flap_hz: f64, t: f64) -> f64 {
    0.5 - 0.5 * (2.0 * PI * flap_hz * t).cos()
}

fn configure(engine: &mut VoiceEngine, voice: VoiceArgs) {
    engine.set_frequency(voice.frequency);
    engine.set_tenseness(voice.tenseness);
}

pub fn render(out: &Path, seconds: f64, voice: VoiceArgs) -> EyreResult<()> {
    let config = EngineConfig::default();
    let sample_rate = config.sample_rate;
    let block_size = config.block_size;
    let mut engine = VoiceEngine::new(config).wrap_err("failed to build voice engine")?;
    configure(&mut engine, voice);

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut wav = WavWriter::create(out, spec)
        .wrap_err_with(|| format!("failed to create {}", out.display()))?;

    let total_frames = (seconds.max(0.0) * sample_rate as f64) as usize;
    let mut block = vec![0.0f32; block_size];
    let mut frames_written = 0;
    let mut peak = 0.0f32;

    while frames_written < total_frames {
        let frames_to_render = (total_frames - frames_written).min(block_size);

        if let Some(flap) = voice.flap {
            let t = frames_written as f64 / sample_rate as f64;
            engine.set_lip_closure(lip_closure_at(flap, t));
        }

        let block = &mut block[..frames_to_render];
        engine.render(block);
        for &sample in block.iter() {
            peak = peak.max(sample.abs());
            wav.write_sample(sample)?;
        }
        frames_written += frames_to_render;
    }

    wav.finalize()?;
    tracing::info!(
        path = %out.display(),
        frames = frames_written,
        peak,
        "render complete"
    );
    Ok(())
}

pub fn play(seconds: f64, voice: VoiceArgs) -> EyreResult<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let supported = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;

    let config = EngineConfig::default().with_sample_rate(sample_rate);
    let mut engine = VoiceEngine::new(config).wrap_err("failed to build voice engine")?;
    configure(&mut engine, voice);

    tracing::info!(sample_rate, channels, "starting playback");

    let (producer, mut consumer) = block_channel(engine.block_size());
    let (mut controls, rx) = rtrb::RingBuffer::<VoiceMessage>::new(64);
    let synth = SynthesisThread::spawn_with_messages(engine, producer, rx)
        .wrap_err("failed to start synthesis thread")?;

    let stream = device.build_output_stream(
        &supported.into(),
        move |data: &mut [f32], _| consumer.read_interleaved(data, channels),
        |err| tracing::error!(%err, "audio stream error"),
        None,
    )?;
    stream.play()?;

    let start = Instant::now();
    let duration = Duration::from_secs_f64(seconds.max(0.0));
    while start.elapsed() < duration {
        if let Some(flap) = voice.flap {
            let t = start.elapsed().as_secs_f64();
            // A full queue only means the synth is behind; the next update wins
            let _ = controls.push(VoiceMessage::SetLipClosure(lip_closure_at(flap, t)));
        }
        thread::sleep(CONTROL_INTERVAL);
    }

    let _ = controls.push(VoiceMessage::SetTouched(false));
    thread::sleep(Duration::from_millis(300));
    drop(stream);

    if synth.join().is_none() {
        return Err(eyre!("synthesis thread panicked"));
    }
    tracing::info!("playback finished");
    Ok(())
}
