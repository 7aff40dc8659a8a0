//! Background synthesis thread.
//!
//! Renders blocks ahead of the audio callback and hands them over through
//! [`crate::io::block_channel`]. The audio callback never waits on this
//! thread: if a block is late it replays the previous one.
//!
//! # Example
//!
//! ```ignore
//! use tract_voice::{io::block_channel, runtime::SynthesisThread, EngineConfig, VoiceEngine};
//!
//! let engine = VoiceEngine::new(EngineConfig::default())?;
//! let (producer, mut consumer) = block_channel(engine.block_size());
//! let synth = SynthesisThread::spawn(engine, producer)?;
//! // in the audio callback: consumer.read_interleaved(data, channels);
//! synth.stop();
//! ```

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    io::BlockProducer,
    synth::{MessageReceiver, VoiceEngine, VoiceMessage},
};

/// Sleep between attempts while both buffers are with the consumer.
const IDLE_WAIT: Duration = Duration::from_millis(1);

/// Receiver used when no control channel is attached.
struct NoMessages;

impl MessageReceiver for NoMessages {
    fn pop(&mut self) -> Option<VoiceMessage> {
        None
    }
}

pub struct SynthesisThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<VoiceEngine>>,
}

impl SynthesisThread {
    pub fn spawn(engine: VoiceEngine, producer: BlockProducer) -> io::Result<Self> {
        Self::spawn_with_messages(engine, producer, NoMessages)
    }

    /// Like [`SynthesisThread::spawn`], draining `rx` before every block.
    pub fn spawn_with_messages<R>(
        mut engine: VoiceEngine,
        mut producer: BlockProducer,
        mut rx: R,
    ) -> io::Result<Self>
    where
        R: MessageReceiver + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("tract-voice-synth".into())
            .spawn(move || {
                tracing::debug!("synthesis thread started");
                let mut blocks = 0u64;
                while !stop_flag.load(Ordering::Acquire) {
                    if producer.is_ready() {
                        engine.drain_messages(&mut rx);
                        if producer.try_produce(|block| engine.render(block)) {
                            blocks += 1;
                        }
                    } else {
                        thread::sleep(IDLE_WAIT);
                    }
                }
                tracing::debug!(blocks, "synthesis thread stopped");
                engine
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Ask the thread to finish after the block it is rendering.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the thread and take the engine back.
    pub fn join(mut self) -> Option<VoiceEngine> {
        self.stop();
        self.handle.take().and_then(|h| h.join().ok())
    }
}

impl Drop for SynthesisThread {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
