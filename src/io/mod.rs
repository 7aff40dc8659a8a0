//! Moving rendered audio from the synthesis thread to the audio callback.
//!
//! ```text
//!   synthesis thread                         audio callback
//!   ----------------                         --------------
//!   BlockProducer ──▶ [filled, depth 1] ──▶ BlockConsumer
//!        ▲                                       │
//!        └──────────── [recycle, depth 1] ◀──────┘
//! ```
//!
//! Exactly two buffers exist. The consumer always owns one and plays it; the
//! other is either waiting in a ring or being rendered by the producer. When
//! the consumer reaches the end of its block and nothing new has arrived it
//! plays the same block again instead of waiting.

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer, PushError, RingBuffer};

/// Copy a mono block into every channel of an interleaved buffer.
pub fn fan_out(mono: &[f32], interleaved: &mut [f32], channels: usize) {
    if channels == 0 {
        return;
    }
    for (frame, &sample) in interleaved.chunks_mut(channels).zip(mono) {
        frame.fill(sample);
    }
}

/// Create a connected producer/consumer pair for blocks of `block_len` frames.
#[cfg(feature = "rtrb")]
pub fn block_channel(block_len: usize) -> (BlockProducer, BlockConsumer) {
    let block_len = block_len.max(1);
    let (filled_tx, filled_rx) = RingBuffer::new(1);
    let (mut recycle_tx, recycle_rx) = RingBuffer::new(1);

    // The spare buffer starts out free for the producer
    let _ = recycle_tx.push(vec![0.0f32; block_len]);

    (
        BlockProducer {
            filled: filled_tx,
            recycle: recycle_rx,
        },
        BlockConsumer {
            filled: filled_rx,
            recycle: recycle_tx,
            current: vec![0.0f32; block_len],
            position: 0,
            stale_blocks: 0,
        },
    )
}

#[cfg(feature = "rtrb")]
pub struct BlockProducer {
    filled: Producer<Vec<f32>>,
    recycle: Consumer<Vec<f32>>,
}

#[cfg(feature = "rtrb")]
impl BlockProducer {
    /// Whether a free buffer is waiting to be rendered into.
    pub fn is_ready(&self) -> bool {
        !self.recycle.is_empty()
    }

    /// Render into the free buffer, if there is one, and hand it over.
    /// Returns `false` when the consumer still holds both buffers.
    pub fn try_produce(&mut self, render: impl FnOnce(&mut [f32])) -> bool {
        let Ok(mut block) = self.recycle.pop() else {
            return false;
        };
        render(&mut block);

        match self.filled.push(block) {
            Ok(()) => true,
            Err(PushError::Full(_)) => {
                tracing::warn!("filled block ring unexpectedly full, dropping block");
                false
            }
        }
    }
}

#[cfg(feature = "rtrb")]
pub struct BlockConsumer {
    filled: Consumer<Vec<f32>>,
    recycle: Producer<Vec<f32>>,
    current: Vec<f32>,
    position: usize,
    stale_blocks: u64,
}

#[cfg(feature = "rtrb")]
impl BlockConsumer {
    /// How many times a block was replayed because no fresh one was ready.
    pub fn stale_blocks(&self) -> u64 {
        self.stale_blocks
    }

    fn advance(&mut self) {
        self.position = 0;
        match self.filled.pop() {
            Ok(fresh) => {
                let spent = std::mem::replace(&mut self.current, fresh);
                // Only two buffers exist, so the recycle slot is free
                let _ = self.recycle.push(spent);
            }
            Err(_) => self.stale_blocks += 1,
        }
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        if self.position >= self.current.len() {
            self.advance();
        }
        let sample = self.current.get(self.position).copied().unwrap_or(0.0);
        self.position += 1;
        sample
    }

    /// Fill a mono buffer. Never blocks.
    pub fn read(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.next_sample();
        }
    }

    /// Fill an interleaved buffer, duplicating the mono signal into every
    /// channel. Never blocks.
    pub fn read_interleaved(&mut self, data: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        for frame in data.chunks_mut(channels) {
            let sample = self.next_sample();
            frame.fill(sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out_duplicates_channels() {
        let mono = [0.1, 0.2, 0.3];
        let mut stereo = [0.0f32; 6];
        fan_out(&mono, &mut stereo, 2);
        assert_eq!(stereo, [0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
    }

    #[test]
    fn test_fan_out_ignores_zero_channels() {
        let mut out = [1.0f32; 4];
        fan_out(&[0.5; 4], &mut out, 0);
        assert_eq!(out, [1.0; 4]);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn test_consumer_replays_stale_block_without_producer() {
        let (_producer, mut consumer) = block_channel(4);
        let mut out = [1.0f32; 10];
        consumer.read(&mut out);
        assert_eq!(out, [0.0; 10]);
        assert_eq!(consumer.stale_blocks(), 2);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn test_blocks_arrive_in_order() {
        let (mut producer, mut consumer) = block_channel(4);
        let mut out = [0.0f32; 4];

        // Consumer starts on its silent block
        consumer.read(&mut out);
        assert_eq!(out, [0.0; 4]);

        assert!(producer.try_produce(|b| b.fill(1.0)));
        // Both buffers are now out of the producer's hands
        assert!(!producer.try_produce(|b| b.fill(9.0)));

        consumer.read(&mut out);
        assert_eq!(out, [1.0; 4]);

        assert!(producer.is_ready());
        assert!(producer.try_produce(|b| b.fill(2.0)));
        consumer.read(&mut out);
        assert_eq!(out, [2.0; 4]);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn test_read_interleaved() {
        let (mut producer, mut consumer) = block_channel(2);
        let mut out = [0.0f32; 4];
        consumer.read(&mut [0.0; 2]);
        producer.try_produce(|b| b.copy_from_slice(&[0.5, -0.5]));
        consumer.read_interleaved(&mut out, 2);
        assert_eq!(out, [0.5, 0.5, -0.5, -0.5]);
    }
}
