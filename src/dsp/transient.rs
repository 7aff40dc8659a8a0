//! Release clicks injected into the waveguide.
//!
//! When a full closure opens, the pressure built up behind it escapes as a
//! short burst. We model it as an exponentially decaying impulse added to
//! both travelling waves at the segment that just opened.

/// Maximum number of simultaneously sounding transients.
pub const TRANSIENT_CAPACITY: usize = 16;

/// Seconds a release transient keeps sounding.
pub const TRANSIENT_LIFETIME: f64 = 0.2;
/// Peak amplitude of a release transient.
pub const TRANSIENT_STRENGTH: f64 = 0.3;
/// Decay rate: amplitude halves every `1 / exponent` seconds.
pub const TRANSIENT_EXPONENT: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transient {
    pub position: usize,
    pub time_alive: f64,
    pub life_time: f64,
    pub strength: f64,
    pub exponent: f64,
}

impl Transient {
    pub fn release(position: usize) -> Self {
        Self {
            position,
            time_alive: 0.0,
            life_time: TRANSIENT_LIFETIME,
            strength: TRANSIENT_STRENGTH,
            exponent: TRANSIENT_EXPONENT,
        }
    }

    #[inline]
    pub fn amplitude(&self) -> f64 {
        self.strength * (-self.exponent * self.time_alive).exp2()
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.time_alive > self.life_time
    }
}

/// What [`TransientPool::spawn`] did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// A fresh slot was used.
    Added,
    /// A live transient at the same position was restarted.
    Restarted,
    /// The pool was full; the oldest transient was replaced.
    Replaced,
}

/// Fixed-capacity, compact set of live transients.
///
/// Slots `0..len` are alive. Removal swaps the last live slot into the hole,
/// so nothing is allocated after construction.
pub struct TransientPool {
    slots: [Transient; TRANSIENT_CAPACITY],
    len: usize,
}

impl TransientPool {
    pub fn new() -> Self {
        Self {
            slots: [Transient::release(0); TRANSIENT_CAPACITY],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transient> {
        self.slots[..self.len].iter()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn spawn(&mut self, transient: Transient) -> SpawnOutcome {
        if let Some(existing) = self.slots[..self.len]
            .iter_mut()
            .find(|t| t.position == transient.position)
        {
            *existing = transient;
            return SpawnOutcome::Restarted;
        }

        if self.len < TRANSIENT_CAPACITY {
            self.slots[self.len] = transient;
            self.len += 1;
            return SpawnOutcome::Added;
        }

        let oldest = self.slots[..self.len]
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.time_alive.total_cmp(&b.time_alive))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        self.slots[oldest] = transient;
        SpawnOutcome::Replaced
    }

    /// Call `inject(position, amplitude)` for every live transient, age them
    /// all by `dt`, then drop the expired ones.
    pub fn process(&mut self, dt: f64, mut inject: impl FnMut(usize, f64)) {
        for t in &mut self.slots[..self.len] {
            inject(t.position, t.amplitude());
            t.time_alive += dt;
        }

        let mut i = 0;
        while i < self.len {
            if self.slots[i].is_expired() {
                self.len -= 1;
                self.slots.swap(i, self.len);
            } else {
                i += 1;
            }
        }
    }
}

impl Default for TransientPool {
    fn default() -> Self {
        Self::new()
    }
}
