use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Noise Shaping
=============

Raw white noise sounds like a detuned radio. Breath and frication sit in a
band: aspiration around 500 Hz, frication around 1 kHz, both fairly wide.
A two-pole band-pass in front of each noise input is all that is needed.

We use the topology-preserving state-variable filter (trapezoidal
integrators). Only the band-pass tap is read, which has a peak gain of Q at
the center frequency and -6 dB/octave skirts on either side.

    g = tan(pi * fc / fs)        prewarped integrator gain
    k = 1 / Q                    damping
    h = 1 / (1 + g * (g + k))

The filter is a black box to the synthesizer: one sample in, one sample out.
*/

/// A white-noise pre-filter: one sample in, one sample out.
pub trait NoiseShaper: Send {
    fn process(&mut self, sample: f64) -> f64;

    fn set_center(&mut self, center_hz: f64);

    fn set_q(&mut self, q: f64);

    fn reset(&mut self);
}

/// Center frequency and Q for one noise band.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandSettings {
    pub center_hz: f64,
    pub q: f64,
}

impl BandSettings {
    pub const fn new(center_hz: f64, q: f64) -> Self {
        Self { center_hz, q }
    }
}

/// State-variable band-pass filter.
pub struct BandPass {
    ic1eq: f64, // First integrator's memory
    ic2eq: f64, // Second integrator's memory

    sample_rate: f64,
    center_hz: f64,
    q: f64,

    g: f64,
    k: f64,
    h: f64,
}

impl BandPass {
    pub fn new(sample_rate: f64, center_hz: f64, q: f64) -> Self {
        let mut filter = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            sample_rate,
            center_hz,
            q,
            g: 0.0,
            k: 0.0,
            h: 0.0,
        };
        filter.update_coefficients();
        filter
    }

    pub fn from_settings(sample_rate: f64, band: BandSettings) -> Self {
        Self::new(sample_rate, band.center_hz, band.q)
    }

    pub fn center_hz(&self) -> f64 {
        self.center_hz
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    fn update_coefficients(&mut self) {
        // Keep the center below Nyquist so tan() stays finite
        let nyquist = 0.5 * self.sample_rate;
        let fc = self.center_hz.clamp(1.0, nyquist * 0.99);
        self.g = (PI * fc / self.sample_rate).tan();
        self.k = 1.0 / self.q.max(1e-3);
        self.h = 1.0 / (1.0 + self.g * (self.g + self.k));
    }
}

impl NoiseShaper for BandPass {
    #[inline]
    fn process(&mut self, sample: f64) -> f64 {
        let v3 = sample - self.ic2eq;
        let v1 = self.h * (self.ic1eq + self.g * v3);
        let v2 = self.ic2eq + self.g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        v1
    }

    fn set_center(&mut self, center_hz: f64) {
        self.center_hz = center_hz;
        self.update_coefficients();
    }

    fn set_q(&mut self, q: f64) {
        self.q = q;
        self.update_coefficients();
    }

    fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}
