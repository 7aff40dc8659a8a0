use std::f64::consts::PI;

use crate::dsp::noise::SimplexNoise;

/*
Glottal Source
==============

The vocal folds chop the airflow from the lungs into a train of puffs. What
the vocal tract actually hears is the *derivative* of that airflow, and the
Liljencrants-Fant (LF) model describes one period of it with two pieces.

Vocabulary
----------

  period        One cycle of fold vibration. Length = 1 / frequency.
                All LF timing below is normalized so a period has length 1.

  Tp            Instant of peak flow (flow derivative crosses zero).

  Te            Instant of glottal closure: the flow derivative reaches its
                most negative value, normalized to -1 (Ee = 1).

  Ta            Return-phase time constant: how quickly the flow settles
                after closure. Small Ta = abrupt closure = bright voice.

  tenseness     0..1 control. Tense folds close abruptly (pressed voice),
                lax folds leak air and close softly (breathy voice).

  Rd            Single "voice quality" shape parameter derived from
                tenseness, clamped to [0.5, 2.7]. Ra, Rk and Rg follow from
                it via Fant's regression formulas.


The Shape
---------

     0 ┼────╮
       │     ╲         open phase:  E0 * e^(alpha t) * sin(omega t)
       │  ╭───╲──╮
       │ ╱     ╲  ╲     return phase: (shift - e^(-epsilon (t - Te))) / Delta
       │╱       ╲  ╰────────────
    -1 ┼         ╰ Te
       0         Tp..Te          1

Open phase (0..Te): an exponentially growing sinusoid. omega = pi / Tp puts
the zero crossing at Tp.

Return phase (Te..1): an exponential recovery toward zero, shifted and
scaled so it starts at -1 and ends exactly at 0 at t = 1.


Solving alpha and E0
--------------------

The return-phase shape is fixed by Ta and Te. Two conditions pin the open
phase:

  1. net flow over the period is zero (the area above the axis equals the
     area below it), and
  2. the open phase reaches exactly -1 at Te.

The area condition is approximated by treating the growing sinusoid's lobe
as a half sine, which gives alpha as the log of an integral ratio:

    alpha = ln(-pi * sin(omega Te) * upper_area / (2 Tp)) / (Tp / 2 - Te)

and then condition 2 fixes the amplitude:

    E0 = -1 / (sin(omega Te) * e^(alpha Te))

Both pieces equal -1 at Te, so the waveform is continuous there.


Block-Accurate Updates
----------------------

Frequency and tenseness are controlled per audio block, but a new waveform
can only start at a period boundary. Each control keeps two snapshots: the
value at the previous block boundary ("old") and the value for the current
one ("new"). When a period ends part-way through a block, the next period
is built from old * (1 - lambda) + new * lambda, where lambda is the position
of that sample inside the block. Dropping the old snapshot would turn every
block boundary into an audible step.


Imperfections
-------------

A mechanically perfect source sounds synthetic. Once per block we add:
  - vibrato: a 6 Hz sine plus two slow jitter terms (pitch variance)
  - wobble: two even slower, larger drifts (auto wobble)
  - tenseness drift: two slow jitter terms (tenseness variance)
Each jitter channel samples the shared simplex field at its own rate so the
channels stay uncorrelated.
*/

pub const DEFAULT_FREQUENCY: f64 = 140.0;
pub const DEFAULT_TENSENESS: f64 = 0.6;
pub const DEFAULT_VIBRATO_AMOUNT: f64 = 0.005;
pub const VIBRATO_FREQUENCY: f64 = 6.0;

pub const MIN_FREQUENCY: f64 = 20.0;
pub const MAX_FREQUENCY: f64 = 2_000.0;
pub const MAX_VIBRATO_AMOUNT: f64 = 0.5;
pub const MAX_LOUDNESS: f64 = 4.0;

const RD_MIN: f64 = 0.5;
const RD_MAX: f64 = 2.7;

/// Per-block multiplicative glide toward a new pitch.
const FREQUENCY_GLIDE: f64 = 1.1;
/// Per-block intensity increase while voiced.
const INTENSITY_ATTACK: f64 = 0.13;
/// Per-block intensity decrease after release.
const INTENSITY_RELEASE: f64 = 0.05;
/// Tenseness a released glottis relaxes toward, before scaling.
const PASSIVE_TENSENESS: f64 = 3.0;

/// Shape coefficients of one LF period, normalized to period length 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfCoefficients {
    pub rd: f64,
    pub alpha: f64,
    pub e0: f64,
    pub epsilon: f64,
    pub shift: f64,
    pub delta: f64,
    pub te: f64,
    pub omega: f64,
}

impl LfCoefficients {
    /// Derive the LF shape for a tenseness value.
    pub fn from_tenseness(tenseness: f64) -> Self {
        let rd = (3.0 * (1.0 - tenseness)).clamp(RD_MIN, RD_MAX);

        let ra = -0.01 + 0.048 * rd;
        let rk = 0.224 + 0.118 * rd;
        let rg = (rk / 4.0) * (0.5 + 1.2 * rk) / (0.11 * rd - ra * (0.5 + 1.2 * rk));

        let ta = ra;
        let tp = 1.0 / (2.0 * rg);
        let te = tp + tp * rk;

        let epsilon = 1.0 / ta;
        let shift = (-epsilon * (1.0 - te)).exp();
        let delta = 1.0 - shift;

        let rhs_integral = ((1.0 / epsilon) * (shift - 1.0) + (1.0 - te) * shift) / delta;
        let total_lower_integral = -(te - tp) / 2.0 + rhs_integral;
        let total_upper_integral = -total_lower_integral;

        let omega = PI / tp;
        let s = (omega * te).sin();
        let y = -PI * s * total_upper_integral / (tp * 2.0);
        let z = y.ln();
        let alpha = z / (tp / 2.0 - te);
        let e0 = -1.0 / (s * (alpha * te).exp());

        Self {
            rd,
            alpha,
            e0,
            epsilon,
            shift,
            delta,
            te,
            omega,
        }
    }

    /// Evaluate the flow derivative at normalized phase `t` in `[0, 1]`.
    #[inline]
    pub fn evaluate(&self, t: f64) -> f64 {
        if t > self.te {
            (-(-self.epsilon * (t - self.te)).exp() + self.shift) / self.delta
        } else {
            self.e0 * (self.alpha * t).exp() * (self.omega * t).sin()
        }
    }

    pub fn is_finite(&self) -> bool {
        [
            self.rd,
            self.alpha,
            self.e0,
            self.epsilon,
            self.shift,
            self.delta,
            self.te,
            self.omega,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

pub struct GlottalSource {
    step_rate: f64,

    // Pitch: host target, per-block glide, and the two-slot block history
    target_frequency: f64,
    smoothed_frequency: f64,
    old_frequency: f64,
    new_frequency: f64,

    target_tenseness: f64,
    old_tenseness: f64,
    new_tenseness: f64,

    vibrato_amount: f64,
    loudness: f64,
    intensity: f64,

    pitch_variance: bool,
    tenseness_variance: bool,
    auto_wobble: bool,
    touched: bool,

    time_in_waveform: f64,
    total_time: f64,
    waveform_length: f64,
    coefficients: LfCoefficients,

    noise: SimplexNoise,
}

impl GlottalSource {
    pub fn new(sample_rate: f64, noise_seed: u64) -> Self {
        let mut glottis = Self {
            step_rate: sample_rate,
            target_frequency: DEFAULT_FREQUENCY,
            smoothed_frequency: DEFAULT_FREQUENCY,
            old_frequency: DEFAULT_FREQUENCY,
            new_frequency: DEFAULT_FREQUENCY,
            target_tenseness: DEFAULT_TENSENESS,
            old_tenseness: DEFAULT_TENSENESS,
            new_tenseness: DEFAULT_TENSENESS,
            vibrato_amount: DEFAULT_VIBRATO_AMOUNT,
            loudness: 1.0,
            intensity: 1.0,
            pitch_variance: true,
            tenseness_variance: true,
            auto_wobble: false,
            touched: true,
            time_in_waveform: 0.0,
            total_time: 0.0,
            waveform_length: 1.0 / DEFAULT_FREQUENCY,
            coefficients: LfCoefficients::from_tenseness(DEFAULT_TENSENESS),
            noise: SimplexNoise::new(noise_seed),
        };
        glottis.setup_waveform(0.0);
        glottis
    }

    /// Rate at which `run_step` is called (sample rate / downsampling).
    pub fn set_step_rate(&mut self, step_rate: f64) {
        if step_rate.is_finite() && step_rate > 0.0 {
            self.step_rate = step_rate;
        }
    }

    fn setup_waveform(&mut self, lambda: f64) {
        let frequency = self.old_frequency * (1.0 - lambda) + self.new_frequency * lambda;
        let tenseness = self.old_tenseness * (1.0 - lambda) + self.new_tenseness * lambda;

        self.waveform_length = 1.0 / frequency;
        self.coefficients = LfCoefficients::from_tenseness(tenseness);
    }

    /// Produce one excitation sample.
    ///
    /// `lambda` is the position of this sample inside the current block,
    /// `noise_sample` is the band-passed aspiration noise.
    pub fn run_step(&mut self, lambda: f64, noise_sample: f64) -> f64 {
        let time_step = 1.0 / self.step_rate;
        self.time_in_waveform += time_step;
        self.total_time += time_step;

        if self.time_in_waveform > self.waveform_length {
            self.time_in_waveform -= self.waveform_length;
            self.setup_waveform(lambda);
        }

        let mut output = self.normalized_lf_waveform(self.time_in_waveform / self.waveform_length);

        let mut aspiration = self.intensity
            * (1.0 - self.target_tenseness.sqrt())
            * self.noise_modulator()
            * noise_sample;
        aspiration *= 0.2 + 0.02 * self.noise.jitter(self.total_time * 1.99);

        output += aspiration;
        output
    }

    /// Periodic (voiced) part of the excitation at normalized phase `t`.
    #[inline]
    pub fn normalized_lf_waveform(&self, t: f64) -> f64 {
        self.coefficients.evaluate(t) * self.intensity * self.loudness
    }

    /// How strongly noise is let through right now.
    ///
    /// Blends a half-rectified sine at the glottal rate (noise bursts while
    /// the folds are open) with a constant floor, weighted by how tense and
    /// how loud the voice is.
    pub fn noise_modulator(&self) -> f64 {
        let phase = 2.0 * PI * self.time_in_waveform / self.waveform_length;
        let voiced = 0.1 + 0.2 * phase.sin().max(0.0);
        let weight = self.target_tenseness * self.intensity;
        weight * voiced + (1.0 - weight) * 0.3
    }

    /// Block-rate update: vibrato, pitch glide, tenseness drift, intensity.
    pub fn finish_block(&mut self) {
        let t = self.total_time;

        let mut vibrato = 0.0;
        if self.pitch_variance {
            vibrato += self.vibrato_amount * (2.0 * PI * t * VIBRATO_FREQUENCY).sin();
            vibrato += 0.02 * self.noise.jitter(t * 4.07);
            vibrato += 0.04 * self.noise.jitter(t * 2.15);
        }
        if self.auto_wobble {
            vibrato += 0.2 * self.noise.jitter(t * 0.98);
            vibrato += 0.4 * self.noise.jitter(t * 0.5);
        }

        if self.target_frequency > self.smoothed_frequency {
            self.smoothed_frequency =
                (self.smoothed_frequency * FREQUENCY_GLIDE).min(self.target_frequency);
        }
        if self.target_frequency < self.smoothed_frequency {
            self.smoothed_frequency =
                (self.smoothed_frequency / FREQUENCY_GLIDE).max(self.target_frequency);
        }

        self.old_frequency = self.new_frequency;
        self.new_frequency = self.smoothed_frequency * (1.0 + vibrato);

        self.old_tenseness = self.new_tenseness;
        self.new_tenseness = self.target_tenseness;
        if self.tenseness_variance {
            self.new_tenseness +=
                0.1 * self.noise.jitter(t * 0.46) + 0.05 * self.noise.jitter(t * 0.36);
        }

        if !self.touched {
            self.new_tenseness += (PASSIVE_TENSENESS - self.target_tenseness) * (1.0 - self.intensity);
        }

        if self.touched {
            self.intensity += INTENSITY_ATTACK;
        } else {
            self.intensity -= INTENSITY_RELEASE;
        }
        self.intensity = self.intensity.clamp(0.0, 1.0);
    }

    pub fn set_frequency(&mut self, hz: f64) {
        if hz.is_finite() {
            self.target_frequency = hz.clamp(MIN_FREQUENCY, MAX_FREQUENCY);
        }
    }

    pub fn set_tenseness(&mut self, tenseness: f64) {
        if tenseness.is_finite() {
            self.target_tenseness = tenseness.clamp(0.0, 1.0);
        }
    }

    pub fn set_vibrato_amount(&mut self, amount: f64) {
        if amount.is_finite() {
            self.vibrato_amount = amount.clamp(0.0, MAX_VIBRATO_AMOUNT);
        }
    }

    pub fn set_loudness(&mut self, loudness: f64) {
        if loudness.is_finite() {
            self.loudness = loudness.clamp(0.0, MAX_LOUDNESS);
        }
    }

    pub fn set_auto_wobble(&mut self, enabled: bool) {
        self.auto_wobble = enabled;
    }

    pub fn set_pitch_variance(&mut self, enabled: bool) {
        self.pitch_variance = enabled;
    }

    pub fn set_tenseness_variance(&mut self, enabled: bool) {
        self.tenseness_variance = enabled;
    }

    pub fn set_touched(&mut self, touched: bool) {
        self.touched = touched;
    }

    pub fn target_frequency(&self) -> f64 {
        self.target_frequency
    }

    pub fn smoothed_frequency(&self) -> f64 {
        self.smoothed_frequency
    }

    pub fn target_tenseness(&self) -> f64 {
        self.target_tenseness
    }

    pub fn vibrato_amount(&self) -> f64 {
        self.vibrato_amount
    }

    pub fn loudness(&self) -> f64 {
        self.loudness
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn auto_wobble(&self) -> bool {
        self.auto_wobble
    }

    pub fn pitch_variance(&self) -> bool {
        self.pitch_variance
    }

    pub fn tenseness_variance(&self) -> bool {
        self.tenseness_variance
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    /// Length in seconds of the period currently being played.
    pub fn waveform_length(&self) -> f64 {
        self.waveform_length
    }

    /// Instant of glottal closure inside the current period, in seconds.
    pub fn glottal_closure_time(&self) -> f64 {
        self.coefficients.te * self.waveform_length
    }

    pub fn coefficients(&self) -> &LfCoefficients {
        &self.coefficients
    }
}
