use crate::{
    dsp::{
        math::{move_towards, saturate},
        transient::{SpawnOutcome, Transient, TransientPool},
    },
    error::{TractError, TractResult},
};

/*
Vocal Tract Waveguide
=====================

The tract is a tube from the glottis to the lips, cut into `n` short
cylinders. Sound inside a cylinder is two waves travelling in opposite
directions; where two cylinders of different cross-section meet, part of each
wave is reflected and the rest passes through.

Vocabulary
----------

  segment       One cylinder. Segment 0 sits on the glottis, segment n-1
                opens into the air at the lips.

  R, L          Right-going (toward the lips) and left-going (toward the
                glottis) wave amplitude in each segment.

  junction      The boundary between segment i-1 and segment i. There are
                n+1 of them including the two ends.

  area          Cross-section of a segment. We use diameter^2 and drop the
                constant pi/4: only ratios of areas matter.

  reflection    Fraction of a wave bounced back at a junction:
                    r = (A[i-1] - A[i]) / (A[i-1] + A[i])


Scattering at a Junction
------------------------

         R[i-1] ──▶ │ ──▶ R'[i]   = R[i-1] - w
                    │
         L'[i] ◀──  │ ◀── L[i]    L'[i] = L[i] + w

         w = r * (R[i-1] + L[i])

The two ends are special. At the glottis the left-going wave reflects with
+0.75 and the excitation is added. At the lips the wave meets open air, a
near-total inverting mismatch (-0.85); whatever gets through is the mouth
output.


The Nose
--------

A second, fixed tube branches off at `nose_start`. Its entrance (index 0) is
the velum: nearly shut for oral sounds, opened for nasals. The branch point
is a three-way junction where all three waves meet:

    sum = A_left + A_right + A_nose
    r_x = (2 * A_x - sum) / sum          for x in {left, right, nose}

    out_x = r_x * in_x + (1 + r_x) * (sum of the other two inputs)


Rates
-----

One segment is about 0.4 cm long, which sound crosses in roughly one sample
at twice the audio rate. `run_step` is therefore called twice per output
sample. Geometry (diameters, velum, reflections) only changes once per block
in `finish_block`; inside a block every reflection is blended from the
previous block's value to the new one by lambda, the sample's position in the
block. Keeping both values is what stops a moving tongue from clicking.


Closures and Release
--------------------

    Open ──(diameter shrinking)──▶ Closing ──(diameter <= 0)──▶ Closed
      ▲                                                           │
      └─────────────── release: spawn a Transient ◀───────────────┘

When a segment that was fully closed at the previous block opens again (and
the nose is sealed, so pressure had nowhere else to go) a short decaying
impulse is injected at that segment: the burst of a plosive.
*/

/// Areas smaller than this are treated as a full closure.
const AREA_EPSILON: f64 = 0.0005;
/// Reflection used at a closed junction instead of the area ratio.
const CLOSED_REFLECTION: f64 = 0.999;

const GLOTTAL_REFLECTION: f64 = 0.75;
const LIP_REFLECTION: f64 = -0.85;
/// Propagation loss applied to every segment each step.
const WALL_LOSS: f64 = 0.999;
/// Propagation loss in the nasal branch.
const NOSE_FADE: f64 = 0.999;

/// How fast diameters move toward their targets, in diameter units/second.
const MOVEMENT_SPEED: f64 = 15.0;
/// Velum position when the nasal passage is shut.
pub const VELUM_CLOSED: f64 = 0.01;
/// Velum position for nasal sounds.
pub const VELUM_OPEN: f64 = 0.4;
/// Release transients only fire while the nose area is below this.
const SEALED_NOSE_AREA: f64 = 0.05;

/// Peak-hold decay per step for the amplitude trackers.
const AMPLITUDE_DECAY: f64 = 0.999;
/// Scale applied to touch-driven frication before injection.
const TURBULENCE_GAIN: f64 = 0.66;

/// Anatomical zone boundaries, fixed for the lifetime of a tract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TractLayout {
    pub segments: usize,
    pub blade_start: usize,
    pub tip_start: usize,
    pub lip_start: usize,
    pub nose_start: usize,
    pub nose_length: usize,
}

impl TractLayout {
    /// Scale the reference 44-segment layout to `segments`.
    pub fn new(segments: usize) -> TractResult<Self> {
        let scale = |reference: f64| (reference * segments as f64 / 44.0).floor() as usize;

        let blade_start = scale(10.0);
        let tip_start = scale(32.0);
        let lip_start = scale(39.0);
        let nose_length = scale(28.0);

        if blade_start < 2 {
            return Err(TractError::segments(segments, "no room for the glottis and pharynx"));
        }
        if tip_start <= blade_start || lip_start <= tip_start || lip_start >= segments {
            return Err(TractError::segments(segments, "blade, tip and lip zones overlap"));
        }
        if nose_length < 2 {
            return Err(TractError::InvalidNoseLength {
                length: nose_length,
                segments,
            });
        }

        let nose_start = segments + 1 - nose_length;
        if nose_start + 1 >= segments || nose_start >= tip_start {
            return Err(TractError::InvalidNoseLength {
                length: nose_length,
                segments,
            });
        }

        Ok(Self {
            segments,
            blade_start,
            tip_start,
            lip_start,
            nose_start,
            nose_length,
        })
    }
}

/// Shape of the main tract: what the shaper writes and the waveguide reads.
#[derive(Debug, Clone)]
pub struct TractGeometry {
    layout: TractLayout,
    pub diameter: Vec<f64>,
    pub rest_diameter: Vec<f64>,
    pub target_diameter: Vec<f64>,
    pub velum_target: f64,
}

impl TractGeometry {
    fn neutral(layout: TractLayout) -> Self {
        let n = layout.segments;
        let nf = n as f64;
        let profile: Vec<f64> = (0..n)
            .map(|i| {
                let i = i as f64;
                if i < 7.0 * nf / 44.0 - 0.5 {
                    0.6
                } else if i < 12.0 * nf / 44.0 {
                    1.1
                } else {
                    1.5
                }
            })
            .collect();

        Self {
            layout,
            diameter: profile.clone(),
            rest_diameter: profile.clone(),
            target_diameter: profile,
            velum_target: VELUM_CLOSED,
        }
    }

    pub fn layout(&self) -> &TractLayout {
        &self.layout
    }

    pub fn segments(&self) -> usize {
        self.layout.segments
    }
}

/// A point where frication noise is injected into the tract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurbulenceSource {
    /// Fractional segment index.
    pub index: f64,
    /// Local diameter at the constriction.
    pub diameter: f64,
    /// 0..1 scale applied to the noise.
    pub intensity: f64,
}

pub struct TractWaveguide {
    geometry: TractGeometry,
    step_rate: f64,
    nasal_enabled: bool,

    r: Vec<f64>,
    l: Vec<f64>,
    reflection: Vec<f64>,
    new_reflection: Vec<f64>,
    junction_output_r: Vec<f64>,
    junction_output_l: Vec<f64>,
    area: Vec<f64>,
    max_amplitude: Vec<f64>,

    reflection_left: f64,
    reflection_right: f64,
    reflection_nose: f64,
    new_reflection_left: f64,
    new_reflection_right: f64,
    new_reflection_nose: f64,

    nose_r: Vec<f64>,
    nose_l: Vec<f64>,
    nose_junction_output_r: Vec<f64>,
    nose_junction_output_l: Vec<f64>,
    nose_reflection: Vec<f64>,
    nose_diameter: Vec<f64>,
    nose_area: Vec<f64>,
    nose_max_amplitude: Vec<f64>,

    last_obstruction: Option<usize>,
    transients: TransientPool,
    turbulence: Option<TurbulenceSource>,

    lip_output: f64,
    nose_output: f64,
}

impl TractWaveguide {
    pub fn new(segments: usize, sample_rate: f64, nasal_enabled: bool) -> TractResult<Self> {
        let layout = TractLayout::new(segments)?;
        let n = layout.segments;
        let nose_length = layout.nose_length;

        let nose_diameter: Vec<f64> = (0..nose_length)
            .map(|i| {
                let d = 2.0 * (i as f64 / nose_length as f64);
                let diam = if d < 1.0 {
                    0.4 + 1.6 * d
                } else {
                    0.5 + 1.5 * (2.0 - d)
                };
                diam.min(1.9)
            })
            .collect();

        let mut tract = Self {
            geometry: TractGeometry::neutral(layout),
            step_rate: sample_rate,
            nasal_enabled,
            r: vec![0.0; n],
            l: vec![0.0; n],
            reflection: vec![0.0; n + 1],
            new_reflection: vec![0.0; n + 1],
            junction_output_r: vec![0.0; n + 1],
            junction_output_l: vec![0.0; n + 1],
            area: vec![0.0; n],
            max_amplitude: vec![0.0; n],
            reflection_left: 0.0,
            reflection_right: 0.0,
            reflection_nose: 0.0,
            new_reflection_left: 0.0,
            new_reflection_right: 0.0,
            new_reflection_nose: 0.0,
            nose_r: vec![0.0; nose_length],
            nose_l: vec![0.0; nose_length],
            nose_junction_output_r: vec![0.0; nose_length + 1],
            nose_junction_output_l: vec![0.0; nose_length + 1],
            nose_reflection: vec![0.0; nose_length + 1],
            nose_diameter,
            nose_area: vec![0.0; nose_length],
            nose_max_amplitude: vec![0.0; nose_length],
            last_obstruction: None,
            transients: TransientPool::new(),
            turbulence: None,
            lip_output: 0.0,
            nose_output: 0.0,
        };

        tract.nose_diameter[0] = if nasal_enabled { VELUM_CLOSED } else { 0.0 };
        tract.sync_reflections();

        tracing::debug!(
            segments = n,
            blade_start = layout.blade_start,
            tip_start = layout.tip_start,
            lip_start = layout.lip_start,
            nose_start = layout.nose_start,
            nose_length,
            nasal_enabled,
            "tract waveguide constructed"
        );

        Ok(tract)
    }

    /// Rate at which `run_step` is called, per output-rate step pair.
    pub fn set_step_rate(&mut self, step_rate: f64) {
        if step_rate.is_finite() && step_rate > 0.0 {
            self.step_rate = step_rate;
        }
    }

    pub fn layout(&self) -> &TractLayout {
        self.geometry.layout()
    }

    pub fn geometry(&self) -> &TractGeometry {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut TractGeometry {
        &mut self.geometry
    }

    /// Recompute reflections from the current geometry and make the old
    /// snapshot equal to the new one, so the next block does not glide.
    pub fn sync_reflections(&mut self) {
        self.calculate_reflections();
        self.calculate_reflections();
    }

    fn calculate_reflections(&mut self) {
        let n = self.geometry.segments();

        for (a, d) in self.area.iter_mut().zip(&self.geometry.diameter) {
            *a = d * d;
        }
        for i in 1..n {
            self.reflection[i] = self.new_reflection[i];
            self.new_reflection[i] = if self.area[i].abs() < AREA_EPSILON {
                CLOSED_REFLECTION
            } else {
                (self.area[i - 1] - self.area[i]) / (self.area[i - 1] + self.area[i])
            };
        }

        for (a, d) in self.nose_area.iter_mut().zip(&self.nose_diameter) {
            *a = d * d;
        }
        for i in 1..self.nose_area.len() {
            self.nose_reflection[i] = if self.nose_area[i].abs() < AREA_EPSILON {
                CLOSED_REFLECTION
            } else {
                (self.nose_area[i - 1] - self.nose_area[i])
                    / (self.nose_area[i - 1] + self.nose_area[i])
            };
        }

        // Three-way junction with the nose
        let ns = self.geometry.layout.nose_start;
        self.reflection_left = self.new_reflection_left;
        self.reflection_right = self.new_reflection_right;
        self.reflection_nose = self.new_reflection_nose;

        let sum = (self.area[ns] + self.area[ns + 1] + self.nose_area[0]).max(AREA_EPSILON);
        self.new_reflection_left = (2.0 * self.area[ns] - sum) / sum;
        self.new_reflection_right = (2.0 * self.area[ns + 1] - sum) / sum;
        self.new_reflection_nose = (2.0 * self.nose_area[0] - sum) / sum;
    }

    /// Reflection at junction `i`, blended between the previous and current
    /// block by `lambda`.
    #[inline]
    pub fn interpolated_reflection(&self, i: usize, lambda: f64) -> f64 {
        self.reflection[i] * (1.0 - lambda) + self.new_reflection[i] * lambda
    }

    /// Advance the waveguide by one step.
    pub fn run_step(&mut self, glottal_output: f64, turbulence_noise: f64, lambda: f64) {
        let n = self.geometry.segments();

        // Age and inject release transients
        let dt = 1.0 / (self.step_rate * 2.0);
        let (r, l) = (&mut self.r, &mut self.l);
        self.transients.process(dt, |position, amplitude| {
            r[position] += amplitude / 2.0;
            l[position] += amplitude / 2.0;
        });

        if let Some(source) = self.turbulence {
            if source.index >= 2.0
                && source.index <= n as f64
                && source.diameter > 0.0
                && source.intensity > 0.0
            {
                self.add_turbulence_noise_at_index(
                    TURBULENCE_GAIN * turbulence_noise * source.intensity,
                    source.index,
                    source.diameter,
                );
            }
        }

        self.junction_output_r[0] = self.l[0] * GLOTTAL_REFLECTION + glottal_output;
        self.junction_output_l[n] = self.r[n - 1] * LIP_REFLECTION;

        for i in 1..n {
            let r = self.interpolated_reflection(i, lambda);
            let w = r * (self.r[i - 1] + self.l[i]);
            self.junction_output_r[i] = self.r[i - 1] - w;
            self.junction_output_l[i] = self.l[i] + w;
        }

        // Nose junction
        let i = self.geometry.layout.nose_start;
        let one_minus_lambda = 1.0 - lambda;

        let r = self.reflection_left * one_minus_lambda + self.new_reflection_left * lambda;
        self.junction_output_l[i] = r * self.r[i - 1] + (1.0 + r) * (self.nose_l[0] + self.l[i]);

        let r = self.reflection_right * one_minus_lambda + self.new_reflection_right * lambda;
        self.junction_output_r[i] = r * self.l[i] + (1.0 + r) * (self.r[i - 1] + self.nose_l[0]);

        let r = self.reflection_nose * one_minus_lambda + self.new_reflection_nose * lambda;
        self.nose_junction_output_r[0] = r * self.nose_l[0] + (1.0 + r) * (self.l[i] + self.r[i - 1]);

        for i in 0..n {
            self.r[i] = self.junction_output_r[i] * WALL_LOSS;
            self.l[i] = self.junction_output_l[i + 1] * WALL_LOSS;

            let amplitude = (self.r[i] + self.l[i]).abs();
            self.max_amplitude[i] = amplitude.max(self.max_amplitude[i] * AMPLITUDE_DECAY);
        }

        self.lip_output = self.r[n - 1];

        if self.nasal_enabled {
            self.run_nose_step();
        }
    }

    fn run_nose_step(&mut self) {
        let len = self.geometry.layout.nose_length;

        self.nose_junction_output_l[len] = self.nose_r[len - 1] * LIP_REFLECTION;

        for i in 1..len {
            let w = self.nose_reflection[i] * (self.nose_r[i - 1] + self.nose_l[i]);
            self.nose_junction_output_r[i] = self.nose_r[i - 1] - w;
            self.nose_junction_output_l[i] = self.nose_l[i] + w;
        }

        for i in 0..len {
            self.nose_r[i] = self.nose_junction_output_r[i] * NOSE_FADE;
            self.nose_l[i] = self.nose_junction_output_l[i + 1] * NOSE_FADE;

            let amplitude = (self.nose_r[i] + self.nose_l[i]).abs();
            self.nose_max_amplitude[i] = amplitude.max(self.nose_max_amplitude[i] * AMPLITUDE_DECAY);
        }

        self.nose_output = self.nose_r[len - 1];
    }

    /// Inject frication noise at a fractional index, gated by how narrow
    /// (but not fully closed) the constriction is.
    pub fn add_turbulence_noise_at_index(&mut self, noise: f64, index: f64, diameter: f64) {
        if !index.is_finite() || index < 0.0 {
            return;
        }
        let i = index.floor() as usize;
        if i + 2 >= self.geometry.segments() {
            return;
        }
        let delta = index - i as f64;

        let thinness = saturate(8.0 * (0.7 - diameter));
        let openness = saturate(30.0 * (diameter - 0.3));
        let noise0 = noise * (1.0 - delta) * thinness * openness;
        let noise1 = noise * delta * thinness * openness;

        self.r[i + 1] += noise0 / 2.0;
        self.l[i + 1] += noise0 / 2.0;
        self.r[i + 2] += noise1 / 2.0;
        self.l[i + 2] += noise1 / 2.0;
    }

    pub fn set_turbulence(&mut self, source: Option<TurbulenceSource>) {
        self.turbulence = source;
    }

    pub fn turbulence(&self) -> Option<TurbulenceSource> {
        self.turbulence
    }

    /// Block-rate update: move the geometry, detect releases, recompute
    /// reflections. `block_time` is the block duration in seconds.
    pub fn finish_block(&mut self, block_time: f64) {
        self.reshape(block_time);
        self.calculate_reflections();
    }

    fn reshape(&mut self, delta_time: f64) {
        let amount = delta_time * MOVEMENT_SPEED;
        let layout = self.geometry.layout;
        let mut new_last_obstruction = None;

        let geometry = &mut self.geometry;
        for (i, (diameter, &target)) in geometry
            .diameter
            .iter_mut()
            .zip(&geometry.target_diameter)
            .enumerate()
        {
            if *diameter <= 0.0 {
                new_last_obstruction = Some(i);
            }
            let slow_return = if i < layout.nose_start {
                0.6
            } else if i >= layout.tip_start {
                1.0
            } else {
                0.6 + 0.4 * (i - layout.nose_start) as f64
                    / (layout.tip_start - layout.nose_start) as f64
            };
            *diameter = move_towards(*diameter, target, slow_return * amount, 2.0 * amount);
        }

        if let (Some(position), None) = (self.last_obstruction, new_last_obstruction) {
            if self.nose_area[0] < SEALED_NOSE_AREA {
                let outcome = self.transients.spawn(Transient::release(position));
                match outcome {
                    SpawnOutcome::Added => tracing::trace!(position, "release transient"),
                    SpawnOutcome::Restarted => tracing::trace!(position, "release transient restarted"),
                    SpawnOutcome::Replaced => {
                        tracing::trace!(position, "transient pool full, replaced oldest")
                    }
                }
            }
        }
        self.last_obstruction = new_last_obstruction;

        if self.nasal_enabled {
            self.nose_diameter[0] = move_towards(
                self.nose_diameter[0],
                self.geometry.velum_target,
                amount * 0.25,
                amount * 0.1,
            );
        }
        self.nose_area[0] = self.nose_diameter[0] * self.nose_diameter[0];
    }

    /// Mouth contribution of the last step.
    pub fn lip_output(&self) -> f64 {
        self.lip_output
    }

    /// Nose contribution of the last step (zero with the nose disabled).
    pub fn nose_output(&self) -> f64 {
        self.nose_output
    }

    pub fn nasal_enabled(&self) -> bool {
        self.nasal_enabled
    }

    pub fn right_wave(&self) -> &[f64] {
        &self.r
    }

    pub fn left_wave(&self) -> &[f64] {
        &self.l
    }

    pub fn nose_right_wave(&self) -> &[f64] {
        &self.nose_r
    }

    pub fn nose_left_wave(&self) -> &[f64] {
        &self.nose_l
    }

    pub fn reflections(&self) -> &[f64] {
        &self.reflection
    }

    pub fn new_reflections(&self) -> &[f64] {
        &self.new_reflection
    }

    /// Current (left, right, nose) reflections at the nose junction.
    pub fn nose_junction_reflections(&self) -> (f64, f64, f64) {
        (
            self.new_reflection_left,
            self.new_reflection_right,
            self.new_reflection_nose,
        )
    }

    pub fn area(&self) -> &[f64] {
        &self.area
    }

    pub fn nose_diameter(&self) -> &[f64] {
        &self.nose_diameter
    }

    pub fn velum_opening(&self) -> f64 {
        self.nose_diameter[0]
    }

    /// Peak-hold amplitude per main-tract segment.
    pub fn max_amplitude(&self) -> &[f64] {
        &self.max_amplitude
    }

    /// Peak-hold amplitude per nasal segment.
    pub fn nose_max_amplitude(&self) -> &[f64] {
        &self.nose_max_amplitude
    }

    pub fn transients(&self) -> &TransientPool {
        &self.transients
    }

    pub fn last_obstruction(&self) -> Option<usize> {
        self.last_obstruction
    }
}
