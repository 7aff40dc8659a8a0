use crate::{
    config::{normalize_downsampling, EngineConfig, VoiceParams},
    dsp::{
        filter::{BandPass, NoiseShaper},
        glottis::GlottalSource,
        noise::WhiteNoise,
        shaper::{Touch, TractShaper},
        tract::TractWaveguide,
    },
    error::TractResult,
    synth::message::{MessageReceiver, VoiceMessage},
};

/// One synthesis session: glottis, tract and articulators rendered together.
///
/// Audio is produced in blocks of at most `block_size` frames. Inside a
/// block every simulated frame runs the glottis once and the waveguide
/// twice; after the block the components are updated in the order glottis,
/// shaper, tract, so the tract always moves toward the shaper's latest
/// targets.
pub struct VoiceEngine {
    config: EngineConfig,
    sample_rate: f64,

    glottis: GlottalSource,
    tract: TractWaveguide,
    shaper: TractShaper,

    aspiration: BandPass,
    fricative: BandPass,
    white: WhiteNoise,

    downsampling: u32,
    frame_counter: u64,
    held_sample: f64,
}

impl VoiceEngine {
    pub fn new(config: EngineConfig) -> TractResult<Self> {
        let layout = config.validate()?;
        let sample_rate = config.sample_rate as f64;
        let downsampling = normalize_downsampling(config.downsampling);
        let step_rate = sample_rate / downsampling as f64;

        let glottis = GlottalSource::new(step_rate, config.noise_seed);
        let mut tract = TractWaveguide::new(layout.segments, step_rate, config.nasal_enabled)?;
        let shaper = TractShaper::new(layout);

        // Start from the articulated shape rather than gliding into it
        let geometry = tract.geometry_mut();
        shaper.set_rest_diameter(geometry);
        geometry.target_diameter.copy_from_slice(&geometry.rest_diameter);
        geometry.diameter.copy_from_slice(&geometry.rest_diameter);
        tract.sync_reflections();

        tracing::debug!(
            sample_rate = config.sample_rate,
            segments = layout.segments,
            block_size = config.block_size,
            downsampling,
            nasal = config.nasal_enabled,
            "voice engine ready"
        );

        Ok(Self {
            aspiration: BandPass::from_settings(step_rate, config.aspiration_band),
            fricative: BandPass::from_settings(step_rate, config.fricative_band),
            white: WhiteNoise::new(config.noise_seed),
            config,
            sample_rate,
            glottis,
            tract,
            shaper,
            downsampling,
            frame_counter: 0,
            held_sample: 0.0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    pub fn downsampling(&self) -> u32 {
        self.downsampling
    }

    pub fn glottis(&self) -> &GlottalSource {
        &self.glottis
    }

    pub fn tract(&self) -> &TractWaveguide {
        &self.tract
    }

    pub fn shaper(&self) -> &TractShaper {
        &self.shaper
    }

    /// Render `out`, drawing white noise from the engine's own generator.
    pub fn render(&mut self, out: &mut [f32]) {
        self.render_blocks(out, WhiteNoise::next_sample);
    }

    /// Render `out` with caller-supplied white noise: one uniform sample in
    /// `[0, 1)` per simulated frame, the same draw [`VoiceEngine::render`]
    /// makes. Passing `|| 0.0` renders the voiced
    /// signal only, which is fully deterministic.
    pub fn render_with(&mut self, out: &mut [f32], mut noise: impl FnMut() -> f64) {
        self.render_blocks(out, |_| noise());
    }

    /// Pop every pending control message, then render.
    pub fn process<R: MessageReceiver>(&mut self, rx: &mut R, out: &mut [f32]) {
        self.drain_messages(rx);
        self.render(out);
    }

    fn render_blocks(&mut self, out: &mut [f32], mut noise: impl FnMut(&mut WhiteNoise) -> f64) {
        for block in out.chunks_mut(self.config.block_size) {
            self.render_block(block, &mut noise);
            self.finish_block(block.len());
        }
    }

    fn render_block(&mut self, out: &mut [f32], noise: &mut impl FnMut(&mut WhiteNoise) -> f64) {
        let len = out.len() as f64;
        let gain = self.config.output_gain as f64;
        let hold = self.downsampling as u64;

        for (j, sample) in out.iter_mut().enumerate() {
            if self.frame_counter % hold == 0 {
                let lambda1 = j as f64 / len;
                let lambda2 = (j as f64 + 0.5) / len;

                let white = noise(&mut self.white);
                let aspiration = self.aspiration.process(white);
                let fricative = self.fricative.process(white);

                let glottal = self.glottis.run_step(lambda1, aspiration);
                let turbulence = fricative * self.glottis.noise_modulator();

                self.tract.run_step(glottal, turbulence, lambda1);
                let mut vocal = self.tract.lip_output() + self.tract.nose_output();
                self.tract.run_step(glottal, turbulence, lambda2);
                vocal += self.tract.lip_output() + self.tract.nose_output();

                self.held_sample = vocal * gain;
            }

            *sample = self.held_sample as f32;
            self.frame_counter += 1;
        }
    }

    fn finish_block(&mut self, frames: usize) {
        self.glottis.finish_block();
        let turbulence = self.shaper.finish_block(self.tract.geometry_mut());
        self.tract.set_turbulence(turbulence);
        self.tract.finish_block(frames as f64 / self.sample_rate);
    }

    pub fn drain_messages<R: MessageReceiver>(&mut self, rx: &mut R) {
        while let Some(msg) = rx.pop() {
            self.apply(msg);
        }
    }

    pub fn apply(&mut self, msg: VoiceMessage) {
        match msg {
            VoiceMessage::SetFrequency(hz) => self.set_frequency(hz),
            VoiceMessage::SetTenseness(t) => self.set_tenseness(t),
            VoiceMessage::SetVibratoAmount(a) => self.set_vibrato_amount(a),
            VoiceMessage::SetLoudness(l) => self.set_loudness(l),
            VoiceMessage::SetAutoWobble(on) => self.set_auto_wobble(on),
            VoiceMessage::SetPitchVariance(on) => self.set_pitch_variance(on),
            VoiceMessage::SetTensenessVariance(on) => self.set_tenseness_variance(on),
            VoiceMessage::SetTouched(on) => self.set_touched(on),
            VoiceMessage::SetLipClosure(p) => self.set_lip_closure(p),
            VoiceMessage::SetTongueTarget { index, diameter } => {
                self.set_tongue_target(index, diameter)
            }
            VoiceMessage::SetConstriction {
                index,
                radius,
                target_diameter,
            } => self.set_constriction(index, radius, target_diameter),
            VoiceMessage::SetVelumOpen(open) => self.set_velum_open(open),
            VoiceMessage::TongueTouch(touch) => self.set_tongue_touch(touch),
            VoiceMessage::ConstrictionTouch(touch) => self.set_constriction_touch(touch),
            VoiceMessage::SetDownsampling(factor) => self.set_downsampling_factor(factor),
        }
    }

    pub fn set_frequency(&mut self, hz: f64) {
        if warn_non_finite("frequency", hz) {
            self.glottis.set_frequency(hz);
        }
    }

    pub fn set_tenseness(&mut self, tenseness: f64) {
        if warn_non_finite("tenseness", tenseness) {
            self.glottis.set_tenseness(tenseness);
        }
    }

    pub fn set_vibrato_amount(&mut self, amount: f64) {
        if warn_non_finite("vibrato amount", amount) {
            self.glottis.set_vibrato_amount(amount);
        }
    }

    pub fn set_loudness(&mut self, loudness: f64) {
        if warn_non_finite("loudness", loudness) {
            self.glottis.set_loudness(loudness);
        }
    }

    pub fn set_auto_wobble(&mut self, enabled: bool) {
        self.glottis.set_auto_wobble(enabled);
    }

    pub fn set_pitch_variance(&mut self, enabled: bool) {
        self.glottis.set_pitch_variance(enabled);
    }

    pub fn set_tenseness_variance(&mut self, enabled: bool) {
        self.glottis.set_tenseness_variance(enabled);
    }

    /// Sustain the voice (`true`) or let it fade out (`false`).
    pub fn set_touched(&mut self, touched: bool) {
        self.glottis.set_touched(touched);
    }

    pub fn set_lip_closure(&mut self, progress: f64) {
        self.shaper.set_lips_closed(self.tract.geometry_mut(), progress);
    }

    pub fn set_tongue_target(&mut self, index: f64, diameter: f64) {
        self.shaper.set_tongue_target(index, diameter);
    }

    pub fn set_constriction(&mut self, index: f64, radius: f64, target_diameter: f64) {
        self.shaper.set_constriction(index, radius, target_diameter);
    }

    pub fn set_velum_open(&mut self, open: bool) {
        self.shaper.set_velum_open(open);
    }

    pub fn set_tongue_touch(&mut self, touch: Option<Touch>) {
        self.shaper.set_tongue_touch(touch);
    }

    pub fn set_constriction_touch(&mut self, touch: Option<Touch>) {
        self.shaper.set_constriction_touch(touch);
    }

    /// Simulate only every `factor`-th frame (rounded up to a power of two
    /// in `1..=16`) and hold the result in between.
    pub fn set_downsampling_factor(&mut self, factor: u32) {
        let factor = normalize_downsampling(factor);
        if factor == self.downsampling {
            return;
        }
        self.downsampling = factor;

        let step_rate = self.sample_rate / factor as f64;
        self.glottis.set_step_rate(step_rate);
        self.tract.set_step_rate(step_rate);
        self.aspiration = BandPass::from_settings(step_rate, self.config.aspiration_band);
        self.fricative = BandPass::from_settings(step_rate, self.config.fricative_band);

        tracing::debug!(factor, step_rate, "downsampling changed");
    }

    /// Apply a stored parameter snapshot.
    pub fn apply_params(&mut self, params: &VoiceParams) {
        self.set_frequency(params.frequency);
        self.set_tenseness(params.tenseness);
        self.set_vibrato_amount(params.vibrato_amount);
        self.set_loudness(params.loudness);
        self.set_auto_wobble(params.auto_wobble);
        self.set_pitch_variance(params.pitch_variance);
        self.set_tenseness_variance(params.tenseness_variance);
        self.set_tongue_target(params.tongue_index, params.tongue_diameter);
        self.set_velum_open(params.velum_open);
        self.set_lip_closure(params.lip_closure);
    }

    /// Snapshot the current scalar controls.
    pub fn params(&self) -> VoiceParams {
        VoiceParams {
            frequency: self.glottis.target_frequency(),
            tenseness: self.glottis.target_tenseness(),
            vibrato_amount: self.glottis.vibrato_amount(),
            loudness: self.glottis.loudness(),
            auto_wobble: self.glottis.auto_wobble(),
            pitch_variance: self.glottis.pitch_variance(),
            tenseness_variance: self.glottis.tenseness_variance(),
            tongue_index: self.shaper.tongue_index(),
            tongue_diameter: self.shaper.tongue_diameter(),
            lip_closure: self.shaper.lip_closure(),
            velum_open: self.shaper.velum_open(),
        }
    }
}

fn warn_non_finite(name: &'static str, value: f64) -> bool {
    if value.is_finite() {
        true
    } else {
        tracing::warn!(parameter = name, value, "ignoring non-finite control value");
        false
    }
}
