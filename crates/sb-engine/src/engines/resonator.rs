//! Resonator bank: Karplus-Strong strings and four-partial modal voices.
//!
//! Every derived value is a pure function of the genome, the selected modal
//! preset and the damping range.

use sb_ir::rng::uniform01;
use sb_ir::units::semitones_to_ratio;
use sb_ir::{clamp01, ResonatorMode, SeedGenome};

use crate::voice_pool::{VoiceIndex, VoicePool, VoiceSlot};

pub const RESONATOR_VOICES: usize = 16;
pub const MODAL_PARTIALS: usize = 4;

/// A2 reference pitch for semitone 0.
const BASE_HZ: f32 = 110.0;
const MIN_BURST_MS: f32 = 0.25;
const DEFAULT_DAMPING_RANGE: (f32, f32) = (0.25, 0.9);

/// Static partial layout blended with per-seed brightness and feedback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModalPreset {
    pub name: &'static str,
    pub mode_ratios: [f32; MODAL_PARTIALS],
    pub mode_gains: [f32; MODAL_PARTIALS],
    pub base_brightness: f32,
    pub base_feedback: f32,
}

pub const MODAL_PRESETS: [ModalPreset; 6] = [
    ModalPreset {
        name: "Brass shell",
        mode_ratios: [1.0, 2.01, 2.55, 3.9],
        mode_gains: [1.0, 0.62, 0.48, 0.3],
        base_brightness: 0.55,
        base_feedback: 0.82,
    },
    ModalPreset {
        name: "Glass harp",
        mode_ratios: [1.0, 1.5, 2.5, 3.5],
        mode_gains: [0.9, 0.7, 0.5, 0.35],
        base_brightness: 0.7,
        base_feedback: 0.74,
    },
    ModalPreset {
        name: "Kalimba tine",
        mode_ratios: [1.0, 2.0, 3.0, 4.2],
        mode_gains: [1.0, 0.5, 0.35, 0.2],
        base_brightness: 0.45,
        base_feedback: 0.68,
    },
    ModalPreset {
        name: "Chime tree",
        mode_ratios: [1.0, 2.63, 3.91, 5.02],
        mode_gains: [0.95, 0.55, 0.4, 0.32],
        base_brightness: 0.8,
        base_feedback: 0.86,
    },
    ModalPreset {
        name: "Aluminum bar",
        mode_ratios: [1.0, 3.0, 5.8, 9.2],
        mode_gains: [1.0, 0.52, 0.38, 0.24],
        base_brightness: 0.6,
        base_feedback: 0.9,
    },
    ModalPreset {
        name: "Detuned duo",
        mode_ratios: [1.0, 1.01, 1.98, 2.97],
        mode_gains: [0.95, 0.92, 0.7, 0.55],
        base_brightness: 0.5,
        base_feedback: 0.8,
    },
];

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Bank index after wrapping into the preset table.
pub fn preset_index(bank: u8) -> usize {
    usize::from(bank) % MODAL_PRESETS.len()
}

/// Excitation and partial parameters for one resonator voice.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ResonatorVoice {
    pub frequency: f32,
    pub burst_ms: f32,
    pub damping: f32,
    pub brightness: f32,
    pub feedback: f32,
    pub burst_gain: f32,
    pub delay_samples: f32,
    pub modal_frequencies: [f32; MODAL_PARTIALS],
    pub modal_gains: [f32; MODAL_PARTIALS],
    pub mode: ResonatorMode,
    /// Wrapped preset index
    pub bank: u8,
    /// Genome RNG cursor after the per-trigger advance
    pub seed_prng: u32,
}

#[derive(Clone, Debug)]
pub struct ResonatorEngine {
    pool: VoicePool<ResonatorVoice, RESONATOR_VOICES>,
    min_damping: f32,
    max_damping: f32,
    sample_rate: u32,
}

impl ResonatorEngine {
    pub fn new(max_voices: usize, sample_rate: u32) -> Self {
        Self {
            pool: VoicePool::with_limit(max_voices),
            min_damping: DEFAULT_DAMPING_RANGE.0,
            max_damping: DEFAULT_DAMPING_RANGE.1,
            sample_rate,
        }
    }

    /// Limit polyphony (clamped to `1..=16`).
    pub fn set_max_voices(&mut self, voices: usize) {
        self.pool.set_limit(voices);
    }

    pub fn max_voices(&self) -> usize {
        self.pool.limit()
    }

    /// Set the damping range; the bounds may come in either order.
    pub fn set_damping_range(&mut self, a: f32, b: f32) {
        if !(a.is_finite() && b.is_finite()) {
            return;
        }
        self.min_damping = a.min(b);
        self.max_damping = a.max(b);
    }

    pub fn damping_range(&self) -> (f32, f32) {
        (self.min_damping, self.max_damping)
    }

    pub fn preset_name(&self, bank: u8) -> &'static str {
        MODAL_PRESETS[preset_index(bank)].name
    }

    /// Derive voice parameters for `genome`.
    pub fn derive(&self, genome: &SeedGenome) -> ResonatorVoice {
        let params = &genome.resonator;
        let bank = preset_index(params.bank);
        let preset = &MODAL_PRESETS[bank];

        let frequency = BASE_HZ * semitones_to_ratio(genome.pitch_semitones);
        let damping = lerp(self.min_damping, self.max_damping, clamp01(params.damping));
        let brightness = clamp01(lerp(preset.base_brightness, clamp01(params.brightness), 0.7));
        let feedback = clamp01(lerp(preset.base_feedback, clamp01(params.feedback), 0.65));
        let delay_samples = (self.sample_rate as f32 / frequency.max(10.0)).max(1.0);

        let span = (self.max_damping - self.min_damping).max(0.0001);
        let damping_comp = 1.0 - (damping - self.min_damping) / span;
        let burst_gain = lerp(0.45, 1.25, brightness) * lerp(0.5, 1.0, damping_comp);

        let emphasis = lerp(0.6, 1.4, brightness);
        let mut modal_frequencies = [0.0; MODAL_PARTIALS];
        let mut modal_gains = [0.0; MODAL_PARTIALS];
        for i in 0..MODAL_PARTIALS {
            modal_frequencies[i] = frequency * preset.mode_ratios[i];
            modal_gains[i] = clamp01(preset.mode_gains[i] * emphasis * (1.0 - 0.1 * i as f32));
        }

        // Advanced once per trigger; the drawn value is not used yet.
        let mut prng = genome.rng_state;
        let _ = uniform01(&mut prng);

        ResonatorVoice {
            frequency,
            burst_ms: params.excite_ms.max(MIN_BURST_MS),
            damping,
            brightness,
            feedback,
            burst_gain,
            delay_samples,
            modal_frequencies,
            modal_gains,
            mode: params.mode,
            bank: bank as u8,
            seed_prng: prng,
        }
    }

    pub fn trigger(&mut self, genome: &SeedGenome, when_samples: u32) -> VoiceIndex {
        let voice = self.derive(genome);
        self.pool.allocate(when_samples, genome.id, voice)
    }

    pub fn voice(&self, index: usize) -> VoiceSlot<ResonatorVoice> {
        self.pool.voice(index)
    }

    pub fn active_voice_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn panic(&mut self) {
        self.pool.release_all();
    }
}
