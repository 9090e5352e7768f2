//! Sample-playback engine: four voices, RAM preload or SD streaming.

use sb_ir::units::semitones_to_ratio;
use sb_ir::{clamp01, SeedGenome};

use crate::stereo::constant_power_width;
use crate::voice_pool::{VoiceIndex, VoicePool, VoiceSlot};

pub const SAMPLER_VOICES: usize = 4;

/// Sample slots below this index are preloaded into RAM; the rest stream.
pub const RAM_PRELOAD_COUNT: u8 = SAMPLER_VOICES as u8;

/// Parameters a renderer needs to play one sampler voice.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SamplerVoice {
    pub sample_slot: u8,
    pub playback_rate: f32,
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
    pub tone: f32,
    pub spread: f32,
    pub left_gain: f32,
    pub right_gain: f32,
    pub uses_sd_streaming: bool,
}

impl SamplerVoice {
    /// Pure mapping from genome to voice parameters.
    pub fn derive(genome: &SeedGenome) -> Self {
        let spread = clamp01(genome.spread);
        let gains = constant_power_width(spread);
        Self {
            sample_slot: genome.sample_slot,
            playback_rate: semitones_to_ratio(genome.pitch_semitones),
            attack: genome.env_attack.max(0.0),
            decay: genome.env_decay.max(0.0),
            sustain: clamp01(genome.env_sustain),
            release: genome.env_release.max(0.0),
            tone: clamp01(genome.tone),
            spread,
            left_gain: gains.left,
            right_gain: gains.right,
            uses_sd_streaming: genome.sample_slot >= RAM_PRELOAD_COUNT,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SamplerEngine {
    pool: VoicePool<SamplerVoice, SAMPLER_VOICES>,
}

impl SamplerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a voice for `genome` starting at `when_samples`, stealing the
    /// oldest when all four are busy. Returns the slot written.
    pub fn trigger(&mut self, genome: &SeedGenome, when_samples: u32) -> VoiceIndex {
        self.pool
            .allocate(when_samples, genome.id, SamplerVoice::derive(genome))
    }

    pub fn voice(&self, index: usize) -> VoiceSlot<SamplerVoice> {
        self.pool.voice(index)
    }

    pub fn active_voice_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn panic(&mut self) {
        self.pool.release_all();
    }
}
