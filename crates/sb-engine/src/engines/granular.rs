//! Granular engine: grain plans from live input or registered SD clips.
//!
//! Each trigger plans one grain voice. Spray shifts the grain start by a
//! signed random offset drawn from a copy of the genome's RNG cursor; the
//! advanced cursor is kept on the voice so a renderer can continue the
//! sequence. Statistics are derived from the voice table on demand.

use heapless::String;
use sb_ir::rng::uniform_signed;
use sb_ir::units::{ms_to_samples, semitones_to_ratio};
use sb_ir::{encoded_granular_source, GranularSource, SeedGenome, GRANULAR_SOURCE_SLOTS};
use tracing::{debug, warn};

use crate::stereo::constant_power_width;
use crate::voice_pool::{VoiceIndex, VoicePool, VoiceSlot};

pub const GRANULAR_VOICES: usize = 40;
pub const SD_CLIP_SLOTS: usize = GRANULAR_SOURCE_SLOTS as usize;
pub const MIXER_FAN_IN: usize = 4;
pub const MIXER_GROUPS: usize = GRANULAR_VOICES.div_ceil(MIXER_FAN_IN);
pub const CLIP_NAME_LEN: usize = 32;
pub const HISTOGRAM_BINS: usize = 6;

/// Upper bin edges (exclusive, ms); the last bin is open-ended.
const GRAIN_SIZE_EDGES: [f32; HISTOGRAM_BINS - 1] = [10.0, 30.0, 60.0, 120.0, 200.0];
const SPRAY_EDGES: [f32; HISTOGRAM_BINS - 1] = [1.0, 5.0, 10.0, 25.0, 50.0];

pub type ClipName = String<CLIP_NAME_LEN>;

/// Planned grain parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GrainVoice {
    pub playback_rate: f32,
    pub size_ms: f32,
    pub spray_ms: f32,
    pub window_skew: f32,
    pub stereo_spread: f32,
    pub left_gain: f32,
    pub right_gain: f32,
    /// Resolved source
    pub source: GranularSource,
    /// Resolved clip slot; 0 is the live-input alias
    pub sd_slot: u8,
    /// Genome RNG cursor after the spray draw
    pub seed_prng: u32,
}

/// Read-only diagnostics over the active voices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GranularStats {
    pub active_voice_count: u8,
    pub sd_only_voice_count: u8,
    /// Grains planned since construction
    pub grains_planned: u32,
    pub grain_size_histogram: [u16; HISTOGRAM_BINS],
    pub spray_histogram: [u16; HISTOGRAM_BINS],
    pub mixer_group_load: [u8; MIXER_GROUPS],
    pub busiest_mixer_load: u8,
    pub mixer_groups_engaged: u8,
}

fn histogram_bin(value: f32, edges: &[f32]) -> usize {
    edges.iter().position(|&edge| value < edge).unwrap_or(edges.len())
}

#[derive(Clone, Debug)]
pub struct GranularEngine {
    pool: VoicePool<GrainVoice, GRANULAR_VOICES>,
    live_input_armed: bool,
    /// Slot 0 is never populated; it stands for live input.
    clips: [Option<ClipName>; SD_CLIP_SLOTS],
    sample_rate: u32,
    grains_planned: u32,
}

impl GranularEngine {
    pub fn new(max_voices: usize, sample_rate: u32) -> Self {
        Self {
            pool: VoicePool::with_limit(max_voices),
            live_input_armed: true,
            clips: Default::default(),
            sample_rate,
            grains_planned: 0,
        }
    }

    /// Limit polyphony (clamped to `1..=40`).
    pub fn set_max_active_voices(&mut self, voices: usize) {
        self.pool.set_limit(voices);
    }

    pub fn max_active_voices(&self) -> usize {
        self.pool.limit()
    }

    pub fn arm_live_input(&mut self, armed: bool) {
        self.live_input_armed = armed;
    }

    pub fn live_input_armed(&self) -> bool {
        self.live_input_armed
    }

    /// Register a clip in slot 1..=7. Slot 0 is reserved for live input.
    /// Returns false (and changes nothing) for reserved or out-of-range slots.
    /// Names longer than [`CLIP_NAME_LEN`] are truncated.
    pub fn register_sd_clip(&mut self, slot: u8, name: &str) -> bool {
        let index = usize::from(slot);
        if index == 0 || index >= SD_CLIP_SLOTS {
            warn!(slot, "ignoring clip registration for reserved slot");
            return false;
        }
        let mut stored = ClipName::new();
        for c in name.chars() {
            if stored.push(c).is_err() {
                break;
            }
        }
        self.clips[index] = Some(stored);
        true
    }

    pub fn clip_name(&self, slot: u8) -> Option<&str> {
        self.clips
            .get(usize::from(slot))
            .and_then(|c| c.as_ref())
            .map(|c| c.as_str())
    }

    fn first_clip(&self) -> Option<u8> {
        self.clips
            .iter()
            .position(|c| c.is_some())
            .map(|i| i as u8)
    }

    /// Resolve an encoded source index (0 = live, n = clip slot n).
    ///
    /// Live input falls back to the first clip when disarmed; an unregistered
    /// clip falls back to the first registered clip. With no clips at all the
    /// live-input alias is used.
    pub fn resolve_source(&self, requested: u8) -> (GranularSource, u8) {
        if requested == 0 && self.live_input_armed {
            return (GranularSource::LiveInput, 0);
        }
        if self.clip_name(requested).is_some() {
            return (GranularSource::SdClip, requested);
        }
        match self.first_clip() {
            Some(slot) => {
                debug!(requested, slot, "granular source fell back to first clip");
                (GranularSource::SdClip, slot)
            }
            None => (GranularSource::LiveInput, 0),
        }
    }

    /// Plan a grain for `genome` at `when_samples`. Returns the spray-shifted
    /// start and the voice parameters.
    pub fn plan(&self, genome: &SeedGenome, when_samples: u32) -> (u32, GrainVoice) {
        let params = &genome.granular;
        let (source, sd_slot) = self.resolve_source(encoded_granular_source(genome));
        let gains = constant_power_width(params.stereo_spread);

        let mut prng = genome.rng_state;
        let mut start = when_samples;
        if params.spray_ms > 0.0 {
            let spray = uniform_signed(&mut prng) * params.spray_ms;
            let offset = ms_to_samples(libm::fabsf(spray), self.sample_rate);
            start = if spray >= 0.0 {
                start.saturating_add(offset)
            } else {
                start.saturating_sub(offset)
            };
        }

        let voice = GrainVoice {
            playback_rate: semitones_to_ratio(genome.pitch_semitones + params.transpose_semitones),
            size_ms: params.grain_size_ms,
            spray_ms: params.spray_ms,
            window_skew: params.window_skew,
            stereo_spread: params.stereo_spread,
            left_gain: gains.left,
            right_gain: gains.right,
            source,
            sd_slot,
            seed_prng: prng,
        };
        (start, voice)
    }

    /// Plan a grain and allocate it at its spray-shifted start.
    pub fn trigger(&mut self, genome: &SeedGenome, when_samples: u32) -> VoiceIndex {
        let (start, voice) = self.plan(genome, when_samples);
        self.grains_planned = self.grains_planned.wrapping_add(1);
        self.pool.allocate(start, genome.id, voice)
    }

    pub fn voice(&self, index: usize) -> VoiceSlot<GrainVoice> {
        self.pool.voice(index)
    }

    pub fn active_voice_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn stats(&self) -> GranularStats {
        let mut stats = GranularStats {
            grains_planned: self.grains_planned,
            ..GranularStats::default()
        };
        for (index, slot) in self.pool.slots().iter().enumerate() {
            if !slot.active {
                continue;
            }
            let v = &slot.params;
            stats.active_voice_count += 1;
            if v.source == GranularSource::SdClip {
                stats.sd_only_voice_count += 1;
            }
            stats.grain_size_histogram[histogram_bin(v.size_ms, &GRAIN_SIZE_EDGES)] += 1;
            stats.spray_histogram[histogram_bin(v.spray_ms, &SPRAY_EDGES)] += 1;
            stats.mixer_group_load[index / MIXER_FAN_IN] += 1;
        }
        stats.busiest_mixer_load = stats.mixer_group_load.iter().copied().max().unwrap_or(0);
        stats.mixer_groups_engaged = stats.mixer_group_load.iter().filter(|&&l| l > 0).count() as u8;
        stats
    }

    pub fn panic(&mut self) {
        self.pool.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_ir::GranularParams;

    fn clip_seed(id: u32, size_ms: f32, spray_ms: f32, slot: u8) -> SeedGenome {
        SeedGenome {
            id,
            rng_state: 0xCAFE_0000 + id,
            granular: GranularParams {
                source: GranularSource::SdClip,
                sd_slot: slot,
                grain_size_ms: size_ms,
                spray_ms,
                window_skew: 0.0,
                stereo_spread: 0.5,
                ..GranularParams::default()
            },
            ..SeedGenome::default()
        }
    }

    fn engine() -> GranularEngine {
        GranularEngine::new(12, 48_000)
    }

    // === Sources ===

    #[test]
    fn slot_zero_is_reserved() {
        let mut e = engine();
        assert!(!e.register_sd_clip(0, "nope"));
        assert!(!e.register_sd_clip(8, "nope"));
        assert!(e.register_sd_clip(3, "kick.raw"));
        assert_eq!(e.clip_name(3), Some("kick.raw"));
        assert_eq!(e.clip_name(0), None);
    }

    #[test]
    fn live_input_falls_back_when_disarmed() {
        let mut e = engine();
        e.register_sd_clip(5, "pad.raw");
        assert_eq!(e.resolve_source(0), (GranularSource::LiveInput, 0));
        e.arm_live_input(false);
        assert_eq!(e.resolve_source(0), (GranularSource::SdClip, 5));
    }

    #[test]
    fn unregistered_clip_uses_first_populated() {
        let mut e = engine();
        e.register_sd_clip(6, "b");
        e.register_sd_clip(2, "a");
        assert_eq!(e.resolve_source(4), (GranularSource::SdClip, 2));
        assert_eq!(e.resolve_source(6), (GranularSource::SdClip, 6));
        assert_eq!(e.resolve_source(200), (GranularSource::SdClip, 2));
    }

    #[test]
    fn no_clips_resolves_to_live_alias() {
        let mut e = engine();
        e.arm_live_input(false);
        assert_eq!(e.resolve_source(3), (GranularSource::LiveInput, 0));
    }

    #[test]
    fn long_clip_names_truncate() {
        let mut e = engine();
        let long = "x".repeat(CLIP_NAME_LEN + 10);
        e.register_sd_clip(1, &long);
        assert_eq!(e.clip_name(1).map(str::len), Some(CLIP_NAME_LEN));
    }

    // === Planning ===

    #[test]
    fn transpose_adds_to_pitch() {
        let mut g = clip_seed(1, 50.0, 0.0, 1);
        g.pitch_semitones = 5.0;
        g.granular.transpose_semitones = 7.0;
        let (_, v) = engine().plan(&g, 0);
        assert!((v.playback_rate - 2.0).abs() < 1e-5);
    }

    #[test]
    fn zero_spray_keeps_start_and_cursor() {
        let g = clip_seed(1, 50.0, 0.0, 1);
        let (start, v) = engine().plan(&g, 1000);
        assert_eq!(start, 1000);
        assert_eq!(v.seed_prng, g.rng_state);
    }

    #[test]
    fn spray_is_deterministic_and_bounded() {
        let e = engine();
        for id in 0..64 {
            let g = clip_seed(id, 50.0, 30.0, 1);
            let (a, va) = e.plan(&g, 10);
            let (b, vb) = e.plan(&g, 10);
            assert_eq!(a, b);
            assert_eq!(va, vb);
            assert_ne!(va.seed_prng, g.rng_state);
            // 30 ms at 48 kHz
            assert!(a <= 10 + 1440);
        }
    }

    #[test]
    fn negative_spray_clamps_at_zero() {
        let e = engine();
        let mut early = 0;
        for id in 0..64 {
            let g = clip_seed(id, 50.0, 30.0, 1);
            let (late, _) = e.plan(&g, 100_000);
            let (start, _) = e.plan(&g, 0);
            if late < 100_000 {
                // Pulled earlier than the trigger: must stop at zero, not wrap.
                early += 1;
                assert_eq!(start, 0, "seed {id}");
            } else {
                assert_eq!(start, late - 100_000, "seed {id}");
            }
        }
        assert!(early > 0);
    }

    // === Stats ===

    #[test]
    fn stats_cover_full_pool() {
        let mut e = engine();
        e.arm_live_input(false);
        e.set_max_active_voices(GRANULAR_VOICES);
        for slot in 1..SD_CLIP_SLOTS as u8 {
            e.register_sd_clip(slot, "clip.raw");
        }
        for i in 0..GRANULAR_VOICES as u32 {
            let size = 5.0 + i as f32 * 6.0;
            let spray = if i % 3 == 0 { 0.25 * i as f32 } else { 2.5 * (i % 5) as f32 };
            let slot = 1 + (i % 7) as u8;
            e.trigger(&clip_seed(i + 1, size, spray, slot), 128 * i);
        }
        let stats = e.stats();
        assert_eq!(usize::from(stats.active_voice_count), e.active_voice_count());
        assert_eq!(stats.grains_planned, GRANULAR_VOICES as u32);
        assert_eq!(stats.sd_only_voice_count, stats.active_voice_count);
        let size_total: u16 = stats.grain_size_histogram.iter().sum();
        let spray_total: u16 = stats.spray_histogram.iter().sum();
        assert_eq!(size_total, u16::from(stats.active_voice_count));
        assert_eq!(spray_total, u16::from(stats.active_voice_count));
        assert!(stats.grain_size_histogram[HISTOGRAM_BINS - 1] > 0);
        assert!(stats.spray_histogram[0] > 0);
    }

    #[test]
    fn reused_voice_drops_sd_count() {
        let mut e = engine();
        e.set_max_active_voices(1);
        e.register_sd_clip(1, "clip.raw");
        let sd = clip_seed(1, 180.0, 45.0, 1);
        e.trigger(&sd, 64);
        let stats = e.stats();
        assert_eq!(stats.active_voice_count, 1);
        assert_eq!(stats.sd_only_voice_count, 1);

        let mut live = sd;
        live.id = 2;
        live.granular.source = GranularSource::LiveInput;
        live.granular.grain_size_ms = 12.0;
        live.granular.spray_ms = 0.5;
        e.trigger(&live, 96);
        let stats = e.stats();
        assert_eq!(stats.active_voice_count, 1);
        assert_eq!(stats.sd_only_voice_count, 0);
        assert_eq!(stats.grains_planned, 2);
    }

    #[test]
    fn mixer_fanout_groups_by_four() {
        let mut e = engine();
        e.set_max_active_voices(MIXER_FAN_IN * 3);
        for slot in 1..4 {
            e.register_sd_clip(slot, "clip.raw");
        }
        let planned = MIXER_FAN_IN * 3;
        for i in 0..planned as u32 {
            e.trigger(&clip_seed(i + 1, 20.0 + 3.0 * i as f32, 1.5 * (i % 5) as f32, 1 + (i % 3) as u8), 32 * i);
        }
        let stats = e.stats();
        assert_eq!(usize::from(stats.active_voice_count), planned);
        assert_eq!(usize::from(stats.busiest_mixer_load), MIXER_FAN_IN);
        assert_eq!(stats.mixer_groups_engaged, 3);
        let total: u32 = stats.mixer_group_load.iter().map(|&l| u32::from(l)).sum();
        assert_eq!(total as usize, planned);
    }

    #[test]
    fn max_voices_is_clamped() {
        let mut e = engine();
        e.set_max_active_voices(0);
        assert_eq!(e.max_active_voices(), 1);
        e.set_max_active_voices(500);
        assert_eq!(e.max_active_voices(), GRANULAR_VOICES);
    }
}
