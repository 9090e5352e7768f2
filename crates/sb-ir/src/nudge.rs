//! Performance edits applied to a live genome.

use crate::genome::{GranularSource, SeedGenome};

/// Number of encoded granular sources (0 = live input, 1..=7 = clip slots).
pub const GRANULAR_SOURCE_SLOTS: u8 = 8;

/// Additive deltas from the seed page (encoders or decoded CCs).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SeedNudge {
    pub pitch_semitones: f32,
    pub density_delta: f32,
    pub probability_delta: f32,
    pub jitter_delta_ms: f32,
    pub tone_delta: f32,
    pub spread_delta: f32,
}

impl SeedNudge {
    /// Apply the deltas and re-sanitize the genome.
    pub fn apply(&self, genome: &mut SeedGenome) {
        genome.pitch_semitones += self.pitch_semitones;
        genome.density += self.density_delta;
        genome.probability += self.probability_delta;
        genome.jitter_ms += self.jitter_delta_ms;
        genome.tone += self.tone_delta;
        genome.spread += self.spread_delta;
        genome.sanitize();
    }
}

/// Encoded source index: 0 for live input, otherwise the clip slot.
pub fn encoded_granular_source(genome: &SeedGenome) -> u8 {
    match genome.granular.source {
        GranularSource::LiveInput => 0,
        GranularSource::SdClip => genome.granular.sd_slot,
    }
}

/// Step the granular source through live input and the clip slots, wrapping.
pub fn cycle_granular_source(genome: &mut SeedGenome, steps: i32) {
    let slots = GRANULAR_SOURCE_SLOTS as i32;
    let current = (encoded_granular_source(genome) as i32).rem_euclid(slots);
    let next = (current + steps).rem_euclid(slots) as u8;
    if next == 0 {
        genome.granular.source = GranularSource::LiveInput;
    } else {
        genome.granular.source = GranularSource::SdClip;
        genome.granular.sd_slot = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nudge_clamps_after_applying() {
        let mut g = SeedGenome::default();
        let nudge = SeedNudge {
            probability_delta: 5.0,
            density_delta: -10.0,
            tone_delta: 0.1,
            ..Default::default()
        };
        nudge.apply(&mut g);
        assert_eq!(g.probability, 1.0);
        assert_eq!(g.density, 0.0);
        assert!((g.tone - 0.45).abs() < 1e-6);
    }

    #[test]
    fn nudge_moves_pitch_freely() {
        let mut g = SeedGenome::default();
        SeedNudge { pitch_semitones: -7.0, ..Default::default() }.apply(&mut g);
        assert_eq!(g.pitch_semitones, -7.0);
    }

    #[test]
    fn cycle_walks_from_live_into_clips() {
        let mut g = SeedGenome::default();
        cycle_granular_source(&mut g, 1);
        assert_eq!(g.granular.source, GranularSource::SdClip);
        assert_eq!(g.granular.sd_slot, 1);
        cycle_granular_source(&mut g, -1);
        assert_eq!(g.granular.source, GranularSource::LiveInput);
    }

    #[test]
    fn cycle_wraps_backwards() {
        let mut g = SeedGenome::default();
        cycle_granular_source(&mut g, -1);
        assert_eq!(encoded_granular_source(&g), GRANULAR_SOURCE_SLOTS - 1);
    }
}
