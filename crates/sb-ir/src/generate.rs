//! The generation step: master seed + locks -> genome table.

use alloc::vec::Vec;

use crate::genome::{
    GenomeSource, GranularParams, GranularSource, ResonatorMode, ResonatorParams, SeedGenome,
    MAX_FEEDBACK,
};
use crate::lock::SeedLock;
use crate::prime::SeedPrime;
use crate::rng::{mix_seed, uniform01, uniform_signed, xorshift};

/// Genomes in the reference population.
pub const DEFAULT_POPULATION: usize = 4;

/// Number of modal presets a generated genome may select.
const GENERATED_BANKS: u32 = 6;

/// Sample slots a generated genome may reference.
const GENERATED_SAMPLE_SLOTS: u32 = 16;

/// Linear map of a unit draw onto `[lo, hi)`.
fn span(state: &mut u32, lo: f32, hi: f32) -> f32 {
    lo + (hi - lo) * uniform01(state)
}

/// Derive the unlocked genome for `index` from `master_seed`.
///
/// Depends only on `(master_seed, index, engine_id)`.
pub fn derive_genome(master_seed: u32, index: usize, engine_id: u8) -> SeedGenome {
    let rng_state = mix_seed(master_seed, index as u32);
    let mut cursor = rng_state;
    let c = &mut cursor;

    let pitch_semitones = libm::roundf(uniform_signed(c) * 12.0);
    let env_attack = span(c, 0.001, 0.02);
    let env_decay = span(c, 0.05, 0.4);
    let env_sustain = span(c, 0.3, 0.9);
    let env_release = span(c, 0.05, 0.45);
    let density = span(c, 0.5, 4.0);
    let probability = span(c, 0.55, 1.0);
    let jitter_ms = span(c, 0.0, 12.0);
    let tone = uniform01(c);
    let spread = uniform01(c);
    let mutate_amount = span(c, 0.05, 0.3);
    let sample_slot = (xorshift(c) % GENERATED_SAMPLE_SLOTS) as u8;

    let granular = GranularParams {
        grain_size_ms: span(c, 20.0, 200.0),
        spray_ms: span(c, 0.0, 30.0),
        transpose_semitones: libm::roundf(uniform_signed(c) * 7.0),
        window_skew: uniform_signed(c),
        stereo_spread: uniform01(c),
        source: if uniform01(c) < 0.5 {
            GranularSource::LiveInput
        } else {
            GranularSource::SdClip
        },
        sd_slot: 1 + (xorshift(c) % 7) as u8,
    };

    let resonator = ResonatorParams {
        excite_ms: span(c, 1.0, 8.0),
        damping: uniform01(c),
        brightness: uniform01(c),
        feedback: span(c, 0.0, MAX_FEEDBACK),
        mode: ResonatorMode::from_raw((xorshift(c) % 2) as u8),
        bank: (xorshift(c) % GENERATED_BANKS) as u8,
    };

    SeedGenome {
        id: index as u32,
        lineage: master_seed,
        source: GenomeSource::Lfsr,
        rng_state,
        pitch_semitones,
        env_attack,
        env_decay,
        env_sustain,
        env_release,
        density,
        probability,
        jitter_ms,
        tone,
        spread,
        mutate_amount,
        engine_id,
        sample_slot,
        granular,
        resonator,
    }
    .sanitized()
}

/// Produce a table of `population` genomes for `master_seed`.
///
/// Locked slots copy the previous genome verbatim (only `id` is re-stamped).
/// Unlocked slots are filled by `prime` from `(master_seed, index)` and take
/// their engine from `assignments` (default 0). A locked slot with no
/// previous genome is primed as if unlocked.
pub fn generate_table(
    master_seed: u32,
    previous: &[SeedGenome],
    locks: &SeedLock,
    assignments: &[u8],
    population: usize,
    prime: SeedPrime<'_>,
) -> Vec<SeedGenome> {
    (0..population)
        .map(|index| match previous.get(index) {
            Some(prev) if locks.seed_locked(index) => SeedGenome {
                id: index as u32,
                ..*prev
            },
            _ => {
                let engine_id = assignments.get(index).copied().unwrap_or(0);
                prime.prime(master_seed, index, engine_id)
            }
        })
        .collect()
}
