//! Seed priming: what an unlocked slot is filled with on reseed.

use crate::generate::derive_genome;
use crate::genome::{GenomeSource, GranularSource, SeedGenome};

/// Selectable priming strategy, as stored in session state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SeedPrimeMode {
    #[default]
    Lfsr,
    TapTempo,
    Preset,
    LiveInput,
}

impl SeedPrimeMode {
    /// Decode a raw control value; out-of-range values wrap.
    pub const fn from_raw(raw: u8) -> Self {
        match raw % 4 {
            0 => Self::Lfsr,
            1 => Self::TapTempo,
            2 => Self::Preset,
            _ => Self::LiveInput,
        }
    }
}

/// A priming strategy together with the data it needs.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SeedPrime<'a> {
    /// Derive from the master seed.
    #[default]
    Lfsr,
    /// Derive, then pin density to the tapped tempo.
    TapTempo { density: f32 },
    /// Copy the preset's genome for each slot.
    Preset { id: u32, seeds: &'a [SeedGenome] },
    /// Derive, then point every granular voice at the live input.
    LiveInput,
}

impl SeedPrime<'_> {
    pub fn mode(&self) -> SeedPrimeMode {
        match self {
            Self::Lfsr => SeedPrimeMode::Lfsr,
            Self::TapTempo { .. } => SeedPrimeMode::TapTempo,
            Self::Preset { .. } => SeedPrimeMode::Preset,
            Self::LiveInput => SeedPrimeMode::LiveInput,
        }
    }

    /// Genome for unlocked slot `index`.
    ///
    /// A preset shorter than the table derives the missing slots.
    pub fn prime(&self, master_seed: u32, index: usize, engine_id: u8) -> SeedGenome {
        match *self {
            Self::Lfsr => derive_genome(master_seed, index, engine_id),
            Self::TapTempo { density } => {
                let mut genome = derive_genome(master_seed, index, engine_id);
                genome.source = GenomeSource::TapTempo;
                genome.density = density;
                genome.sanitized()
            }
            Self::Preset { id, seeds } => match seeds.get(index) {
                Some(seed) => SeedGenome {
                    id: index as u32,
                    lineage: id,
                    source: GenomeSource::Preset,
                    ..*seed
                }
                .sanitized(),
                None => derive_genome(master_seed, index, engine_id),
            },
            Self::LiveInput => {
                let mut genome = derive_genome(master_seed, index, engine_id);
                genome.source = GenomeSource::LiveInput;
                genome.granular.source = GranularSource::LiveInput;
                genome.granular.sd_slot = 0;
                genome
            }
        }
    }
}

/// Tempo implied by one tap interval, or `None` for a zero interval.
pub fn tap_interval_bpm(interval_ms: u32) -> Option<f32> {
    (interval_ms > 0).then(|| 60_000.0 / interval_ms as f32)
}

/// Gates per clock beat that land one trigger on every tap.
pub fn tap_density(tap_bpm: f32, clock_bpm: f32) -> f32 {
    if tap_bpm > 0.0 && clock_bpm > 0.0 {
        tap_bpm / clock_bpm
    } else {
        0.0
    }
}
