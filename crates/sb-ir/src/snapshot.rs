//! Persistable copy of a genome table and its locks.

use alloc::vec::Vec;

use crate::genome::SeedGenome;
use crate::lock::SeedLock;

/// Everything needed to bring a seed table back after a restart.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenomeSnapshot {
    pub master_seed: u32,
    pub genomes: Vec<SeedGenome>,
    pub locks: SeedLock,
}

impl GenomeSnapshot {
    pub fn new(master_seed: u32, genomes: &[SeedGenome], locks: &SeedLock) -> Self {
        Self {
            master_seed,
            genomes: genomes.to_vec(),
            locks: locks.clone(),
        }
    }

    /// Take the genomes out for installation.
    ///
    /// Loaded data is untrusted: every genome is sanitized and re-stamped
    /// with its table index, and the lock table is sized to match.
    pub fn into_parts(self) -> (u32, Vec<SeedGenome>, SeedLock) {
        let genomes: Vec<SeedGenome> = self
            .genomes
            .into_iter()
            .enumerate()
            .map(|(i, g)| SeedGenome { id: i as u32, ..g }.sanitized())
            .collect();
        let mut locks = self.locks;
        locks.resize(genomes.len());
        (self.master_seed, genomes, locks)
    }
}
