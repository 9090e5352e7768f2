//! Burst engine: one trigger becomes a cluster of evenly spaced timestamps.

use arrayvec::ArrayVec;
use sb_ir::SeedGenome;

pub const MAX_CLUSTER: usize = 16;

pub type PendingTriggers = ArrayVec<u32, MAX_CLUSTER>;

#[derive(Clone, Debug)]
pub struct BurstEngine {
    cluster_count: u8,
    spacing_samples: u32,
    pending: PendingTriggers,
    generation_seed: u32,
    last_seed_id: u32,
}

impl BurstEngine {
    pub fn new() -> Self {
        Self {
            cluster_count: 1,
            spacing_samples: 0,
            pending: PendingTriggers::new(),
            generation_seed: 0,
            last_seed_id: 0,
        }
    }

    pub fn prepare(&mut self, master_seed: u32) {
        self.generation_seed = master_seed;
        self.last_seed_id = 0;
        self.pending.clear();
    }

    /// Clamped to `1..=16`.
    pub fn set_cluster_count(&mut self, count: i32) {
        self.cluster_count = count.clamp(1, MAX_CLUSTER as i32) as u8;
    }

    /// Negative spacing collapses the cluster onto one instant.
    pub fn set_spacing_samples(&mut self, spacing: i64) {
        self.spacing_samples = spacing.clamp(0, i64::from(u32::MAX)) as u32;
    }

    /// Replace the pending list with `cluster_count` timestamps from `when_samples`.
    pub fn trigger(&mut self, genome: &SeedGenome, when_samples: u32) {
        self.pending.clear();
        let mut when = when_samples;
        for _ in 0..self.cluster_count {
            self.pending.push(when);
            when = when.wrapping_add(self.spacing_samples);
        }
        self.last_seed_id = genome.id;
    }

    pub fn pending_triggers(&self) -> &[u32] {
        &self.pending
    }

    pub fn panic(&mut self) {
        self.pending.clear();
    }

    pub fn cluster_count(&self) -> u8 {
        self.cluster_count
    }

    pub fn spacing_samples(&self) -> u32 {
        self.spacing_samples
    }

    pub fn generation_seed(&self) -> u32 {
        self.generation_seed
    }

    pub fn last_seed_id(&self) -> u32 {
        self.last_seed_id
    }
}

impl Default for BurstEngine {
    fn default() -> Self {
        Self::new()
    }
}
