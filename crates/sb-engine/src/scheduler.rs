//! Tick-driven trigger scheduling.
//!
//! Every clock tick (24 per quarter note) each genome's density accumulator
//! grows by `density / 24`. Crossing 1.0 makes the genome eligible; it then
//! rolls its own RNG cursor against `probability`, and a passing roll is
//! timestamped from the sample clock plus swing and jitter.

use alloc::vec::Vec;

use sb_ir::rng::{uniform01, uniform_signed};
use sb_ir::units::PPQN;
use sb_ir::SeedGenome;
use tracing::{trace, warn};

use crate::clock::DEFAULT_BPM;
use crate::sample_clock::SampleClock;

/// A fired genome and its sample-accurate timestamp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerEvent {
    pub genome: SeedGenome,
    pub when_samples: u32,
}

/// Running counters over every tick processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerDiagnostics {
    pub ticks: u64,
    /// Genomes whose accumulator crossed 1.0
    pub density_gates: u64,
    /// Eligible genomes that lost the probability roll
    pub probability_drops: u64,
    pub triggers: u64,
}

/// Owns the active genome table and its per-genome accumulators.
#[derive(Clone, Debug)]
pub struct PatternScheduler {
    seeds: Vec<SeedGenome>,
    accumulators: Vec<f32>,
    tick_count: u64,
    bpm: f32,
    sample_rate: u32,
    diagnostics: SchedulerDiagnostics,
}

impl PatternScheduler {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            seeds: Vec::new(),
            accumulators: Vec::new(),
            tick_count: 0,
            bpm: DEFAULT_BPM,
            sample_rate: sample_rate.max(1),
            diagnostics: SchedulerDiagnostics::default(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        if bpm.is_finite() {
            self.bpm = bpm.max(1.0);
        }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Append a genome with a fresh accumulator.
    pub fn add_seed(&mut self, genome: SeedGenome) {
        self.seeds.push(genome.sanitized());
        self.accumulators.push(0.0);
    }

    /// Replace the whole table.
    ///
    /// Surviving indices keep their accumulator phase; new ones start at 0.
    pub fn set_seeds(&mut self, seeds: &[SeedGenome]) {
        self.seeds.clear();
        self.seeds.extend(seeds.iter().map(|g| g.sanitized()));
        self.accumulators.resize(self.seeds.len(), 0.0);
    }

    /// Replace one genome in place without touching its accumulator.
    /// Out-of-range indices are ignored.
    pub fn update_seed(&mut self, index: usize, genome: SeedGenome) {
        match self.seeds.get_mut(index) {
            Some(slot) => *slot = genome.sanitized(),
            None => warn!(index, len = self.seeds.len(), "update_seed out of range"),
        }
    }

    /// Copy of the genome at `index`, if any.
    pub fn seed(&self, index: usize) -> Option<SeedGenome> {
        self.seeds.get(index).copied()
    }

    pub fn seeds(&self) -> &[SeedGenome] {
        &self.seeds
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    pub fn ticks(&self) -> u64 {
        self.tick_count
    }

    pub fn diagnostics(&self) -> SchedulerDiagnostics {
        self.diagnostics
    }

    /// Process one clock tick.
    ///
    /// `swing_nudge` (samples, may be negative) is added to every timestamp
    /// emitted this tick. The tick counter advances even when nothing fires.
    pub fn on_tick<C, F>(&mut self, clock: &C, swing_nudge: f64, mut emit: F)
    where
        C: SampleClock + ?Sized,
        F: FnMut(&SeedGenome, u32),
    {
        let ppqn = PPQN as f32;
        for (genome, acc) in self.seeds.iter_mut().zip(self.accumulators.iter_mut()) {
            *acc += genome.density / ppqn;
            if *acc < 1.0 {
                continue;
            }
            // One gate per tick at most; density above 24 must not bank a backlog.
            *acc = (*acc - 1.0).min(1.0);
            self.diagnostics.density_gates += 1;

            let roll = uniform01(&mut genome.rng_state);
            if roll >= genome.probability {
                self.diagnostics.probability_drops += 1;
                continue;
            }

            let mut when = f64::from(clock.now_samples()) + swing_nudge;
            if genome.jitter_ms != 0.0 {
                let jitter_ms = uniform_signed(&mut genome.rng_state) * genome.jitter_ms;
                when += f64::from(jitter_ms) * f64::from(self.sample_rate) / 1000.0;
            }
            let when_samples = when.clamp(0.0, f64::from(u32::MAX)) as u32;

            self.diagnostics.triggers += 1;
            trace!(seed = genome.id, when_samples, "trigger");
            emit(genome, when_samples);
        }
        self.tick_count += 1;
        self.diagnostics.ticks = self.tick_count;
    }
}
