//! Seedbox IR: the plain data model shared by the engines and controller.
//!
//! This crate is `no_std` + `alloc` so it can be shared with firmware builds.
//! It holds the genome record, the xorshift RNG every random draw goes
//! through, seed locks, and the generation step that mints a genome table
//! from a master seed.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod generate;
mod genome;
mod lock;
mod nudge;
mod prime;
pub mod rng;
mod snapshot;
pub mod units;

pub use generate::{derive_genome, generate_table, DEFAULT_POPULATION};
pub use genome::{
    clamp01, GenomeSource, GranularParams, GranularSource, ResonatorMode, ResonatorParams,
    SeedGenome, MAX_FEEDBACK,
};
pub use lock::SeedLock;
pub use nudge::{cycle_granular_source, encoded_granular_source, SeedNudge, GRANULAR_SOURCE_SLOTS};
pub use prime::{tap_density, tap_interval_bpm, SeedPrime, SeedPrimeMode};
pub use snapshot::GenomeSnapshot;
