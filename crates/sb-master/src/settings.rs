//! Session configuration.
//!
//! Every field is optional in the file; missing values take the instrument's
//! boot defaults. Values are sanitized by the same setters live control input
//! goes through, so a config file can never put the core out of range.

use std::path::Path;

use config::{Config, File, FileFormat};
use sb_engine::Target;
use sb_ir::units::SIM_SAMPLES_PER_TICK;
use sb_ir::DEFAULT_POPULATION;
use serde::Deserialize;

use crate::error::SessionError;

pub const DEFAULT_MASTER_SEED: u32 = 0x5EED_B0C5;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetSetting {
    #[default]
    Simulated,
    Hardware,
}

impl From<TargetSetting> for Target {
    fn from(value: TargetSetting) -> Self {
        match value {
            TargetSetting::Simulated => Target::Simulated,
            TargetSetting::Hardware => Target::Hardware,
        }
    }
}

/// A clip registered with the granular engine.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ClipSetting {
    pub slot: u8,
    pub name: String,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct DampingRange {
    pub min: f32,
    pub max: f32,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EuclidSettings {
    pub steps: i32,
    pub fills: i32,
    pub rotate: i32,
}

impl Default for EuclidSettings {
    fn default() -> Self {
        Self { steps: 16, fills: 4, rotate: 0 }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BurstSettings {
    pub cluster_count: i32,
    pub spacing_samples: i64,
}

impl Default for BurstSettings {
    fn default() -> Self {
        Self { cluster_count: 1, spacing_samples: 0 }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Defaults to the target's native rate.
    pub sample_rate: Option<u32>,
    pub bpm: f32,
    pub swing: f32,
    pub master_seed: u32,
    pub population: usize,
    pub target: TargetSetting,
    /// Engine id per seed slot; missing slots use the Sampler.
    pub engines: Vec<u8>,
    pub live_input_armed: bool,
    pub sd_clips: Vec<ClipSetting>,
    pub granular_max_voices: Option<usize>,
    pub resonator_max_voices: Option<usize>,
    pub damping_range: Option<DampingRange>,
    pub euclid: EuclidSettings,
    pub burst: BurstSettings,
    pub sim_samples_per_tick: u32,
    /// Trigger records kept for golden-log comparison.
    pub trigger_log_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: None,
            bpm: 120.0,
            swing: 0.0,
            master_seed: DEFAULT_MASTER_SEED,
            population: DEFAULT_POPULATION,
            target: TargetSetting::Simulated,
            engines: Vec::new(),
            live_input_armed: true,
            sd_clips: Vec::new(),
            granular_max_voices: None,
            resonator_max_voices: None,
            damping_range: None,
            euclid: EuclidSettings::default(),
            burst: BurstSettings::default(),
            sim_samples_per_tick: SIM_SAMPLES_PER_TICK,
            trigger_log_capacity: 1024,
        }
    }
}

impl SessionConfig {
    /// Load from a file; the format follows the extension (YAML, TOML, JSON).
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<SessionConfig>()?)
    }

    /// Parse from an in-memory document.
    pub fn parse(text: &str, format: FileFormat) -> Result<Self, SessionError> {
        Ok(Config::builder()
            .add_source(File::from_str(text, format))
            .build()?
            .try_deserialize::<SessionConfig>()?)
    }

    pub fn target(&self) -> Target {
        self.target.into()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
            .filter(|&rate| rate > 0)
            .unwrap_or_else(|| self.target().sample_rate())
    }
}
