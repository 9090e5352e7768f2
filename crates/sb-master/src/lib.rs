//! Headless controller for the seedbox control core.
//!
//! Wires transport, scheduler, and router into one [`Controller`] that both
//! the CLI and a hardware front end can drive. Also provides the session
//! config loader, the lock-free render hand-off, and a wall-clock driver.

mod clock_thread;
mod controller;
mod error;
mod render;
mod settings;

pub use clock_thread::ClockThread;
pub use controller::{Controller, TriggerRecord};
pub use error::SessionError;
pub use render::{render_channel, RenderView, RingSink};
pub use settings::{
    BurstSettings, ClipSetting, DampingRange, EuclidSettings, SessionConfig, TargetSetting,
    DEFAULT_MASTER_SEED,
};

// Re-export common types so callers don't need sb-ir/sb-engine directly.
pub use ::config::FileFormat;
pub use sb_engine::{ClockKind, EngineKind, Target, VoiceUpdate};
pub use sb_ir::{GenomeSnapshot, SeedGenome, SeedNudge, SeedPrimeMode};
