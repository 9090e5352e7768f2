//! Seedbox engine: clocks, the pattern scheduler, and the five voice engines.
//!
//! Everything here runs on the control thread and is allocation-free once
//! the genome table is installed. Voice state leaves through a [`VoiceSink`].

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod clock;
pub mod engines;
mod router;
mod sample_clock;
pub mod scheduler;
mod sink;
mod stereo;
mod voice_pool;

pub use clock::{ClockKind, ClockProvider, Transport};
pub use router::{EngineKind, EngineRouter, Target};
pub use sample_clock::{SampleClock, SharedSampleClock, SimSampleClock};
pub use scheduler::{PatternScheduler, SchedulerDiagnostics, TriggerEvent};
pub use sink::{NullSink, VoiceSink, VoiceUpdate};
pub use stereo::{constant_power_width, StereoGains};
pub use voice_pool::{VoiceIndex, VoicePool, VoiceSlot};

/// Run `f` as a real-time section.
///
/// With the `alloc_check` feature any heap allocation inside `f` aborts
/// (when the `AllocDisabler` global allocator is installed).
#[inline]
pub fn realtime<R>(f: impl FnOnce() -> R) -> R {
    #[cfg(feature = "alloc_check")]
    {
        assert_no_alloc::assert_no_alloc(f)
    }
    #[cfg(not(feature = "alloc_check"))]
    {
        f()
    }
}
