//! Sample clocks used to timestamp triggers.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};

use sb_ir::units::SIM_SAMPLES_PER_TICK;

/// Monotonic "current sample count" source.
pub trait SampleClock {
    fn now_samples(&self) -> u32;
}

/// Deterministic stand-in for an audio clock: advances a fixed number of
/// samples per tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimSampleClock {
    now: u32,
    per_tick: u32,
}

impl SimSampleClock {
    pub fn new(per_tick: u32) -> Self {
        Self { now: 0, per_tick }
    }

    /// Step forward by one tick's worth of samples (wrapping).
    pub fn advance(&mut self) {
        self.now = self.now.wrapping_add(self.per_tick);
    }

    pub fn per_tick(&self) -> u32 {
        self.per_tick
    }

    pub fn reset(&mut self) {
        self.now = 0;
    }
}

impl Default for SimSampleClock {
    fn default() -> Self {
        Self::new(SIM_SAMPLES_PER_TICK)
    }
}

impl SampleClock for SimSampleClock {
    fn now_samples(&self) -> u32 {
        self.now
    }
}

/// Sample counter written by an audio callback and read by the control loop.
///
/// Clones share the same counter.
#[derive(Clone, Debug, Default)]
pub struct SharedSampleClock {
    counter: Arc<AtomicU32>,
}

impl SharedSampleClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called from the audio side after rendering `frames` frames.
    pub fn advance_by(&self, frames: u32) {
        self.counter.fetch_add(frames, Ordering::Release);
    }
}

impl SampleClock for SharedSampleClock {
    fn now_samples(&self) -> u32 {
        self.counter.load(Ordering::Acquire)
    }
}

impl<C: SampleClock + ?Sized> SampleClock for &C {
    fn now_samples(&self) -> u32 {
        (**self).now_samples()
    }
}
