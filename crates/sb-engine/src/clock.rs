//! Clock providers and the transport that picks the active one.
//!
//! A provider turns tempo and swing into per-tick timing nudges and gates
//! whether tick pulses reach the scheduler. Exactly one provider is active at
//! a time; [`Transport`] owns all three and handles switching.

use sb_ir::clamp01;
use sb_ir::units::{samples_per_tick, PPQN};
use tracing::info;

use crate::sample_clock::SampleClock;
use crate::scheduler::PatternScheduler;

pub const DEFAULT_BPM: f32 = 120.0;

/// Which clock drives the scheduler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClockKind {
    /// Free-running tempo owned by the instrument.
    #[default]
    Internal,
    /// Slaved to an upstream clock; follows the external transport.
    ExternalFollower,
    /// Internal timing mirrored to an outbound transport.
    ExternalRelay,
}

impl ClockKind {
    pub const ALL: [ClockKind; 3] = [Self::Internal, Self::ExternalFollower, Self::ExternalRelay];

    const fn index(self) -> usize {
        match self {
            Self::Internal => 0,
            Self::ExternalFollower => 1,
            Self::ExternalRelay => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::ExternalFollower => "external",
            Self::ExternalRelay => "relay",
        }
    }
}

/// One clock source's transport state and groove settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockProvider {
    kind: ClockKind,
    running: bool,
    bpm: f32,
    swing: f32,
    micro_jitter_ms: f32,
}

impl ClockProvider {
    pub fn new(kind: ClockKind) -> Self {
        Self {
            kind,
            running: false,
            bpm: DEFAULT_BPM,
            swing: 0.0,
            micro_jitter_ms: 0.0,
        }
    }

    pub fn kind(&self) -> ClockKind {
        self.kind
    }

    pub fn start_transport(&mut self) {
        self.running = true;
    }

    pub fn stop_transport(&mut self) {
        self.running = false;
    }

    pub fn continue_transport(&mut self) {
        self.running = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Set the tempo. Non-finite values are ignored; the floor is 1 BPM.
    pub fn set_bpm(&mut self, bpm: f32) {
        if bpm.is_finite() {
            self.bpm = bpm.max(1.0);
        }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Set swing amount, clamped into `[0, 1]`.
    pub fn set_swing(&mut self, swing: f32) {
        self.swing = if swing.is_finite() { clamp01(swing) } else { 0.0 };
    }

    pub fn swing(&self) -> f32 {
        self.swing
    }

    pub fn set_micro_jitter_ms(&mut self, ms: f32) {
        self.micro_jitter_ms = if ms.is_finite() { ms.max(0.0) } else { 0.0 };
    }

    pub fn micro_jitter_ms(&self) -> f32 {
        self.micro_jitter_ms
    }

    pub fn samples_per_tick(&self, sample_rate: u32) -> f64 {
        samples_per_tick(self.bpm, sample_rate)
    }

    /// Timing offset for `tick_count`, in samples.
    ///
    /// Only the internal clock swings. Ticks in the second half of each beat
    /// are pulled early, the first half pushed late, by
    /// `base_samples_per_tick * swing / 3`. Pure in its inputs.
    pub fn swing_nudge_samples(&self, tick_count: u64, base_samples_per_tick: f64) -> f64 {
        if self.kind != ClockKind::Internal || self.swing <= 0.0 {
            return 0.0;
        }
        let nudge = base_samples_per_tick * f64::from(self.swing) / 3.0;
        if tick_count % u64::from(PPQN) >= u64::from(PPQN / 2) {
            -nudge
        } else {
            nudge
        }
    }
}

/// Owns the three providers and the active selection.
#[derive(Clone, Debug, PartialEq)]
pub struct Transport {
    providers: [ClockProvider; 3],
    active: ClockKind,
    external_asserted: bool,
}

impl Transport {
    /// All providers stopped, internal selected.
    pub fn new() -> Self {
        Self {
            providers: ClockKind::ALL.map(ClockProvider::new),
            active: ClockKind::Internal,
            external_asserted: false,
        }
    }

    pub fn active_kind(&self) -> ClockKind {
        self.active
    }

    pub fn active(&self) -> &ClockProvider {
        &self.providers[self.active.index()]
    }

    fn active_mut(&mut self) -> &mut ClockProvider {
        &mut self.providers[self.active.index()]
    }

    pub fn provider(&self, kind: ClockKind) -> &ClockProvider {
        &self.providers[kind.index()]
    }

    /// Switch providers: the outgoing one stops and the incoming one starts.
    /// A follower only starts while external transport is asserted.
    pub fn select(&mut self, kind: ClockKind) {
        if kind == self.active {
            return;
        }
        self.active_mut().stop_transport();
        self.active = kind;
        self.start_transport();
        info!(clock = kind.name(), running = self.is_running(), "clock selected");
    }

    pub fn start_transport(&mut self) {
        if self.active != ClockKind::ExternalFollower || self.external_asserted {
            self.active_mut().start_transport();
        }
    }

    pub fn stop_transport(&mut self) {
        self.active_mut().stop_transport();
    }

    pub fn continue_transport(&mut self) {
        if self.active != ClockKind::ExternalFollower || self.external_asserted {
            self.active_mut().continue_transport();
        }
    }

    /// Upstream transport started (MIDI start/continue).
    pub fn external_start(&mut self) {
        self.external_asserted = true;
        if self.active == ClockKind::ExternalFollower {
            self.active_mut().start_transport();
        }
    }

    /// Upstream transport stopped.
    pub fn external_stop(&mut self) {
        self.external_asserted = false;
        if self.active == ClockKind::ExternalFollower {
            self.active_mut().stop_transport();
        }
    }

    pub fn external_asserted(&self) -> bool {
        self.external_asserted
    }

    pub fn is_running(&self) -> bool {
        self.active().is_running()
    }

    /// Tempo is shared by every provider so switching never jumps tempo.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.providers.iter_mut().for_each(|p| p.set_bpm(bpm));
    }

    pub fn bpm(&self) -> f32 {
        self.active().bpm()
    }

    pub fn set_swing(&mut self, swing: f32) {
        self.providers.iter_mut().for_each(|p| p.set_swing(swing));
    }

    pub fn swing(&self) -> f32 {
        self.active().swing()
    }

    pub fn samples_per_tick(&self, sample_rate: u32) -> f64 {
        self.active().samples_per_tick(sample_rate)
    }

    /// Forward one tick pulse to `scheduler` if the active provider runs.
    ///
    /// Returns whether the pulse was forwarded.
    pub fn on_tick<C, F>(&self, scheduler: &mut PatternScheduler, clock: &C, emit: F) -> bool
    where
        C: SampleClock + ?Sized,
        F: FnMut(&sb_ir::SeedGenome, u32),
    {
        let provider = self.active();
        if !provider.is_running() {
            return false;
        }
        let spt = provider.samples_per_tick(scheduler.sample_rate());
        let nudge = provider.swing_nudge_samples(scheduler.ticks(), spt);
        scheduler.on_tick(clock, nudge, emit);
        true
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}
