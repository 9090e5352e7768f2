//! Where derived voice state goes once the control thread has written it.
//!
//! The router publishes every voice write through a [`VoiceSink`]. A
//! simulation can drop or record updates; a real target forwards them to its
//! audio graph. The derivation code never knows which one it is talking to.

use crate::engines::{GrainVoice, PendingTriggers, ResonatorVoice, SamplerVoice, MAX_CLUSTER};
use crate::voice_pool::{VoiceIndex, VoiceSlot};

/// One published change of voice state.
#[derive(Clone, Debug, PartialEq)]
pub enum VoiceUpdate {
    Sampler {
        index: VoiceIndex,
        slot: VoiceSlot<SamplerVoice>,
    },
    Granular {
        index: VoiceIndex,
        slot: VoiceSlot<GrainVoice>,
    },
    Resonator {
        index: VoiceIndex,
        slot: VoiceSlot<ResonatorVoice>,
    },
    /// Gate read by the Euclid engine this tick
    EuclidGate { step: u32, gate: bool },
    /// Fresh burst cluster
    Burst { seed_id: u32, pending: PendingTriggers },
    /// Every voice silenced
    Panic,
}

impl VoiceUpdate {
    pub fn burst(seed_id: u32, pending: &[u32]) -> Self {
        let mut list = PendingTriggers::new();
        list.extend(pending.iter().copied().take(MAX_CLUSTER));
        Self::Burst { seed_id, pending: list }
    }
}

/// Capability the router publishes voice state through.
pub trait VoiceSink {
    fn publish(&mut self, update: VoiceUpdate);

    /// Retry anything `publish` could not hand off. Called once per tick,
    /// running or not.
    fn flush(&mut self) {}
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl VoiceSink for NullSink {
    fn publish(&mut self, _update: VoiceUpdate) {}
}

impl<S: VoiceSink + ?Sized> VoiceSink for &mut S {
    fn publish(&mut self, update: VoiceUpdate) {
        (**self).publish(update);
    }

    fn flush(&mut self) {
        (**self).flush();
    }
}

impl VoiceSink for alloc::vec::Vec<VoiceUpdate> {
    fn publish(&mut self, update: VoiceUpdate) {
        self.push(update);
    }
}
