//! Lock-free hand-off of voice state from the control thread to a renderer.
//!
//! The control side publishes [`VoiceUpdate`]s into a single-producer /
//! single-consumer ring. The render side drains whatever has arrived at the
//! top of each audio block into its own mirrored voice tables and only ever
//! reads those. Neither side blocks.
//!
//! The sink also keeps the latest value of every slot it has been handed.
//! When the ring is full the slot is marked dirty instead of lost, and the
//! next [`VoiceSink::flush`] re-sends its current value once the renderer
//! has made room. The mirror therefore always converges on the control
//! side's tables, even if intermediate values are skipped.

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use sb_engine::engines::{
    GrainVoice, PendingTriggers, ResonatorVoice, SamplerVoice, GRANULAR_VOICES, RESONATOR_VOICES,
    SAMPLER_VOICES,
};
use sb_engine::{VoiceIndex, VoiceSink, VoiceSlot, VoiceUpdate};

// Dirty-bit layout: one key per voice slot, then burst and euclid.
const SAMPLER_KEY: usize = 0;
const GRANULAR_KEY: usize = SAMPLER_KEY + SAMPLER_VOICES;
const RESONATOR_KEY: usize = GRANULAR_KEY + GRANULAR_VOICES;
const BURST_KEY: usize = RESONATOR_KEY + RESONATOR_VOICES;
const EUCLID_KEY: usize = BURST_KEY + 1;
const _: () = assert!(EUCLID_KEY < u128::BITS as usize);

/// Create a connected sink/view pair holding up to `capacity` updates.
pub fn render_channel(capacity: usize) -> (RingSink, RenderView) {
    let rb = HeapRb::<VoiceUpdate>::new(capacity.max(1));
    let (producer, consumer) = rb.split();
    (
        RingSink {
            producer,
            latest: VoiceTables::new(),
            dirty: 0,
            panic_pending: false,
            deferred: 0,
        },
        RenderView::new(consumer),
    )
}

/// Per-engine voice state as last written, on either side of the ring.
#[derive(Clone, Debug)]
struct VoiceTables {
    sampler: [VoiceSlot<SamplerVoice>; SAMPLER_VOICES],
    granular: [VoiceSlot<GrainVoice>; GRANULAR_VOICES],
    resonator: [VoiceSlot<ResonatorVoice>; RESONATOR_VOICES],
    burst: PendingTriggers,
    burst_seed: u32,
    euclid: Option<(u32, bool)>,
}

fn store<P>(table: &mut [VoiceSlot<P>], index: usize, slot: VoiceSlot<P>) {
    if let Some(entry) = table.get_mut(index) {
        *entry = slot;
    }
}

fn copy_or_default<P: Copy + Default>(table: &[VoiceSlot<P>], index: usize) -> VoiceSlot<P> {
    table.get(index).copied().unwrap_or_default()
}

/// Dirty-bit key for a slot update. `None` for panic and stray indices.
fn key_of(update: &VoiceUpdate) -> Option<usize> {
    let key = match update {
        VoiceUpdate::Sampler { index, .. } if index.get() < SAMPLER_VOICES => {
            SAMPLER_KEY + index.get()
        }
        VoiceUpdate::Granular { index, .. } if index.get() < GRANULAR_VOICES => {
            GRANULAR_KEY + index.get()
        }
        VoiceUpdate::Resonator { index, .. } if index.get() < RESONATOR_VOICES => {
            RESONATOR_KEY + index.get()
        }
        VoiceUpdate::Burst { .. } => BURST_KEY,
        VoiceUpdate::EuclidGate { .. } => EUCLID_KEY,
        _ => return None,
    };
    Some(key)
}

impl VoiceTables {
    fn new() -> Self {
        Self {
            sampler: [VoiceSlot::default(); SAMPLER_VOICES],
            granular: [VoiceSlot::default(); GRANULAR_VOICES],
            resonator: [VoiceSlot::default(); RESONATOR_VOICES],
            burst: PendingTriggers::new(),
            burst_seed: 0,
            euclid: None,
        }
    }

    fn apply(&mut self, update: &VoiceUpdate) {
        match update {
            VoiceUpdate::Sampler { index, slot } => store(&mut self.sampler, index.get(), *slot),
            VoiceUpdate::Granular { index, slot } => store(&mut self.granular, index.get(), *slot),
            VoiceUpdate::Resonator { index, slot } => {
                store(&mut self.resonator, index.get(), *slot)
            }
            VoiceUpdate::EuclidGate { step, gate } => self.euclid = Some((*step, *gate)),
            VoiceUpdate::Burst { seed_id, pending } => {
                self.burst.clone_from(pending);
                self.burst_seed = *seed_id;
            }
            VoiceUpdate::Panic => {
                self.sampler.iter_mut().for_each(|s| s.active = false);
                self.granular.iter_mut().for_each(|s| s.active = false);
                self.resonator.iter_mut().for_each(|s| s.active = false);
                self.burst.clear();
            }
        }
    }

    /// Rebuild the update that carries the current value of `key`.
    fn update_for(&self, key: usize) -> Option<VoiceUpdate> {
        let update = match key {
            k if k < GRANULAR_KEY => VoiceUpdate::Sampler {
                index: VoiceIndex::new(k - SAMPLER_KEY),
                slot: self.sampler[k - SAMPLER_KEY],
            },
            k if k < RESONATOR_KEY => VoiceUpdate::Granular {
                index: VoiceIndex::new(k - GRANULAR_KEY),
                slot: self.granular[k - GRANULAR_KEY],
            },
            k if k < BURST_KEY => VoiceUpdate::Resonator {
                index: VoiceIndex::new(k - RESONATOR_KEY),
                slot: self.resonator[k - RESONATOR_KEY],
            },
            BURST_KEY => VoiceUpdate::Burst {
                seed_id: self.burst_seed,
                pending: self.burst.clone(),
            },
            EUCLID_KEY => {
                let (step, gate) = self.euclid?;
                VoiceUpdate::EuclidGate { step, gate }
            }
            _ => return None,
        };
        Some(update)
    }
}

/// Control-thread end of the hand-off.
pub struct RingSink {
    producer: HeapProd<VoiceUpdate>,
    latest: VoiceTables,
    dirty: u128,
    panic_pending: bool,
    deferred: u64,
}

impl RingSink {
    /// Publishes that found the ring full and were left for a later flush.
    pub fn deferred(&self) -> u64 {
        self.deferred
    }

    /// Whether the renderer is still missing some latest state.
    pub fn pending(&self) -> bool {
        self.panic_pending || self.dirty != 0
    }
}

impl VoiceSink for RingSink {
    fn publish(&mut self, update: VoiceUpdate) {
        match key_of(&update) {
            Some(key) => self.dirty |= 1 << key,
            None if matches!(update, VoiceUpdate::Panic) => self.panic_pending = true,
            None => return,
        }
        self.latest.apply(&update);
        self.flush();
        if self.pending() {
            self.deferred += 1;
        }
    }

    /// Push the panic first, then every dirty slot in key order. Stops at
    /// the first full push and leaves the rest dirty.
    fn flush(&mut self) {
        if self.panic_pending {
            if self.producer.try_push(VoiceUpdate::Panic).is_err() {
                return;
            }
            self.panic_pending = false;
        }
        while self.dirty != 0 {
            let key = self.dirty.trailing_zeros() as usize;
            if let Some(update) = self.latest.update_for(key) {
                if self.producer.try_push(update).is_err() {
                    return;
                }
            }
            self.dirty &= !(1 << key);
        }
    }
}

/// Render-thread end: mirrored voice tables fed from the ring.
pub struct RenderView {
    consumer: HeapCons<VoiceUpdate>,
    tables: VoiceTables,
    euclid_gates: u64,
}

impl RenderView {
    fn new(consumer: HeapCons<VoiceUpdate>) -> Self {
        Self {
            consumer,
            tables: VoiceTables::new(),
            euclid_gates: 0,
        }
    }

    /// Apply every pending update. Returns how many were applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Some(update) = self.consumer.try_pop() {
            if let VoiceUpdate::EuclidGate { gate: true, .. } = update {
                self.euclid_gates += 1;
            }
            self.tables.apply(&update);
            applied += 1;
        }
        applied
    }

    pub fn sampler_voice(&self, index: usize) -> VoiceSlot<SamplerVoice> {
        copy_or_default(&self.tables.sampler, index)
    }

    pub fn granular_voice(&self, index: usize) -> VoiceSlot<GrainVoice> {
        copy_or_default(&self.tables.granular, index)
    }

    pub fn resonator_voice(&self, index: usize) -> VoiceSlot<ResonatorVoice> {
        copy_or_default(&self.tables.resonator, index)
    }

    pub fn burst_triggers(&self) -> &[u32] {
        &self.tables.burst
    }

    pub fn burst_seed(&self) -> u32 {
        self.tables.burst_seed
    }

    /// Gates that reached the renderer. A backlog coalesces to the latest
    /// gate, so this can trail the engine's own count.
    pub fn euclid_gates(&self) -> u64 {
        self.euclid_gates
    }

    pub fn last_euclid_step(&self) -> Option<u32> {
        self.tables.euclid.map(|(step, _)| step)
    }

    /// Active voices across the three pooled engines.
    pub fn active_voices(&self) -> usize {
        self.tables.sampler.iter().filter(|s| s.active).count()
            + self.tables.granular.iter().filter(|s| s.active).count()
            + self.tables.resonator.iter().filter(|s| s.active).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_engine::{EngineRouter, Target};
    use sb_ir::SeedGenome;

    fn settle(sink: &mut RingSink, view: &mut RenderView) {
        for _ in 0..64 {
            view.drain();
            sink.flush();
            if !sink.pending() {
                view.drain();
                return;
            }
        }
        panic!("hand-off never settled");
    }

    fn assert_mirrors(view: &RenderView, router: &EngineRouter) {
        for i in 0..SAMPLER_VOICES {
            assert_eq!(view.sampler_voice(i), router.sampler().voice(i), "sampler {i}");
        }
        for i in 0..GRANULAR_VOICES {
            assert_eq!(view.granular_voice(i), router.granular().voice(i), "granular {i}");
        }
        for i in 0..RESONATOR_VOICES {
            assert_eq!(view.resonator_voice(i), router.resonator().voice(i), "resonator {i}");
        }
        assert_eq!(view.burst_triggers(), router.burst().pending_triggers());
    }

    // === Delivery ===

    #[test]
    fn writes_are_visible_after_drain() {
        let (mut sink, mut view) = render_channel(16);
        let mut router = EngineRouter::new(Target::Simulated);
        let genome = SeedGenome { id: 2, ..SeedGenome::default() };
        router.dispatch(&genome, 480, &mut sink);

        assert!(!view.sampler_voice(0).active);
        assert_eq!(view.drain(), 1);
        let v = view.sampler_voice(0);
        assert!(v.active);
        assert_eq!(v.seed_id, 2);
        assert_eq!(v.start_sample, 480);
        assert_eq!(v, router.sampler().voice(0));
        assert_eq!(sink.deferred(), 0);
    }

    #[test]
    fn full_ring_defers_without_blocking() {
        let (mut sink, mut view) = render_channel(2);
        for _ in 0..5 {
            sink.publish(VoiceUpdate::Panic);
        }
        // Repeated panics collapse into one outstanding resend.
        assert_eq!(sink.deferred(), 3);
        assert!(sink.pending());
        assert_eq!(view.drain(), 2);
        sink.flush();
        assert!(!sink.pending());
        assert_eq!(view.drain(), 1);
    }

    // === Resync ===

    #[test]
    fn mirror_catches_up_after_overfill() {
        let (mut sink, mut view) = render_channel(2);
        let mut router = EngineRouter::new(Target::Simulated);
        for i in 0..4u32 {
            router.dispatch(&SeedGenome::with_id(i), i * 100, &mut sink);
        }
        assert_eq!(sink.deferred(), 2);
        assert_eq!(view.drain(), 2);
        assert!(!view.sampler_voice(2).active);

        sink.flush();
        assert!(!sink.pending());
        assert_eq!(view.drain(), 2);
        for i in 0..SAMPLER_VOICES {
            assert_eq!(view.sampler_voice(i), router.sampler().voice(i));
        }
    }

    #[test]
    fn stolen_voices_converge_on_latest_value() {
        let (mut sink, mut view) = render_channel(3);
        let mut router = EngineRouter::new(Target::Simulated);
        for i in 0..48u32 {
            let genome = SeedGenome { engine_id: (i % 5) as u8, ..SeedGenome::with_id(i) };
            router.dispatch(&genome, i * 37, &mut sink);
            router.on_tick(&mut sink);
        }
        assert!(sink.pending());
        settle(&mut sink, &mut view);
        assert_mirrors(&view, &router);
    }

    #[test]
    fn panic_during_backlog_is_replayed_first() {
        let (mut sink, mut view) = render_channel(1);
        let mut router = EngineRouter::new(Target::Simulated);
        for i in 0..6u32 {
            router.dispatch(&SeedGenome { engine_id: 2, ..SeedGenome::with_id(i) }, 0, &mut sink);
        }
        router.panic(&mut sink);
        router.dispatch(&SeedGenome::with_id(9), 10, &mut sink);
        settle(&mut sink, &mut view);
        assert_mirrors(&view, &router);
        assert_eq!(view.active_voices(), 1);
    }

    #[test]
    fn panic_clears_mirror() {
        let (mut sink, mut view) = render_channel(16);
        let mut router = EngineRouter::new(Target::Simulated);
        router.dispatch(&SeedGenome { engine_id: 2, ..SeedGenome::default() }, 0, &mut sink);
        view.drain();
        assert_eq!(view.active_voices(), 1);
        router.panic(&mut sink);
        view.drain();
        assert_eq!(view.active_voices(), 0);
    }

    #[test]
    fn out_of_range_reads_are_placeholders() {
        let (_sink, view) = render_channel(1);
        assert!(!view.granular_voice(999).active);
    }

    #[test]
    fn stray_index_is_ignored() {
        let (mut sink, mut view) = render_channel(4);
        sink.publish(VoiceUpdate::Sampler {
            index: VoiceIndex::new(99),
            slot: VoiceSlot::default(),
        });
        assert!(!sink.pending());
        assert_eq!(view.drain(), 0);
    }

    #[test]
    fn render_thread_sees_updates() {
        let (mut sink, mut view) = render_channel(64);
        let reader = std::thread::spawn(move || {
            let mut seen = 0;
            while seen < 8 {
                seen += view.drain();
                std::thread::yield_now();
            }
            view
        });
        let mut router = EngineRouter::new(Target::Simulated);
        for i in 0..8u32 {
            router.dispatch(&SeedGenome::with_id(i), i * 10, &mut sink);
        }
        let view = reader.join().unwrap();
        assert_eq!(view.active_voices(), 4);
    }
}
