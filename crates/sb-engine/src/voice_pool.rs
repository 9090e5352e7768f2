//! VoicePool: fixed-capacity voice slots with deterministic stealing.
//!
//! Slots live in an inline array; nothing here allocates. A runtime limit
//! lets an engine use only a prefix of its capacity.

use tracing::debug;

/// Index of a slot inside one engine's pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceIndex(usize);

impl VoiceIndex {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn get(self) -> usize {
        self.0
    }
}

/// One voice slot plus the engine-specific derived parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VoiceSlot<P> {
    pub active: bool,
    /// Monotonic allocation handle; 0 means never allocated
    pub handle: u32,
    pub start_sample: u32,
    pub seed_id: u32,
    pub params: P,
}

/// Pool of `N` slots with a runtime-adjustable active limit.
#[derive(Clone, Debug)]
pub struct VoicePool<P, const N: usize> {
    slots: [VoiceSlot<P>; N],
    limit: usize,
    next_handle: u32,
}

impl<P: Copy + Default, const N: usize> VoicePool<P, N> {
    pub const CAPACITY: usize = N;

    /// Empty pool using the full capacity.
    pub fn new() -> Self {
        Self::with_limit(N)
    }

    /// Empty pool limited to the first `limit` slots (clamped to `1..=N`).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            slots: [VoiceSlot::default(); N],
            limit: limit.clamp(1, N.max(1)),
            next_handle: 1,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the active limit (clamped to `1..=N`). Slots past the new limit
    /// are silenced.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.clamp(1, N.max(1));
        for slot in self.slots.iter_mut().skip(self.limit) {
            slot.active = false;
        }
    }

    /// Claim a slot for a voice starting at `start_sample`.
    ///
    /// Takes the first inactive slot; when all are busy, evicts the slot with
    /// the smallest `(start_sample, handle)`.
    pub fn allocate(&mut self, start_sample: u32, seed_id: u32, params: P) -> VoiceIndex {
        let index = match self.slots[..self.limit].iter().position(|s| !s.active) {
            Some(free) => free,
            None => {
                let victim = self.steal_candidate();
                debug!(
                    slot = victim,
                    handle = self.slots[victim].handle,
                    start_sample = self.slots[victim].start_sample,
                    "stealing voice"
                );
                victim
            }
        };

        let handle = self.take_handle();
        self.slots[index] = VoiceSlot {
            active: true,
            handle,
            start_sample,
            seed_id,
            params,
        };
        VoiceIndex(index)
    }

    fn steal_candidate(&self) -> usize {
        self.slots[..self.limit]
            .iter()
            .enumerate()
            .min_by_key(|(_, s)| (s.start_sample, s.handle))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn take_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle = match self.next_handle.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        handle
    }

    /// Copy of slot `index`; an inactive placeholder when out of range.
    pub fn voice(&self, index: usize) -> VoiceSlot<P> {
        self.slots.get(index).copied().unwrap_or_default()
    }

    pub fn slot(&self, index: VoiceIndex) -> &VoiceSlot<P> {
        &self.slots[index.0]
    }

    pub fn slot_mut(&mut self, index: VoiceIndex) -> &mut VoiceSlot<P> {
        &mut self.slots[index.0]
    }

    /// Slots within the active limit.
    pub fn slots(&self) -> &[VoiceSlot<P>] {
        &self.slots[..self.limit]
    }

    pub fn active_count(&self) -> usize {
        self.slots().iter().filter(|s| s.active).count()
    }

    pub fn release(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.active = false;
        }
    }

    /// Silence every voice. Handles keep counting.
    pub fn release_all(&mut self) {
        self.slots.iter_mut().for_each(|s| s.active = false);
    }

    pub fn next_handle(&self) -> u32 {
        self.next_handle
    }
}

impl<P: Copy + Default, const N: usize> Default for VoicePool<P, N> {
    fn default() -> Self {
        Self::new()
    }
}
