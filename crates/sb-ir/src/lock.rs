//! Seed locks: which genomes the generation step must leave alone.

use alloc::vec::Vec;

/// Per-seed and global mutation guards.
///
/// Indices past the end of the per-seed table read as unlocked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeedLock {
    per_seed: Vec<bool>,
    global: bool,
}

impl SeedLock {
    /// Nothing locked, empty per-seed table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unlock everything, keeping the table length.
    pub fn clear(&mut self) {
        self.per_seed.iter_mut().for_each(|l| *l = false);
        self.global = false;
    }

    /// Resize the per-seed table. Growing preserves existing flags; shrinking truncates.
    pub fn resize(&mut self, count: usize) {
        self.per_seed.resize(count, false);
    }

    /// Number of per-seed flags tracked.
    pub fn len(&self) -> usize {
        self.per_seed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_seed.is_empty()
    }

    /// Lock or unlock one seed, growing the table if needed.
    pub fn set_seed_locked(&mut self, index: usize, locked: bool) {
        if index >= self.per_seed.len() {
            self.per_seed.resize(index + 1, false);
        }
        self.per_seed[index] = locked;
    }

    /// Flip one seed's own flag. The global lock is not consulted, so a
    /// seed toggled under it keeps its new flag once the global lock lifts.
    pub fn toggle_seed_lock(&mut self, index: usize) {
        let locked = self.raw_lock(index);
        self.set_seed_locked(index, !locked);
    }

    /// True when the seed is locked directly or by the global lock.
    pub fn seed_locked(&self, index: usize) -> bool {
        self.global || self.raw_lock(index)
    }

    pub fn set_global_lock(&mut self, locked: bool) {
        self.global = locked;
    }

    /// Freeze or release the whole table. Per-seed flags are untouched.
    pub fn toggle_global_lock(&mut self) {
        self.global = !self.global;
    }

    pub fn global_locked(&self) -> bool {
        self.global
    }

    fn raw_lock(&self, index: usize) -> bool {
        self.per_seed.get(index).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_reads_unlocked() {
        let lock = SeedLock::new();
        assert!(!lock.seed_locked(7));
    }

    #[test]
    fn global_lock_overrides_per_seed() {
        let mut lock = SeedLock::new();
        lock.resize(4);
        assert!(!lock.seed_locked(2));
        lock.set_global_lock(true);
        assert!(lock.seed_locked(2));
        assert!(lock.seed_locked(99));
        lock.toggle_global_lock();
        assert!(!lock.seed_locked(2));
    }

    #[test]
    fn set_grows_table() {
        let mut lock = SeedLock::new();
        lock.set_seed_locked(5, true);
        assert_eq!(lock.len(), 6);
        assert!(lock.seed_locked(5));
        assert!(!lock.seed_locked(4));
    }

    #[test]
    fn resize_preserves_then_truncates() {
        let mut lock = SeedLock::new();
        lock.set_seed_locked(1, true);
        lock.resize(8);
        assert!(lock.seed_locked(1));
        lock.resize(1);
        assert_eq!(lock.len(), 1);
        assert!(!lock.seed_locked(1));
        lock.resize(4);
        assert!(!lock.seed_locked(1), "truncated flags do not come back");
    }

    #[test]
    fn toggle_flips_single_seed() {
        let mut lock = SeedLock::new();
        lock.toggle_seed_lock(0);
        assert!(lock.seed_locked(0));
        lock.toggle_seed_lock(0);
        assert!(!lock.seed_locked(0));
    }

    #[test]
    fn clear_unlocks_everything() {
        let mut lock = SeedLock::new();
        lock.set_seed_locked(2, true);
        lock.set_global_lock(true);
        lock.clear();
        assert_eq!(lock.len(), 3);
        assert!(!lock.seed_locked(2));
        assert!(!lock.global_locked());
    }
}
