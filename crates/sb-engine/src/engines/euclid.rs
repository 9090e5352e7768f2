//! Euclidean gate generator: one gate per tick from a steps/fills/rotate mask.

use heapless::Vec;
use sb_ir::SeedGenome;

pub const MAX_STEPS: u8 = 32;

const DEFAULT_STEPS: u8 = 16;
const DEFAULT_FILLS: u8 = 4;

pub type EuclidMask = Vec<bool, { MAX_STEPS as usize }>;

/// Spread `fills` gates over `steps` slots, then rotate by rewriting slot
/// `(i + steps - rotate) % steps`.
pub fn euclid_mask(steps: u8, fills: u8, rotate: u8) -> EuclidMask {
    let steps = u32::from(steps.clamp(1, MAX_STEPS));
    let fills = u32::from(fills).min(steps);
    let rotate = u32::from(rotate) % steps;

    let mut gates = [false; MAX_STEPS as usize];
    for i in 0..steps {
        let gate = (i + 1) * fills / steps > i * fills / steps;
        gates[((i + steps - rotate) % steps) as usize] = gate;
    }
    // `steps` is clamped to MAX_STEPS, so the collect always fits.
    gates[..steps as usize].iter().copied().collect()
}

#[derive(Clone, Debug)]
pub struct EuclidEngine {
    steps: u8,
    fills: u8,
    rotate: u8,
    mask: EuclidMask,
    cursor: u32,
    last_gate: bool,
    generation_seed: u32,
    last_seed_id: u32,
}

impl EuclidEngine {
    pub fn new() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            fills: DEFAULT_FILLS,
            rotate: 0,
            mask: euclid_mask(DEFAULT_STEPS, DEFAULT_FILLS, 0),
            cursor: 0,
            last_gate: false,
            generation_seed: 0,
            last_seed_id: 0,
        }
    }

    /// Pin the engine to a master seed and rewind.
    pub fn prepare(&mut self, master_seed: u32) {
        self.generation_seed = master_seed;
        self.cursor = 0;
        self.last_seed_id = 0;
        self.rebuild_mask();
    }

    /// Steps clamp to `1..=32`; fills and rotate are re-fit to the new length.
    pub fn set_steps(&mut self, steps: i32) {
        self.steps = steps.clamp(1, i32::from(MAX_STEPS)) as u8;
        self.fills = self.fills.min(self.steps);
        self.rotate %= self.steps;
        self.rebuild_mask();
    }

    pub fn set_fills(&mut self, fills: i32) {
        self.fills = fills.clamp(0, i32::from(self.steps)) as u8;
        self.rebuild_mask();
    }

    /// Rotation wraps, so negative values rotate the other way.
    pub fn set_rotate(&mut self, rotate: i32) {
        self.rotate = rotate.rem_euclid(i32::from(self.steps)) as u8;
        self.rebuild_mask();
    }

    fn rebuild_mask(&mut self) {
        self.mask = euclid_mask(self.steps, self.fills, self.rotate);
        self.cursor %= self.mask.len().max(1) as u32;
    }

    /// Read the gate under the cursor, then advance.
    pub fn on_tick(&mut self) -> bool {
        let len = self.mask.len() as u32;
        if len == 0 {
            self.last_gate = false;
            return false;
        }
        self.last_gate = self.mask[(self.cursor % len) as usize];
        self.cursor = self.cursor.wrapping_add(1);
        self.last_gate
    }

    /// A seed routed here only records its id; gates come from ticks.
    pub fn trigger(&mut self, genome: &SeedGenome, _when_samples: u32) {
        self.last_seed_id = genome.id;
    }

    pub fn panic(&mut self) {
        self.cursor = 0;
        self.last_gate = false;
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn steps(&self) -> u8 {
        self.steps
    }

    pub fn fills(&self) -> u8 {
        self.fills
    }

    pub fn rotate(&self) -> u8 {
        self.rotate
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn last_gate(&self) -> bool {
        self.last_gate
    }

    pub fn generation_seed(&self) -> u32 {
        self.generation_seed
    }

    pub fn last_seed_id(&self) -> u32 {
        self.last_seed_id
    }
}

impl Default for EuclidEngine {
    fn default() -> Self {
        Self::new()
    }
}
