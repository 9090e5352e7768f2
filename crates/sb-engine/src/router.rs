//! EngineRouter: static dispatch from a genome's engine id to one of the
//! five engines.
//!
//! Ids are sanitized by modulo; any id whose engine is not registered lands
//! on the Sampler. A wrong-sounding voice beats a dropped trigger.

use sb_ir::units::{HARDWARE_SAMPLE_RATE, SIM_SAMPLE_RATE};
use sb_ir::{SeedGenome, SeedLock};
use tracing::{debug, info};

use crate::engines::{BurstEngine, EuclidEngine, GranularEngine, ResonatorEngine, SamplerEngine};
use crate::sink::{VoiceSink, VoiceUpdate};

/// The closed set of engines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EngineKind {
    #[default]
    Sampler,
    Granular,
    Resonator,
    Euclid,
    Burst,
}

impl EngineKind {
    pub const COUNT: usize = 5;
    pub const ALL: [EngineKind; Self::COUNT] = [
        Self::Sampler,
        Self::Granular,
        Self::Resonator,
        Self::Euclid,
        Self::Burst,
    ];

    pub const fn id(self) -> u8 {
        match self {
            Self::Sampler => 0,
            Self::Granular => 1,
            Self::Resonator => 2,
            Self::Euclid => 3,
            Self::Burst => 4,
        }
    }

    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Sampler),
            1 => Some(Self::Granular),
            2 => Some(Self::Resonator),
            3 => Some(Self::Euclid),
            4 => Some(Self::Burst),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Sampler => "Sampler",
            Self::Granular => "Granular",
            Self::Resonator => "Resonator",
            Self::Euclid => "Euclid",
            Self::Burst => "Burst",
        }
    }

    pub const fn short_name(self) -> &'static str {
        match self {
            Self::Sampler => "SMP",
            Self::Granular => "GRA",
            Self::Resonator => "RES",
            Self::Euclid => "EUC",
            Self::Burst => "BST",
        }
    }
}

/// Build target, picked once at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Target {
    #[default]
    Simulated,
    Hardware,
}

impl Target {
    pub const fn sample_rate(self) -> u32 {
        match self {
            Self::Simulated => SIM_SAMPLE_RATE,
            Self::Hardware => HARDWARE_SAMPLE_RATE,
        }
    }

    pub const fn granular_voices(self) -> usize {
        match self {
            Self::Simulated => 12,
            Self::Hardware => 32,
        }
    }

    pub const fn resonator_voices(self) -> usize {
        match self {
            Self::Simulated => 4,
            Self::Hardware => 10,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EngineRouter {
    target: Target,
    sampler: SamplerEngine,
    granular: GranularEngine,
    resonator: ResonatorEngine,
    euclid: EuclidEngine,
    burst: BurstEngine,
    registered: [bool; EngineKind::COUNT],
}

impl EngineRouter {
    /// Router with every engine registered, at the target's native rate.
    pub fn new(target: Target) -> Self {
        Self::with_sample_rate(target, target.sample_rate())
    }

    pub fn with_sample_rate(target: Target, sample_rate: u32) -> Self {
        Self {
            target,
            sampler: SamplerEngine::new(),
            granular: GranularEngine::new(target.granular_voices(), sample_rate),
            resonator: ResonatorEngine::new(target.resonator_voices(), sample_rate),
            euclid: EuclidEngine::new(),
            burst: BurstEngine::new(),
            registered: [true; EngineKind::COUNT],
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn engine_count(&self) -> usize {
        EngineKind::COUNT
    }

    /// Wrap any id into `0..engine_count`.
    pub fn sanitize_engine_id(&self, engine_id: u8) -> u8 {
        (usize::from(engine_id) % EngineKind::COUNT) as u8
    }

    /// Engine that will actually handle `engine_id`.
    pub fn resolve(&self, engine_id: u8) -> EngineKind {
        let kind = EngineKind::from_id(self.sanitize_engine_id(engine_id)).unwrap_or_default();
        if self.is_registered(kind) {
            kind
        } else {
            EngineKind::Sampler
        }
    }

    pub fn engine_name(&self, engine_id: u8) -> &'static str {
        self.resolve(engine_id).name()
    }

    pub fn engine_short_name(&self, engine_id: u8) -> &'static str {
        self.resolve(engine_id).short_name()
    }

    pub fn register(&mut self, kind: EngineKind) {
        self.registered[usize::from(kind.id())] = true;
    }

    /// Drop an engine's handler. The Sampler is the fallback and stays.
    pub fn unregister(&mut self, kind: EngineKind) -> bool {
        if kind == EngineKind::Sampler {
            return false;
        }
        self.registered[usize::from(kind.id())] = false;
        true
    }

    pub fn is_registered(&self, kind: EngineKind) -> bool {
        self.registered[usize::from(kind.id())]
    }

    /// Route one trigger and publish the resulting voice state.
    pub fn dispatch<S>(&mut self, genome: &SeedGenome, when_samples: u32, sink: &mut S) -> EngineKind
    where
        S: VoiceSink + ?Sized,
    {
        let kind = self.resolve(genome.engine_id);
        if kind.id() != genome.engine_id {
            debug!(
                seed = genome.id,
                requested = genome.engine_id,
                engine = kind.name(),
                "engine id fell back"
            );
        }
        match kind {
            EngineKind::Sampler => {
                let index = self.sampler.trigger(genome, when_samples);
                let slot = self.sampler.voice(index.get());
                sink.publish(VoiceUpdate::Sampler { index, slot });
            }
            EngineKind::Granular => {
                let index = self.granular.trigger(genome, when_samples);
                let slot = self.granular.voice(index.get());
                sink.publish(VoiceUpdate::Granular { index, slot });
            }
            EngineKind::Resonator => {
                let index = self.resonator.trigger(genome, when_samples);
                let slot = self.resonator.voice(index.get());
                sink.publish(VoiceUpdate::Resonator { index, slot });
            }
            EngineKind::Euclid => self.euclid.trigger(genome, when_samples),
            EngineKind::Burst => {
                self.burst.trigger(genome, when_samples);
                sink.publish(VoiceUpdate::burst(genome.id, self.burst.pending_triggers()));
            }
        }
        kind
    }

    /// Per-tick work for the tick-driven engines. Returns the Euclid gate.
    pub fn on_tick<S: VoiceSink + ?Sized>(&mut self, sink: &mut S) -> bool {
        if !self.is_registered(EngineKind::Euclid) {
            return false;
        }
        let step = self.euclid.cursor();
        let gate = self.euclid.on_tick();
        if gate {
            sink.publish(VoiceUpdate::EuclidGate { step, gate });
        }
        gate
    }

    /// Re-pin the seed-driven engines to `master_seed`.
    ///
    /// Euclid and Burst follow a reseed unless every seed assigned to them is
    /// locked (or the global lock is on).
    pub fn reseed(&mut self, master_seed: u32, assignments: &[u8], locks: &SeedLock) {
        if locks.global_locked() {
            return;
        }
        for kind in [EngineKind::Euclid, EngineKind::Burst] {
            let mut assigned = assignments
                .iter()
                .enumerate()
                .filter(|(_, id)| self.resolve(**id) == kind)
                .peekable();
            let follow = assigned.peek().is_none() || assigned.any(|(i, _)| !locks.seed_locked(i));
            if !follow {
                continue;
            }
            match kind {
                EngineKind::Euclid => self.euclid.prepare(master_seed),
                _ => self.burst.prepare(master_seed),
            }
            info!(engine = kind.name(), master_seed, "engine reseeded");
        }
    }

    /// Silence everything and rewind the tick-driven engines.
    pub fn panic<S: VoiceSink + ?Sized>(&mut self, sink: &mut S) {
        self.sampler.panic();
        self.granular.panic();
        self.resonator.panic();
        self.euclid.panic();
        self.burst.panic();
        sink.publish(VoiceUpdate::Panic);
    }

    pub fn sampler(&self) -> &SamplerEngine {
        &self.sampler
    }

    pub fn sampler_mut(&mut self) -> &mut SamplerEngine {
        &mut self.sampler
    }

    pub fn granular(&self) -> &GranularEngine {
        &self.granular
    }

    pub fn granular_mut(&mut self) -> &mut GranularEngine {
        &mut self.granular
    }

    pub fn resonator(&self) -> &ResonatorEngine {
        &self.resonator
    }

    pub fn resonator_mut(&mut self) -> &mut ResonatorEngine {
        &mut self.resonator
    }

    pub fn euclid(&self) -> &EuclidEngine {
        &self.euclid
    }

    pub fn euclid_mut(&mut self) -> &mut EuclidEngine {
        &mut self.euclid
    }

    pub fn burst(&self) -> &BurstEngine {
        &self.burst
    }

    pub fn burst_mut(&mut self) -> &mut BurstEngine {
        &mut self.burst
    }
}
