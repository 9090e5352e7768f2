//! The explicit context the control loop runs against.
//!
//! A [`Controller`] owns the transport, the scheduler with its genome table,
//! the router with its five engines, the lock table, and the sink voice state
//! is published through. Every control-surface action is a method on it; the
//! clock calls [`Controller::tick`] (or [`Controller::external_tick`]).

use std::collections::VecDeque;
use std::fmt;
use std::path::Path;

use sb_engine::{
    ClockKind, EngineKind, EngineRouter, NullSink, PatternScheduler, SampleClock,
    SharedSampleClock, SimSampleClock, Transport, VoiceSink,
};
use sb_ir::{
    cycle_granular_source, generate_table, tap_density, tap_interval_bpm, GenomeSnapshot,
    SeedGenome, SeedLock, SeedNudge, SeedPrime, SeedPrimeMode,
};
use tracing::{debug, info, warn};

use crate::settings::SessionConfig;
use crate::error::SessionError;

/// One line of the trigger log: which seed fired, where, and when.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriggerRecord {
    pub tick: u64,
    pub seed_id: u32,
    pub engine: EngineKind,
    pub when_samples: u32,
}

impl fmt::Display for TriggerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>6} seed={:<3} {} @{}",
            self.tick,
            self.seed_id,
            self.engine.short_name(),
            self.when_samples
        )
    }
}

/// Where trigger timestamps come from.
#[derive(Clone, Debug)]
enum SessionClock {
    Sim(SimSampleClock),
    Shared(SharedSampleClock),
}

impl SampleClock for SessionClock {
    fn now_samples(&self) -> u32 {
        match self {
            Self::Sim(clock) => clock.now_samples(),
            Self::Shared(clock) => clock.now_samples(),
        }
    }
}

pub struct Controller<S: VoiceSink = NullSink> {
    transport: Transport,
    scheduler: PatternScheduler,
    router: EngineRouter,
    locks: SeedLock,
    assignments: Vec<u8>,
    master_seed: u32,
    population: usize,
    prime_mode: SeedPrimeMode,
    tap_bpm: f32,
    preset_id: u32,
    preset: Vec<SeedGenome>,
    clock: SessionClock,
    sink: S,
    log: VecDeque<TriggerRecord>,
    log_capacity: usize,
}

impl Controller {
    /// Controller that discards voice updates.
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_sink(config, NullSink)
    }
}

impl<S: VoiceSink> Controller<S> {
    /// Build the session described by `config`, generate the first genome
    /// table from its master seed, and start the internal transport.
    pub fn with_sink(config: &SessionConfig, sink: S) -> Self {
        let sample_rate = config.sample_rate();
        let mut router = EngineRouter::with_sample_rate(config.target(), sample_rate);

        let granular = router.granular_mut();
        granular.arm_live_input(config.live_input_armed);
        for clip in &config.sd_clips {
            granular.register_sd_clip(clip.slot, &clip.name);
        }
        if let Some(voices) = config.granular_max_voices {
            granular.set_max_active_voices(voices);
        }
        if let Some(voices) = config.resonator_max_voices {
            router.resonator_mut().set_max_voices(voices);
        }
        if let Some(range) = config.damping_range {
            router.resonator_mut().set_damping_range(range.min, range.max);
        }
        let euclid = router.euclid_mut();
        euclid.set_steps(config.euclid.steps);
        euclid.set_fills(config.euclid.fills);
        euclid.set_rotate(config.euclid.rotate);
        let burst = router.burst_mut();
        burst.set_cluster_count(config.burst.cluster_count);
        burst.set_spacing_samples(config.burst.spacing_samples);

        let population = config.population;
        let assignments = (0..population)
            .map(|i| router.sanitize_engine_id(config.engines.get(i).copied().unwrap_or(0)))
            .collect();
        let mut locks = SeedLock::new();
        locks.resize(population);

        let log_capacity = config.trigger_log_capacity;
        let mut controller = Self {
            transport: Transport::new(),
            scheduler: PatternScheduler::new(sample_rate),
            router,
            locks,
            assignments,
            master_seed: config.master_seed,
            population,
            prime_mode: SeedPrimeMode::Lfsr,
            tap_bpm: 0.0,
            preset_id: 0,
            preset: Vec::new(),
            clock: SessionClock::Sim(SimSampleClock::new(config.sim_samples_per_tick.max(1))),
            sink,
            log: VecDeque::with_capacity(log_capacity),
            log_capacity,
        };
        controller.set_bpm(config.bpm);
        controller.set_swing(config.swing);
        controller.reseed(config.master_seed);
        controller.start_transport();
        info!(
            build = ?config.target(),
            sample_rate,
            population,
            master_seed = config.master_seed,
            "session ready"
        );
        controller
    }

    /// Timestamp triggers from an audio callback's sample counter instead
    /// of the fixed-increment simulation clock.
    pub fn use_shared_clock(&mut self, clock: SharedSampleClock) {
        self.clock = SessionClock::Shared(clock);
    }

    // --- Seeds ---

    /// Regenerate every unlocked genome from `master_seed`, primed by the
    /// current [`SeedPrimeMode`].
    pub fn reseed(&mut self, master_seed: u32) {
        if self.prime_mode == SeedPrimeMode::Preset {
            for (index, seed) in self.preset.iter().enumerate().take(self.population) {
                if !self.locks.seed_locked(index) {
                    self.assignments[index] = seed.engine_id;
                }
            }
        }
        let table = generate_table(
            master_seed,
            self.scheduler.seeds(),
            &self.locks,
            &self.assignments,
            self.population,
            self.prime(),
        );
        self.scheduler.set_seeds(&table);
        self.router.reseed(master_seed, &self.assignments, &self.locks);
        self.master_seed = master_seed;
        info!(
            master_seed,
            mode = ?self.prime_mode,
            global_lock = self.locks.global_locked(),
            "reseeded"
        );
    }

    /// Switch priming mode and reseed in one gesture.
    pub fn seed_page_reseed(&mut self, master_seed: u32, mode: SeedPrimeMode) {
        self.set_seed_prime_mode(mode);
        self.reseed(master_seed);
    }

    /// Select how later reseeds fill unlocked slots. Does not reseed.
    pub fn set_seed_prime_mode(&mut self, mode: SeedPrimeMode) {
        self.prime_mode = mode;
        debug!(?mode, "seed prime mode set");
    }

    pub fn seed_prime_mode(&self) -> SeedPrimeMode {
        self.prime_mode
    }

    /// Register the interval between two tap-tempo presses. Zero is ignored.
    pub fn record_tap_tempo_interval(&mut self, interval_ms: u32) {
        if let Some(bpm) = tap_interval_bpm(interval_ms) {
            self.tap_bpm = bpm;
            debug!(interval_ms, bpm, "tap tempo");
        }
    }

    /// Last tapped tempo, or 0 before the first tap.
    pub fn current_tap_tempo_bpm(&self) -> f32 {
        self.tap_bpm
    }

    /// Store the genomes preset-mode reseeds copy from. Engine ids are
    /// sanitized on the way in.
    pub fn set_seed_preset(&mut self, preset_id: u32, seeds: &[SeedGenome]) {
        self.preset_id = preset_id;
        self.preset = seeds
            .iter()
            .map(|seed| SeedGenome {
                engine_id: self.router.sanitize_engine_id(seed.engine_id),
                ..*seed
            })
            .collect();
        debug!(preset_id, seeds = self.preset.len(), "seed preset stored");
    }

    pub fn active_preset_id(&self) -> u32 {
        self.preset_id
    }

    fn prime(&self) -> SeedPrime<'_> {
        match self.prime_mode {
            SeedPrimeMode::Lfsr => SeedPrime::Lfsr,
            SeedPrimeMode::TapTempo => {
                // Before the first tap, one gate per clock beat.
                let bpm = if self.tap_bpm > 0.0 { self.tap_bpm } else { self.transport.bpm() };
                SeedPrime::TapTempo { density: tap_density(bpm, self.transport.bpm()) }
            }
            SeedPrimeMode::Preset => SeedPrime::Preset { id: self.preset_id, seeds: &self.preset },
            SeedPrimeMode::LiveInput => SeedPrime::LiveInput,
        }
    }

    /// Assign an engine to a seed slot. The id is sanitized by modulo and
    /// the assignment survives later reseeds.
    pub fn set_seed_engine(&mut self, index: usize, engine_id: u8) {
        let Some(slot) = self.assignments.get_mut(index) else {
            warn!(index, population = self.population, "set_seed_engine out of range");
            return;
        };
        let engine_id = self.router.sanitize_engine_id(engine_id);
        *slot = engine_id;
        if let Some(mut genome) = self.scheduler.seed(index) {
            genome.engine_id = engine_id;
            self.scheduler.update_seed(index, genome);
        }
        debug!(index, engine = self.router.engine_name(engine_id), "seed engine set");
    }

    /// Lock or unlock one slot against later reseeds.
    pub fn set_seed_lock(&mut self, index: usize, locked: bool) {
        self.locks.set_seed_locked(index, locked);
    }

    pub fn toggle_seed_lock(&mut self, index: usize) {
        self.locks.toggle_seed_lock(index);
        debug!(index, locked = self.locks.seed_locked(index), "seed lock toggled");
    }

    pub fn toggle_global_lock(&mut self) {
        self.locks.toggle_global_lock();
        info!(locked = self.locks.global_locked(), "global lock toggled");
    }

    /// Apply a performance edit to one genome. Locks do not block nudges.
    pub fn seed_page_nudge(&mut self, index: usize, nudge: &SeedNudge) {
        if let Some(mut genome) = self.scheduler.seed(index) {
            nudge.apply(&mut genome);
            self.scheduler.update_seed(index, genome);
        }
    }

    /// Step a seed's granular source through live input and the clip slots.
    pub fn cycle_granular_source(&mut self, index: usize, steps: i32) {
        if let Some(mut genome) = self.scheduler.seed(index) {
            cycle_granular_source(&mut genome, steps);
            self.scheduler.update_seed(index, genome);
        }
    }

    // --- Transport ---

    /// Tempo for every clock provider and the scheduler. Non-finite values
    /// are ignored; the floor is 1 BPM.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.transport.set_bpm(bpm);
        self.scheduler.set_bpm(self.transport.bpm());
    }

    /// Swing amount in `[0, 1]`. Only the internal clock applies it.
    pub fn set_swing(&mut self, swing: f32) {
        self.transport.set_swing(swing);
    }

    /// Switch clock provider. The outgoing one stops.
    pub fn select_clock(&mut self, kind: ClockKind) {
        self.transport.select(kind);
    }

    /// Start the active provider. A follower waits for upstream start.
    pub fn start_transport(&mut self) {
        self.transport.start_transport();
    }

    pub fn stop_transport(&mut self) {
        self.transport.stop_transport();
    }

    /// Resume without resetting tick position.
    pub fn continue_transport(&mut self) {
        self.transport.continue_transport();
    }

    /// Upstream start or continue message.
    pub fn external_transport_start(&mut self) {
        self.transport.external_start();
    }

    /// Upstream stop message.
    pub fn external_transport_stop(&mut self) {
        self.transport.external_stop();
    }

    /// Internal clock pulse. Ignored while the external follower is active.
    ///
    /// Returns whether the tick reached the scheduler. The sink is flushed
    /// either way.
    pub fn tick(&mut self) -> bool {
        sb_engine::realtime(|| {
            self.sink.flush();
            self.transport.active_kind() != ClockKind::ExternalFollower && self.advance()
        })
    }

    /// Upstream clock pulse. Only forwarded while following.
    pub fn external_tick(&mut self) -> bool {
        sb_engine::realtime(|| {
            self.sink.flush();
            self.transport.active_kind() == ClockKind::ExternalFollower && self.advance()
        })
    }

    fn advance(&mut self) -> bool {
        let tick = self.scheduler.ticks();
        let router = &mut self.router;
        let sink = &mut self.sink;
        let log = &mut self.log;
        let log_capacity = self.log_capacity;
        let forwarded = self.transport.on_tick(
            &mut self.scheduler,
            &self.clock,
            |genome: &SeedGenome, when_samples: u32| {
                let engine = router.dispatch(genome, when_samples, sink);
                if log_capacity == 0 {
                    return;
                }
                if log.len() == log_capacity {
                    log.pop_front();
                }
                log.push_back(TriggerRecord {
                    tick,
                    seed_id: genome.id,
                    engine,
                    when_samples,
                });
            },
        );
        if forwarded {
            self.router.on_tick(&mut self.sink);
            if let SessionClock::Sim(clock) = &mut self.clock {
                clock.advance();
            }
        }
        forwarded
    }

    /// Silence every voice and rewind the tick-driven engines.
    pub fn panic(&mut self) {
        self.router.panic(&mut self.sink);
        info!("panic");
    }

    // --- Persistence ---

    /// Capture master seed, genomes and locks.
    pub fn snapshot(&self) -> GenomeSnapshot {
        GenomeSnapshot::new(self.master_seed, self.scheduler.seeds(), &self.locks)
    }

    /// Install a snapshot: its genomes, locks, and master seed replace the
    /// current ones. Engine assignments follow the restored genomes.
    pub fn restore(&mut self, snapshot: GenomeSnapshot) {
        let (master_seed, mut genomes, locks) = snapshot.into_parts();
        for genome in &mut genomes {
            genome.engine_id = self.router.sanitize_engine_id(genome.engine_id);
        }
        self.population = genomes.len();
        self.assignments = genomes.iter().map(|g| g.engine_id).collect();
        self.locks = locks;
        self.master_seed = master_seed;
        self.scheduler.set_seeds(&genomes);
        self.router.reseed(master_seed, &self.assignments, &SeedLock::new());
        info!(master_seed, population = self.population, "snapshot restored");
    }

    pub fn snapshot_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    /// Parse and install a JSON snapshot. On error nothing changes.
    pub fn restore_json(&mut self, json: &str) -> Result<(), SessionError> {
        let snapshot: GenomeSnapshot = serde_json::from_str(json)?;
        self.restore(snapshot);
        Ok(())
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<(), SessionError> {
        std::fs::write(path, self.snapshot_json()?)?;
        Ok(())
    }

    pub fn load_snapshot(&mut self, path: &Path) -> Result<(), SessionError> {
        let json = std::fs::read_to_string(path)?;
        self.restore_json(&json)
    }

    // --- Inspection ---

    /// Most recent triggers, oldest first.
    pub fn trigger_log(&self) -> impl Iterator<Item = &TriggerRecord> {
        self.log.iter()
    }

    pub fn clear_trigger_log(&mut self) {
        self.log.clear();
    }

    pub fn genomes(&self) -> &[SeedGenome] {
        self.scheduler.seeds()
    }

    pub fn master_seed(&self) -> u32 {
        self.master_seed
    }

    pub fn population(&self) -> usize {
        self.population
    }

    pub fn assignments(&self) -> &[u8] {
        &self.assignments
    }

    pub fn locks(&self) -> &SeedLock {
        &self.locks
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn scheduler(&self) -> &PatternScheduler {
        &self.scheduler
    }

    pub fn router(&self) -> &EngineRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut EngineRouter {
        &mut self.router
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Wall-clock interval between ticks at the current tempo.
    pub fn tick_interval(&self) -> std::time::Duration {
        let spt = self.transport.samples_per_tick(self.scheduler.sample_rate());
        std::time::Duration::from_secs_f64(spt / f64::from(self.scheduler.sample_rate()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_engine::VoiceUpdate;
    use sb_ir::{GenomeSource, GranularSource};

    fn config() -> SessionConfig {
        SessionConfig {
            master_seed: 0xC0FF_EE00,
            ..SessionConfig::default()
        }
    }

    fn run(controller: &mut Controller<impl VoiceSink>, ticks: usize) {
        for _ in 0..ticks {
            controller.tick();
        }
    }

    // === Seeds ===

    #[test]
    fn new_generates_population() {
        let c = Controller::new(&config());
        assert_eq!(c.genomes().len(), 4);
        assert!(c.genomes().iter().enumerate().all(|(i, g)| g.id == i as u32));
        assert!(c.transport().is_running());
    }

    #[test]
    fn reseed_is_deterministic() {
        let mut a = Controller::new(&config());
        let mut b = Controller::new(&config());
        a.reseed(42);
        b.reseed(42);
        assert_eq!(a.genomes(), b.genomes());
    }

    #[test]
    fn locked_seed_survives_reseed() {
        let mut c = Controller::new(&config());
        let before = c.genomes().to_vec();
        c.toggle_seed_lock(1);
        c.reseed(0xDEAD_BEEF);
        let after = c.genomes();
        assert_eq!(after[1].pitch_semitones, before[1].pitch_semitones);
        assert_eq!(after[1].density, before[1].density);
        assert_eq!(after[1].rng_state, before[1].rng_state);
        assert_ne!(after[0].rng_state, before[0].rng_state);
    }

    #[test]
    fn global_lock_freezes_table() {
        let mut c = Controller::new(&config());
        let before = c.genomes().to_vec();
        c.toggle_global_lock();
        c.reseed(7);
        assert_eq!(c.genomes(), &before[..]);
    }

    #[test]
    fn engine_assignment_is_sanitized_and_survives_reseed() {
        let mut c = Controller::new(&config());
        c.set_seed_engine(2, 7);
        assert_eq!(c.assignments()[2], 2);
        assert_eq!(c.genomes()[2].engine_id, 2);
        c.reseed(99);
        assert_eq!(c.genomes()[2].engine_id, 2);
        c.set_seed_engine(40, 1);
        assert_eq!(c.assignments().len(), 4);
    }

    #[test]
    fn nudge_reaches_locked_seed() {
        let mut c = Controller::new(&config());
        c.toggle_seed_lock(0);
        let before = c.genomes()[0].pitch_semitones;
        c.seed_page_nudge(0, &SeedNudge { pitch_semitones: 2.0, ..SeedNudge::default() });
        assert_eq!(c.genomes()[0].pitch_semitones, before + 2.0);
    }

    // === Seed priming ===

    #[test]
    fn live_input_prime_tags_seeds_as_live() {
        let mut c = Controller::new(&config());
        let start = c.master_seed();
        c.seed_page_reseed(start, SeedPrimeMode::LiveInput);

        assert_eq!(c.master_seed(), start);
        assert_eq!(c.seed_prime_mode(), SeedPrimeMode::LiveInput);
        assert!(!c.genomes().is_empty());
        for g in c.genomes() {
            assert_eq!(g.source, GenomeSource::LiveInput);
            assert_eq!(g.granular.source, GranularSource::LiveInput);
            assert_eq!(g.granular.sd_slot, 0);
            assert_eq!(g.lineage, start);
        }
    }

    #[test]
    fn live_input_prime_respects_every_engine_assignment() {
        let mut c = Controller::new(&config());
        for kind in EngineKind::ALL {
            c.set_seed_engine(0, kind.id());
            let master = c.master_seed();
            c.seed_page_reseed(master, SeedPrimeMode::LiveInput);
            let first = c.genomes()[0];
            assert_eq!(first.engine_id, kind.id());
            assert_eq!(first.source, GenomeSource::LiveInput);
            assert_eq!(first.granular.source, GranularSource::LiveInput);
            assert_eq!(c.router().resolve(first.engine_id), kind);
        }
    }

    #[test]
    fn prime_mode_persists_across_reseeds() {
        let mut c = Controller::new(&config());
        c.set_seed_prime_mode(SeedPrimeMode::LiveInput);
        c.reseed(11);
        assert!(c.genomes().iter().all(|g| g.source == GenomeSource::LiveInput));
        c.set_seed_prime_mode(SeedPrimeMode::Lfsr);
        c.reseed(11);
        assert!(c.genomes().iter().all(|g| g.source == GenomeSource::Lfsr));
    }

    #[test]
    fn tap_tempo_sets_density() {
        let mut c = Controller::new(&config());
        c.set_bpm(120.0);
        c.record_tap_tempo_interval(0);
        assert_eq!(c.current_tap_tempo_bpm(), 0.0);

        c.seed_page_reseed(5, SeedPrimeMode::TapTempo);
        assert!(c.genomes().iter().all(|g| g.density == 1.0));

        c.record_tap_tempo_interval(250);
        assert_eq!(c.current_tap_tempo_bpm(), 240.0);
        c.reseed(5);
        for g in c.genomes() {
            assert_eq!(g.source, GenomeSource::TapTempo);
            assert_eq!(g.density, 2.0);
        }
    }

    #[test]
    fn preset_prime_copies_preset_and_engines() {
        let mut c = Controller::new(&config());
        let mut stored = [SeedGenome::with_id(0), SeedGenome::with_id(1)];
        stored[0].pitch_semitones = 7.0;
        stored[0].engine_id = 3;
        stored[1].engine_id = 6;
        c.toggle_seed_lock(3);
        let locked = c.genomes()[3];
        c.set_seed_preset(42, &stored);
        assert_eq!(c.active_preset_id(), 42);

        c.seed_page_reseed(9, SeedPrimeMode::Preset);
        let g = c.genomes();
        assert_eq!(g[0].source, GenomeSource::Preset);
        assert_eq!(g[0].lineage, 42);
        assert_eq!(g[0].pitch_semitones, 7.0);
        assert_eq!(g[0].engine_id, 3);
        assert_eq!(g[1].engine_id, 1);
        assert_eq!(&c.assignments()[..2], &[3, 1]);
        // Slots past the preset are derived; locks still win.
        assert_eq!(g[2].source, GenomeSource::Lfsr);
        assert_eq!(g[3], locked);
    }

    // === Ticking ===

    #[test]
    fn golden_log_is_reproducible() {
        let mut a = Controller::new(&config());
        let mut b = Controller::new(&config());
        run(&mut a, 24 * 8);
        run(&mut b, 24 * 8);
        let la: Vec<_> = a.trigger_log().copied().collect();
        let lb: Vec<_> = b.trigger_log().copied().collect();
        assert!(!la.is_empty());
        assert_eq!(la, lb);
    }

    #[test]
    fn log_is_bounded() {
        let mut cfg = config();
        cfg.trigger_log_capacity = 3;
        let mut c = Controller::new(&cfg);
        for i in 0..c.population() {
            let mut g = c.genomes()[i];
            g.density = 24.0;
            g.probability = 1.0;
            c.scheduler.update_seed(i, g);
        }
        run(&mut c, 10);
        assert_eq!(c.trigger_log().count(), 3);
        let last = c.trigger_log().last().copied();
        assert_eq!(last.map(|r| r.tick), Some(9));
    }

    #[test]
    fn stopped_transport_does_not_tick() {
        let mut c = Controller::new(&config());
        c.stop_transport();
        assert!(!c.tick());
        assert_eq!(c.scheduler().ticks(), 0);
        c.continue_transport();
        assert!(c.tick());
    }

    #[test]
    fn follower_only_takes_external_ticks() {
        let mut c = Controller::new(&config());
        c.select_clock(ClockKind::ExternalFollower);
        assert!(!c.tick());
        assert!(!c.external_tick());
        c.external_transport_start();
        assert!(c.external_tick());
        assert!(!c.tick());
        c.external_transport_stop();
        assert!(!c.external_tick());
        assert_eq!(c.scheduler().ticks(), 1);
    }

    #[test]
    fn unregistered_engine_falls_back_to_sampler() {
        let mut cfg = config();
        cfg.engines = vec![2, 2, 2, 2];
        let mut c = Controller::with_sink(&cfg, Vec::new());
        c.router_mut().unregister(EngineKind::Resonator);
        for i in 0..c.population() {
            let mut g = c.genomes()[i];
            g.density = 24.0;
            g.probability = 1.0;
            c.scheduler.update_seed(i, g);
        }
        c.tick();
        assert!(c.trigger_log().all(|r| r.engine == EngineKind::Sampler));
        assert!(c
            .sink()
            .iter()
            .all(|u| matches!(u, VoiceUpdate::Sampler { .. })));
        assert_eq!(c.sink().len(), 4);
    }

    #[test]
    fn panic_publishes_and_silences() {
        let mut c = Controller::with_sink(&config(), Vec::new());
        for _ in 0..48 {
            c.tick();
        }
        c.panic();
        assert_eq!(c.sink().last(), Some(&VoiceUpdate::Panic));
        assert_eq!(c.router().sampler().active_voice_count(), 0);
    }

    #[test]
    fn ticks_resync_render_backlog_while_stopped() {
        let (sink, mut view) = crate::render_channel(2);
        let mut c = Controller::with_sink(&config(), sink);
        for i in 0..c.population() {
            let mut g = c.genomes()[i];
            g.density = 24.0;
            g.probability = 1.0;
            g.engine_id = 0;
            c.scheduler.update_seed(i, g);
        }
        c.tick();
        assert!(c.sink().pending());
        c.stop_transport();
        for _ in 0..4 {
            view.drain();
            assert!(!c.tick());
        }
        view.drain();
        assert!(!c.sink().pending());
        for i in 0..4 {
            assert_eq!(view.sampler_voice(i), c.router().sampler().voice(i));
        }
    }

    #[test]
    fn tick_interval_follows_tempo() {
        let mut c = Controller::new(&config());
        c.set_bpm(125.0);
        // 60 / (125 * 24) = 20 ms
        let ms = c.tick_interval().as_secs_f64() * 1000.0;
        assert!((ms - 20.0).abs() < 1e-9);
    }

    // === Persistence ===

    #[test]
    fn snapshot_restores_table_and_locks() {
        let mut c = Controller::new(&config());
        c.set_seed_engine(3, 4);
        c.toggle_seed_lock(3);
        let json = c.snapshot_json().unwrap();

        let mut other = Controller::new(&SessionConfig::default());
        other.restore_json(&json).unwrap();
        assert_eq!(other.genomes(), c.genomes());
        assert_eq!(other.master_seed(), c.master_seed());
        assert!(other.locks().seed_locked(3));
        assert_eq!(other.assignments()[3], 4);
    }

    #[test]
    fn restore_sanitizes_engine_ids() {
        let c = Controller::new(&config());
        let mut genomes = c.genomes().to_vec();
        genomes[0].engine_id = 200;
        genomes[1].engine_id = 7;
        let snapshot = GenomeSnapshot::new(0x77, &genomes, &SeedLock::new());

        let mut other = Controller::new(&config());
        other.restore(snapshot);
        assert_eq!(&other.assignments()[..2], &[0, 2]);
        assert_eq!(other.genomes()[0].engine_id, 0);
        assert_eq!(other.genomes()[1].engine_id, 2);
        other.reseed(0x78);
        assert_eq!(other.genomes()[0].engine_id, 0);
        assert_eq!(other.genomes()[1].engine_id, 2);
    }

    #[test]
    fn snapshot_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seeds.json");
        let c = Controller::new(&config());
        c.save_snapshot(&path).unwrap();
        let mut other = Controller::new(&SessionConfig::default());
        other.load_snapshot(&path).unwrap();
        assert_eq!(other.genomes(), c.genomes());
    }

    #[test]
    fn bad_snapshot_is_an_error() {
        let mut c = Controller::new(&config());
        let before = c.genomes().to_vec();
        assert!(matches!(c.restore_json("{ nope"), Err(SessionError::Snapshot(_))));
        assert_eq!(c.genomes(), &before[..]);
    }
}
