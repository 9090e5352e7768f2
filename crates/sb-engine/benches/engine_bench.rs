use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sb_engine::{EngineKind, EngineRouter, NullSink, PatternScheduler, SimSampleClock, Target};
use sb_ir::{generate_table, SeedLock, SeedPrime};

fn bench_tick(c: &mut Criterion) {
    let assignments: Vec<u8> = EngineKind::ALL.iter().map(|k| k.id()).collect();
    let table = generate_table(0xC0DE_5EED, &[], &SeedLock::new(), &assignments, 16, SeedPrime::Lfsr);

    c.bench_function("tick_16_seeds", |b| {
        let mut scheduler = PatternScheduler::new(48_000);
        scheduler.set_seeds(&table);
        let mut router = EngineRouter::new(Target::Simulated);
        let mut clock = SimSampleClock::default();
        b.iter(|| {
            scheduler.on_tick(&clock, 0.0, |genome, when| {
                router.dispatch(genome, when, &mut NullSink);
            });
            router.on_tick(&mut NullSink);
            clock.advance();
        });
    });
}

fn bench_granular_plan(c: &mut Criterion) {
    let table = generate_table(7, &[], &SeedLock::new(), &[1], 1, SeedPrime::Lfsr);
    let router = EngineRouter::new(Target::Hardware);
    c.bench_function("granular_plan", |b| {
        b.iter(|| router.granular().plan(black_box(&table[0]), black_box(4800)))
    });
}

criterion_group!(benches, bench_tick, bench_granular_plan);
criterion_main!(benches);
