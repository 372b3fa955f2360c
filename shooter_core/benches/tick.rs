use std::sync::Arc;
use std::time::Duration;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use shooter_core::Shooter;
use shooter_core::regulator::{ModelTag, StateSpaceRegulator};
use shooter_core::shaper::ReferenceShaper;
use shooter_hardware::{SimFlywheel, SimParams};
use shooter_traits::ManualClock;

fn bench_shaped_update(c: &mut Criterion) {
    c.bench_function("shaper_step_regulator", |b| {
        b.iter_batched(
            || (StateSpaceRegulator::new(ModelTag::Shooter), ReferenceShaper::new(0.02)),
            |(mut reg, mut shaper)| {
                let mut pos = 0.0;
                for _ in 0..100 {
                    let step = shaper.step(&mut reg, black_box(50.0), pos);
                    pos += 6.28;
                    black_box(step.control.ok());
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_tick(c: &mut Criterion) {
    c.bench_function("shooter_tick_sim", |b| {
        b.iter_batched(
            || {
                let sim = SimFlywheel::new(SimParams::default());
                let clock = ManualClock::new();
                let mut shooter = Shooter::builder()
                    .with_motors(sim.left_motor(), sim.right_motor())
                    .with_encoder(sim.encoder())
                    .with_clock(Arc::new(clock.clone()))
                    .build()
                    .unwrap();
                shooter.set_target_velocity(50.0);
                (shooter, sim, clock)
            },
            |(mut shooter, sim, clock)| {
                for _ in 0..100 {
                    black_box(shooter.tick());
                    sim.advance(Duration::from_millis(20));
                    clock.advance(Duration::from_millis(20));
                }
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_shaped_update, bench_tick);
criterion_main!(benches);
