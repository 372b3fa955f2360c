use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;
use shooter_core::mocks::{
    RecordingHood, RecordingMotor, RecordingTelemetry, RecordingTuning, ScriptedEncoder,
};
use shooter_config::{DEFAULTS, Tunables, names};
use shooter_core::{ControlCfg, ControlMode, Shooter, ShotPreset};
use shooter_traits::ManualClock;

const COUNTS_PER_TICK_AT_50: i64 = 128;

struct Rig {
    shooter: Shooter,
    encoder: ScriptedEncoder,
    left: RecordingMotor,
    right: RecordingMotor,
    hood: RecordingHood,
    telemetry: RecordingTelemetry,
    tuning: RecordingTuning,
    clock: ManualClock,
}

fn rig() -> Rig {
    let encoder = ScriptedEncoder::new();
    let left = RecordingMotor::new();
    let right = RecordingMotor::new();
    let hood = RecordingHood::new();
    let telemetry = RecordingTelemetry::new();
    let tuning = RecordingTuning::new();
    let clock = ManualClock::new();
    let shooter = Shooter::builder()
        .with_motors(left.clone(), right.clone())
        .with_encoder(encoder.clone())
        .with_hood(hood.clone())
        .with_telemetry(telemetry.clone())
        .with_tuning_sink(tuning.clone())
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    Rig {
        shooter,
        encoder,
        left,
        right,
        hood,
        telemetry,
        tuning,
        clock,
    }
}

impl Rig {
    fn tick(&mut self) -> bool {
        let at = self.shooter.tick();
        self.clock.advance(Duration::from_millis(20));
        at
    }
}

/// Readings for a wheel whose per-tick advance ramps linearly to 50 rev/s over `ramp_ticks`.
fn queue_ramp(encoder: &ScriptedEncoder, ramp_ticks: i64, total_ticks: i64) {
    let mut raw = 0;
    encoder.push(raw);
    for k in 1..total_ticks {
        raw += COUNTS_PER_TICK_AT_50 * k.min(ramp_ticks) / ramp_ticks;
        encoder.push(raw);
    }
}

#[test]
fn ramp_to_fifty_reaches_and_holds_target() {
    let mut r = rig();
    r.shooter.set_target_velocity(50.0);
    queue_ramp(&r.encoder, 100, 500);

    let mut first = None;
    for n in 1..=500 {
        let at = r.tick();
        if at && first.is_none() {
            first = Some(n);
        }
        if let Some(f) = first {
            assert!(at, "lost target on tick {n} after reaching it on {f}");
        }
    }
    let first = first.expect("never reached target");
    assert!((95..=110).contains(&first), "first at-target tick {first}");
    assert!((r.shooter.velocity() - 50.0).abs() < 1e-9);
}

#[test]
fn commands_stay_one_directional_and_bounded() {
    let mut r = rig();
    r.shooter.set_target_velocity(50.0);
    queue_ramp(&r.encoder, 100, 300);
    for _ in 0..300 {
        r.tick();
    }
    let cmds = r.left.commands();
    assert_eq!(cmds.len(), 300);
    assert!(cmds.iter().all(|c| (0.0..=1.0).contains(c)), "{cmds:?}");
    assert_eq!(cmds, r.right.commands());
}

#[test]
fn zero_target_forces_exactly_zero_power() {
    let mut r = rig();
    r.shooter.set_target_velocity(50.0);
    r.encoder.push(0);
    r.encoder.push_constant_rate(COUNTS_PER_TICK_AT_50, 200);
    for _ in 0..150 {
        r.tick();
    }
    assert!(r.shooter.last_power() > 0.0);

    r.shooter.set_target_velocity(0.0);
    for _ in 0..50 {
        r.tick();
        assert_eq!(r.shooter.last_power(), 0.0);
        assert!(r.shooter.snapshot().stopped);
    }
    assert_eq!(r.left.last(), Some(0.0));
}

#[test]
fn reset_reproduces_fresh_trajectory() {
    let script = |enc: &ScriptedEncoder| {
        enc.push(1_000);
        enc.push_constant_rate(40, 30);
        enc.push_constant_rate(128, 60);
    };

    let mut fresh = rig();
    fresh.shooter.set_target_velocity(45.0);
    script(&fresh.encoder);
    let expected: Vec<_> = (0..91)
        .map(|_| {
            fresh.tick();
            let s = fresh.shooter.snapshot().clone();
            (s.power, s.velocity, s.x_hat, s.at_target)
        })
        .collect();

    let mut reused = rig();
    reused.shooter.set_target_velocity(45.0);
    reused.encoder.push(-5_000);
    reused.encoder.push_constant_rate(90, 40);
    for _ in 0..41 {
        reused.tick();
    }
    reused.shooter.reset();
    assert!(!reused.shooter.at_target_velocity());
    assert_eq!(reused.shooter.velocity(), 0.0);
    assert_eq!(reused.shooter.x_hat(), [0.0, 0.0]);

    script(&reused.encoder);
    let replay: Vec<_> = (0..91)
        .map(|_| {
            reused.tick();
            let s = reused.shooter.snapshot().clone();
            (s.power, s.velocity, s.x_hat, s.at_target)
        })
        .collect();
    assert_eq!(expected, replay);
}

#[rstest]
#[case(45.0, Some(true))]
#[case(40.5, Some(true))]
#[case(40.0, Some(false))]
#[case(20.0, Some(false))]
#[case(0.0, None)]
#[case(-3.0, None)]
fn hood_follows_target_thresholds(#[case] target: f64, #[case] hood: Option<bool>) {
    let mut r = rig();
    r.shooter.set_target_velocity(target);
    assert_eq!(r.hood.position(), hood);
    assert_eq!(r.shooter.hood_up(), hood);
}

#[test]
fn zero_target_leaves_hood_where_it_was() {
    let mut r = rig();
    r.shooter.set_target_velocity(48.0);
    r.shooter.set_target_velocity(0.0);
    assert_eq!(r.hood.position(), Some(true));
}

#[test]
fn telemetry_and_tuning_sinks_see_every_tick() {
    let mut r = rig();
    r.shooter.set_target_velocity(38.0);
    r.encoder.push(0);
    r.encoder.push_constant_rate(64, 10);
    for _ in 0..11 {
        r.tick();
    }
    assert_eq!(r.telemetry.len(), 44);
    assert_eq!(r.telemetry.latest("g"), Some(std::f64::consts::TAU * 38.0));
    assert_eq!(r.telemetry.latest("v"), Some(r.shooter.velocity()));
    assert_eq!(r.telemetry.latest("x0"), Some(r.shooter.x_hat()[0]));
    let samples = r.tuning.samples();
    assert_eq!(samples.len(), 11);
    assert_eq!(samples[10], (38.0, r.shooter.velocity(), 0.0));
}

#[test]
fn presets_and_increments_move_the_target() {
    let mut r = rig();
    let fender = ShotPreset::Fender.speed(r.shooter.tunables()).unwrap();
    r.shooter.set_target_velocity(fender);
    r.shooter.adjust_target(3);
    assert_eq!(r.shooter.target_velocity(), 39.5);
    r.shooter.adjust_target(-1);
    assert_eq!(r.shooter.target_velocity(), 39.0);
    assert_eq!(r.hood.position(), Some(false));
}

#[test]
fn linear_power_respects_direction_rule() {
    let mut r = rig();
    r.shooter.set_linear_power(0.5);
    assert_eq!(r.shooter.last_power(), 0.0, "zero target forbids drive");

    r.shooter.set_target_velocity(30.0);
    r.shooter.set_linear_power(-0.5);
    assert_eq!(r.shooter.last_power(), 0.0);
    r.shooter.set_linear_power(1.0);
    assert!((r.shooter.last_power() - 1.0).abs() < 1e-12);
    r.shooter.set_linear_power(0.5);
    let expected = 0.5 * (0.2894 + 0.5 * (1.8275 + 0.5 * (-5.8827 + 0.5 * 4.7658)));
    assert!((r.shooter.last_power() - expected).abs() < 1e-12);
}

#[test]
fn optional_devices_report_absence() {
    let mut r = rig();
    assert!(r.shooter.set_linear_conveyor_power(0.5).is_err());
    assert!(r.shooter.get_ball_range().is_err());
}

#[test]
fn jitter_is_counted_but_not_fatal() {
    let mut r = rig();
    r.shooter.set_target_velocity(30.0);
    r.encoder.push(0);
    r.encoder.push_constant_rate(50, 10);
    r.shooter.tick();
    r.clock.advance(Duration::from_millis(20));
    r.shooter.tick();
    r.clock.advance(Duration::from_millis(80));
    r.shooter.tick();
    assert_eq!(r.shooter.jitter_events(), 1);
    assert!(r.shooter.snapshot().raw_velocity > 0.0);
}

#[test]
fn pid_acts_on_the_current_ticks_velocity() {
    // Proportional-only so each tick's correction is just kp * error.
    let table = Tunables::from_entries(DEFAULTS.iter().map(|&(name, value)| {
        if name == names::SHOOTER_KP {
            (name, 0.01)
        } else if name == names::SHOOTER_KI || name == names::SHOOTER_KD {
            (name, 0.0)
        } else {
            (name, value)
        }
    }));
    let encoder = ScriptedEncoder::new();
    let left = RecordingMotor::new();
    let clock = ManualClock::new();
    let mut shooter = Shooter::builder()
        .with_motors(left.clone(), RecordingMotor::new())
        .with_encoder(encoder.clone())
        .with_tunables(Arc::new(table))
        .with_clock(Arc::new(clock.clone()))
        .with_control(ControlCfg {
            mode: ControlMode::Pid,
            ..ControlCfg::default()
        })
        .build()
        .unwrap();
    shooter.set_target_velocity(10.0);
    encoder.push(0);
    encoder.push_constant_rate(COUNTS_PER_TICK_AT_50, 1);

    shooter.tick();
    let first = shooter.last_power();
    assert!(first > 0.0);

    // 50 rev/s raw is 10 rev/s through the five-slot filter: no error, no correction.
    clock.advance(Duration::from_millis(20));
    shooter.tick();
    assert!((shooter.velocity() - 10.0).abs() < 1e-9);
    assert!((shooter.last_power() - first).abs() < 1e-9, "{:?}", left.commands());
}
