use std::sync::Arc;

use rstest::rstest;
use shooter_config::{DEFAULTS, Tunables, names};
use shooter_core::mocks::{RecordingMotor, ScriptedEncoder};
use shooter_core::{BuildError, ControlCfg, ControlMode, LoopCfg, ModelTag, SensorCfg, Shooter};

#[rstest]
fn missing_motors_yield_typed_build_error() {
    let err = Shooter::builder()
        // missing with_motors()
        .with_encoder(ScriptedEncoder::new())
        .try_build()
        .expect_err("should fail with MissingMotor");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingMotor) => {}
        other => panic!("expected MissingMotor, got: {other:?}"),
    }
}

#[rstest]
fn missing_encoder_yields_typed_build_error() {
    let err = Shooter::builder()
        .with_motors(RecordingMotor::new(), RecordingMotor::new())
        .try_build()
        .expect_err("should fail with MissingEncoder");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingEncoder) => {}
        other => panic!("expected MissingEncoder, got: {other:?}"),
    }
}

#[rstest]
#[case(names::SHOOTER_KP)]
#[case(names::SHOOTER_COEFF_C)]
#[case(names::CONVEYOR_COEFF_D)]
#[case(names::VELOCITY_THRESHOLD)]
#[case(names::HOOD_UP_SPEED)]
fn missing_tunable_halts_construction(#[case] dropped: &'static str) {
    let table = Tunables::from_entries(DEFAULTS.iter().copied().filter(|(n, _)| *n != dropped));
    let err = Shooter::builder()
        .with_motors(RecordingMotor::new(), RecordingMotor::new())
        .with_encoder(ScriptedEncoder::new())
        .with_tunables(Arc::new(table))
        .build()
        .expect_err("construction must fail");

    assert_eq!(
        err.downcast_ref::<BuildError>(),
        Some(&BuildError::MissingTunable(dropped.to_string()))
    );
}

#[rstest]
#[case(LoopCfg { rate_hz: 0, jitter_tolerance: 0.5 }, SensorCfg::default(), "rate_hz")]
#[case(LoopCfg { rate_hz: 50, jitter_tolerance: 0.0 }, SensorCfg::default(), "jitter_tolerance")]
#[case(LoopCfg { rate_hz: 100, jitter_tolerance: 0.5 }, SensorCfg::default(), "discretization rate")]
#[case(LoopCfg { rate_hz: 25, jitter_tolerance: 0.5 }, SensorCfg::default(), "discretization rate")]
#[case(LoopCfg::default(), SensorCfg { counts_per_rev: 0, max_counts_per_tick: 512 }, "counts_per_rev")]
#[case(LoopCfg::default(), SensorCfg { counts_per_rev: 128, max_counts_per_tick: 0 }, "max_counts_per_tick")]
fn invalid_config_is_rejected(
    #[case] schedule: LoopCfg,
    #[case] sensor: SensorCfg,
    #[case] needle: &str,
) {
    let err = Shooter::builder()
        .with_motors(RecordingMotor::new(), RecordingMotor::new())
        .with_encoder(ScriptedEncoder::new())
        .with_loop(schedule)
        .with_sensor(sensor)
        .build()
        .expect_err("invalid config");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => assert!(msg.contains(needle), "{msg}"),
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

#[test]
fn pid_mode_is_not_tied_to_the_model_rate() {
    let shooter = Shooter::builder()
        .with_motors(RecordingMotor::new(), RecordingMotor::new())
        .with_encoder(ScriptedEncoder::new())
        .with_loop(LoopCfg {
            rate_hz: 100,
            jitter_tolerance: 0.5,
        })
        .with_control(ControlCfg {
            mode: ControlMode::Pid,
            ..ControlCfg::default()
        })
        .build()
        .expect("pid has no discretized model");
    assert_eq!(shooter.period_s(), 0.01);
}

#[test]
fn model_rate_matches_the_default_loop() {
    assert_eq!(ModelTag::Shooter.rate_hz(), LoopCfg::default().rate_hz);
}

#[test]
fn defaults_build() {
    let shooter = Shooter::builder()
        .with_motors(RecordingMotor::new(), RecordingMotor::new())
        .with_encoder(ScriptedEncoder::new())
        .build()
        .expect("defaults are complete");
    assert_eq!(shooter.target_velocity(), 0.0);
    assert!(!shooter.at_target_velocity());
    assert_eq!(shooter.period_s(), 0.02);
}
