use std::time::Duration;

use rstest::rstest;
use shooter_hardware::error::HwError;
use shooter_hardware::{CsvTuningLog, SimFlywheel, SimParams};
use shooter_traits::{BinaryActuator, MotorOutput, PositionSensor, RangeSensor, TuningSink};

fn spun_up(cmd: f64, ticks: usize) -> SimFlywheel {
    let sim = SimFlywheel::new(SimParams::default());
    sim.left_motor().set(cmd).unwrap();
    sim.right_motor().set(cmd).unwrap();
    for _ in 0..ticks {
        sim.advance(Duration::from_millis(20));
    }
    sim
}

#[test]
fn encoder_counts_track_angle() {
    let sim = spun_up(0.5, 50);
    let raw = sim.encoder().read_raw().unwrap();
    let expected = (sim.angle() / std::f64::consts::TAU * 128.0).floor() as i64;
    assert_eq!(raw, expected);
    assert!(raw > 0);
}

#[test]
fn injected_failures_surface_as_sensor_faults_then_recover() {
    let sim = spun_up(0.3, 10);
    sim.inject_read_failures(2);
    let mut enc = sim.encoder();
    for _ in 0..2 {
        let err = enc.read_raw().unwrap_err();
        let hw = err.downcast_ref::<HwError>().expect("typed hardware error");
        assert!(matches!(hw, HwError::SensorFault(_)));
    }
    assert!(enc.read_raw().is_ok());
}

#[test]
fn count_jump_offsets_later_readings() {
    let sim = SimFlywheel::new(SimParams::default());
    let mut enc = sim.encoder();
    assert_eq!(enc.read_raw().unwrap(), 0);
    sim.inject_count_jump(10_000);
    assert_eq!(enc.read_raw().unwrap(), 10_000);
}

#[rstest]
#[case(true)]
#[case(false)]
fn hood_and_ranger_pass_through(#[case] up: bool) {
    let sim = SimFlywheel::new(SimParams {
        range_reading: 1.25,
        ..SimParams::default()
    });
    assert_eq!(sim.hood_up(), None);
    sim.hood().set(up).unwrap();
    assert_eq!(sim.hood_up(), Some(up));
    assert_eq!(sim.ranger().read().unwrap(), 1.25);
}

#[test]
fn motor_with_curve_is_slower_than_linear_at_low_command() {
    let linear = spun_up(0.2, 200);
    let curved = SimFlywheel::new(SimParams {
        actuator_curve: Some([4.7658, -5.8827, 1.8275, 0.2894]),
        ..SimParams::default()
    });
    curved.left_motor().set(0.2).unwrap();
    curved.right_motor().set(0.2).unwrap();
    for _ in 0..200 {
        curved.advance(Duration::from_millis(20));
    }
    // The curve sits below the diagonal near 0.2, so the same command delivers more power.
    assert!(curved.velocity_rev_s() > linear.velocity_rev_s());
}

#[test]
fn csv_tuning_log_writes_header_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tuning.csv");
    {
        let mut log = CsvTuningLog::create(&path).unwrap();
        log.push(50.0, 12.5, 0.0);
        log.push(50.0, 25.0, 0.0);
        assert_eq!(log.rows(), 2);
        log.flush().unwrap();
    }
    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines, vec!["target,measured,aux", "50,12.5,0", "50,25,0"]);
}
