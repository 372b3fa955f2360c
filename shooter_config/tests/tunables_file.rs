use std::fs;

use shooter_config::{DEFAULTS, Tunables, names};
use tempfile::tempdir;

#[test]
fn file_overrides_replace_only_named_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("constants.txt");
    fs::write(
        &path,
        "shooterKP 0.42\nshooterCoeffA 5.0\nnotARealConstant 9.9\n",
    )
    .unwrap();

    let t = Tunables::load(Some(&path));
    assert_eq!(t.get(names::SHOOTER_KP), Some(0.42));
    assert_eq!(t.get(names::SHOOTER_COEFF_A), Some(5.0));
    // untouched defaults survive
    assert_eq!(t.get(names::SHOOTER_KI), Some(0.7));
    // unknown names never enter the table
    assert_eq!(t.get("notARealConstant"), None);
    assert_eq!(t.len(), DEFAULTS.len());
}

#[test]
fn missing_file_keeps_defaults() {
    let dir = tempdir().unwrap();
    let t = Tunables::load(Some(&dir.path().join("does-not-exist.txt")));
    let d = Tunables::defaults();
    assert!(t.iter().eq(d.iter()));
}

#[test]
fn malformed_lines_are_reported_and_skipped() {
    let mut t = Tunables::defaults();
    let report = t.apply_overrides("shooterKP\nshooterKI abc\nshooterKD 1 2\nshooterHoodUpSpeed 45\n");
    assert_eq!(report.applied, 1);
    assert_eq!(report.malformed, vec![1, 2, 3]);
    assert_eq!(t.get(names::SHOOTER_KI), Some(0.7));
    assert_eq!(t.get(names::HOOD_UP_SPEED), Some(45.0));
}

#[test]
fn non_finite_values_are_rejected() {
    let mut t = Tunables::defaults();
    let report = t.apply_overrides("shooterKP NaN\nshooterKI inf\n");
    assert_eq!(report.applied, 0);
    assert_eq!(report.malformed.len(), 2);
    assert_eq!(t.get(names::SHOOTER_KP), Some(0.6));
}
