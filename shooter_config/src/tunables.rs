//! Named numeric tunables: compiled-in defaults with optional file overrides.
//!
//! Override file format, one pair per line:
//!
//! ```text
//! # comment
//! shooterKP 0.55
//! shooterCoeffA 4.70
//! ```
//!
//! Names absent from the default table are ignored. Default-table names absent from
//! the file keep their compiled value. The table never changes after it is shared.

use std::collections::BTreeMap;
use std::path::Path;

/// Tunable names referenced by the controller and the CLI.
pub mod names {
    pub const SHOOTER_KP: &str = "shooterKP";
    pub const SHOOTER_KI: &str = "shooterKI";
    pub const SHOOTER_KD: &str = "shooterKD";
    pub const SHOOTER_COEFF_A: &str = "shooterCoeffA";
    pub const SHOOTER_COEFF_B: &str = "shooterCoeffB";
    pub const SHOOTER_COEFF_C: &str = "shooterCoeffC";
    pub const SHOOTER_COEFF_D: &str = "shooterCoeffD";
    pub const CONVEYOR_COEFF_A: &str = "conveyorCoeffA";
    pub const CONVEYOR_COEFF_B: &str = "conveyorCoeffB";
    pub const CONVEYOR_COEFF_C: &str = "conveyorCoeffC";
    pub const CONVEYOR_COEFF_D: &str = "conveyorCoeffD";
    pub const VELOCITY_THRESHOLD: &str = "shooterVelocityThreshold";
    pub const HOOD_UP_SPEED: &str = "shooterHoodUpSpeed";
    pub const FENDER_SPEED: &str = "shooterFenderSpeed";
    pub const FAR_FENDER_SPEED: &str = "shooterFarFenderSpeed";
    pub const KEY_CLOSE_SPEED: &str = "shooterKeyCloseSpeed";
    pub const KEY_FAR_SPEED: &str = "shooterKeyFarSpeed";
    pub const SPEED_INCREMENT: &str = "shooterSpeedIncrement";
    pub const AUTO_SHOOT_KEY_VEL: &str = "autoShootKeyVel";
}

/// Compiled-in default table.
pub const DEFAULTS: &[(&str, f64)] = &[
    // PID
    (names::SHOOTER_KP, 0.600),
    (names::SHOOTER_KI, 0.700),
    (names::SHOOTER_KD, -0.950),
    // Linearization
    (names::SHOOTER_COEFF_A, 4.7658),
    (names::SHOOTER_COEFF_B, -5.8827),
    (names::SHOOTER_COEFF_C, 1.8275),
    (names::SHOOTER_COEFF_D, 0.2894),
    (names::CONVEYOR_COEFF_A, 0.5021),
    (names::CONVEYOR_COEFF_B, 0.16),
    (names::CONVEYOR_COEFF_C, 0.3228),
    (names::CONVEYOR_COEFF_D, 1.1347),
    // Shooter
    (names::VELOCITY_THRESHOLD, 1.0),
    (names::HOOD_UP_SPEED, 40.0),
    (names::FENDER_SPEED, 38.0),
    (names::FAR_FENDER_SPEED, 46.0),
    (names::KEY_CLOSE_SPEED, 48.0),
    (names::KEY_FAR_SPEED, 53.0),
    (names::SPEED_INCREMENT, 0.5),
    // Autonomous
    (names::AUTO_SHOOT_KEY_VEL, 51.0),
];

/// Outcome of applying an override source.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OverrideReport {
    pub applied: usize,
    /// Names not present in the default table.
    pub unknown: Vec<String>,
    /// 1-based line numbers that could not be parsed.
    pub malformed: Vec<usize>,
}

/// Process-wide table of named tunables. Build once, then share as `Arc<Tunables>`.
#[derive(Debug, Clone)]
pub struct Tunables {
    values: BTreeMap<&'static str, f64>,
}

impl Default for Tunables {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Tunables {
    /// Table holding only the compiled-in defaults.
    pub fn defaults() -> Self {
        Self {
            values: DEFAULTS.iter().copied().collect(),
        }
    }

    /// Table holding exactly `entries`, with no compiled defaults behind them.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, f64)>,
    {
        Self {
            values: entries.into_iter().collect(),
        }
    }

    /// Defaults, overridden from `path` when given and readable.
    ///
    /// An unreadable override file is not an error: the defaults stay in effect.
    pub fn load(path: Option<&Path>) -> Self {
        let mut t = Self::defaults();
        let Some(path) = path else {
            return t;
        };
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let report = t.apply_overrides(&text);
                tracing::info!(
                    path = %path.display(),
                    applied = report.applied,
                    unknown = report.unknown.len(),
                    malformed = report.malformed.len(),
                    "tunables overrides loaded"
                );
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "tunables override file unreadable; using defaults");
            }
        }
        t
    }

    /// Replace defaults with values from `text` (`name value` per line).
    pub fn apply_overrides(&mut self, text: &str) -> OverrideReport {
        let mut report = OverrideReport::default();
        for (idx, raw_line) in text.lines().enumerate() {
            let line = match raw_line.split_once('#') {
                Some((before, _)) => before,
                None => raw_line,
            }
            .trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(name), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
                report.malformed.push(idx + 1);
                continue;
            };
            let Ok(value) = value.parse::<f64>() else {
                tracing::warn!(line = idx + 1, name, value, "unparsable tunable value ignored");
                report.malformed.push(idx + 1);
                continue;
            };
            if !value.is_finite() {
                report.malformed.push(idx + 1);
                continue;
            }
            match self.values.get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    report.applied += 1;
                }
                None => {
                    tracing::debug!(name, "unknown tunable ignored");
                    report.unknown.push(name.to_string());
                }
            }
        }
        report
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Look up a tunable that must exist; a miss is a startup-fatal configuration error.
    pub fn require(&self, name: &str) -> eyre::Result<f64> {
        match self.get(name) {
            Some(v) => Ok(v),
            None => eyre::bail!("missing tunable '{name}' (no compiled default)"),
        }
    }

    /// All entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_contain_every_named_constant() {
        let t = Tunables::defaults();
        for name in [
            names::SHOOTER_KP,
            names::SHOOTER_COEFF_D,
            names::CONVEYOR_COEFF_A,
            names::VELOCITY_THRESHOLD,
            names::HOOD_UP_SPEED,
            names::SPEED_INCREMENT,
        ] {
            assert!(t.get(name).is_some(), "{name} missing");
        }
        assert_eq!(t.len(), DEFAULTS.len());
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let mut t = Tunables::defaults();
        let report = t.apply_overrides("# header\n\n  shooterKP 0.25  # trailing\n");
        assert_eq!(report.applied, 1);
        assert!(report.malformed.is_empty());
        assert_eq!(t.get(names::SHOOTER_KP), Some(0.25));
    }

    #[test]
    fn later_lines_win() {
        let mut t = Tunables::defaults();
        t.apply_overrides("shooterKI 1.0\nshooterKI 2.0\n");
        assert_eq!(t.get(names::SHOOTER_KI), Some(2.0));
    }

    #[test]
    fn require_reports_the_missing_name() {
        let t = Tunables::defaults();
        let err = t.require("flywheelMass").expect_err("no such tunable");
        assert!(err.to_string().contains("flywheelMass"));
    }

    #[test]
    fn from_entries_holds_only_given_names() {
        let t = Tunables::from_entries([(names::SHOOTER_KP, 1.5)]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(names::SHOOTER_KP), Some(1.5));
        assert_eq!(t.get(names::SHOOTER_KI), None);
    }
}
