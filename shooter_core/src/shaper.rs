//! Saturation-aware shaping of the regulator's position reference.
//!
//! The position reference is integrated open-loop from the velocity demand, but before
//! each use it is clamped into the band the regulator can actually reach without exceeding
//! its input limits. Holding the reference inside that band keeps the position error from
//! winding up while the wheel is still accelerating.

use std::f64::consts::TAU;

use crate::error::ShooterError;
use crate::regulator::{StateSpaceRegulator, Vector2};

/// How strongly the velocity error eats into the position-reference band.
pub const VELOCITY_WEIGHT: f64 = 0.35;
/// Velocity goals (rad/s) below this are treated as "stopped".
pub const STOPPED_GOAL_RAD_S: f64 = 1.0;

/// Result of one shaped regulator step.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedStep {
    /// Demanded angular velocity in rad/s.
    pub velocity_goal: f64,
    pub min_reference: f64,
    pub max_reference: f64,
    /// Reference vector handed to the regulator.
    pub reference: Vector2,
    /// Regulator control input; `Err` when the regulator produced a non-finite value.
    pub control: Result<f64, ShooterError>,
    /// The goal is below `STOPPED_GOAL_RAD_S`; callers force zero output.
    pub stopped: bool,
}

#[derive(Debug, Clone)]
pub struct ReferenceShaper {
    position_goal: f64,
    period_s: f64,
}

impl ReferenceShaper {
    pub fn new(period_s: f64) -> Self {
        Self {
            position_goal: 0.0,
            period_s,
        }
    }

    /// Feasible `[min, max]` band for the position reference given the regulator's
    /// current estimate and the velocity goal.
    pub fn bounds(regulator: &StateSpaceRegulator, velocity_goal: f64) -> (f64, f64) {
        let coeffs = regulator.coefficients();
        let x_hat = regulator.x_hat();
        let [k0, k1] = coeffs.k;
        let lead = VELOCITY_WEIGHT * (velocity_goal - x_hat[1]) * k1;
        let max_reference = (coeffs.u_max - lead) / k0 + x_hat[0];
        let min_reference = (coeffs.u_min - lead) / k0 + x_hat[0];
        (min_reference, max_reference)
    }

    /// Shape the reference for `target_rev_s`, run the regulator against `measured_position`
    /// and advance the persisted position reference by one period.
    pub fn step(
        &mut self,
        regulator: &mut StateSpaceRegulator,
        target_rev_s: f64,
        measured_position: f64,
    ) -> ShapedStep {
        let velocity_goal = TAU * target_rev_s;
        let (min_reference, max_reference) = Self::bounds(regulator, velocity_goal);

        let capped = if self.position_goal < max_reference {
            self.position_goal
        } else {
            max_reference
        };
        self.position_goal = if capped > min_reference {
            capped
        } else {
            min_reference
        };

        let reference = [self.position_goal, velocity_goal];
        self.position_goal += self.period_s * velocity_goal;

        let control = regulator.update(reference, measured_position);

        let stopped = velocity_goal < STOPPED_GOAL_RAD_S;
        if stopped {
            self.position_goal = measured_position;
        }

        ShapedStep {
            velocity_goal,
            min_reference,
            max_reference,
            reference,
            control,
            stopped,
        }
    }

    /// Persisted position reference (rad).
    pub fn position_goal(&self) -> f64 {
        self.position_goal
    }

    /// Move the persisted reference to `position`.
    pub fn seed(&mut self, position: f64) {
        if position.is_finite() {
            self.position_goal = position;
        }
    }

    /// Shift the persisted reference by `delta`.
    pub fn shift(&mut self, delta: f64) {
        if delta.is_finite() {
            self.position_goal += delta;
        }
    }

    pub fn reset(&mut self) {
        self.position_goal = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regulator::ModelTag;

    #[test]
    fn reference_is_clamped_into_band() {
        let mut reg = StateSpaceRegulator::new(ModelTag::Shooter);
        let mut shaper = ReferenceShaper::new(0.02);
        shaper.seed(1.0e6);
        let step = shaper.step(&mut reg, 50.0, 0.0);
        assert_eq!(step.reference[0], step.max_reference);
        assert!(step.min_reference < step.max_reference);
        assert!(!step.stopped);
    }

    #[test]
    fn band_follows_documented_formula() {
        let reg = StateSpaceRegulator::new(ModelTag::Shooter);
        let c = reg.coefficients();
        let vg = TAU * 40.0;
        let (lo, hi) = ReferenceShaper::bounds(&reg, vg);
        let expect_hi = (c.u_max - VELOCITY_WEIGHT * vg * c.k[1]) / c.k[0];
        let expect_lo = (c.u_min - VELOCITY_WEIGHT * vg * c.k[1]) / c.k[0];
        assert!((hi - expect_hi).abs() < 1e-12);
        assert!((lo - expect_lo).abs() < 1e-12);
    }

    #[test]
    fn goal_integrates_velocity_demand() {
        let mut reg = StateSpaceRegulator::new(ModelTag::Shooter);
        let mut shaper = ReferenceShaper::new(0.02);
        let step = shaper.step(&mut reg, 10.0, 0.0);
        let expected = step.reference[0] + 0.02 * TAU * 10.0;
        assert!((shaper.position_goal() - expected).abs() < 1e-12);
    }

    #[test]
    fn stopped_goal_snaps_reference_to_measurement() {
        let mut reg = StateSpaceRegulator::new(ModelTag::Shooter);
        let mut shaper = ReferenceShaper::new(0.02);
        shaper.seed(7.0);
        let step = shaper.step(&mut reg, 0.1, 123.0);
        assert!(step.stopped);
        assert_eq!(shaper.position_goal(), 123.0);
    }
}
