//! Per-tick observation of the shooter controller.

use crate::error::ShooterError;
use crate::regulator::Vector2;

/// What the last `tick()` saw and commanded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickSnapshot {
    /// 1-based tick counter since construction.
    pub tick: u64,
    /// Commanded target (rev/s).
    pub target: f64,
    /// Instantaneous finite-difference velocity (rev/s); zero on a sensor anomaly.
    pub raw_velocity: f64,
    /// Moving-average velocity (rev/s).
    pub velocity: f64,
    /// Position handed to the regulator (rad).
    pub position: f64,
    pub x_hat: Vector2,
    /// Normalized command written to the motor outputs.
    pub power: f64,
    pub at_target: bool,
    /// The zero-velocity guard forced zero power.
    pub stopped: bool,
    /// Measured time since the previous tick; `None` on the first tick.
    pub dt_s: Option<f64>,
    /// Fault raised during this tick, if any.
    pub fault: Option<ShooterError>,
}
