//! The shooter control loop (`Shooter`).
//!
//! One `tick()` reads the encoder, shapes the regulator reference, converts the control
//! input into a linearized motor command, filters velocity and reports whether the wheel
//! is at its target. `tick()` never fails: faults are logged, kept in `last_fault()` and
//! answered with zero power.

use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Instant;

use shooter_config::Tunables;
use shooter_traits::clock::Clock;
use shooter_traits::{
    BinaryActuator, MotorOutput, PositionSensor, RangeSensor, TelemetrySink, TuningSink,
};

use crate::config::{ControlCfg, ControlMode, LoopCfg, SensorCfg, ShooterTunables};
use crate::error::ShooterError;
use crate::filter::{MovingAverage, OUTPUT_FILTER_LEN, VELOCITY_FILTER_LEN};
use crate::hw_error::map_hw_error;
use crate::linearize::Linearizer;
use crate::pid::Pid;
use crate::regulator::{StateSpaceRegulator, Vector2};
use crate::shaper::{ReferenceShaper, STOPPED_GOAL_RAD_S};
use crate::status::TickSnapshot;
use crate::util::period_s;

/// Divides the regulator's control input (volts) into a normalized power command.
pub const SUPPLY_VOLTS: f64 = 12.0;

/// Devices the controller drives. Everything except the shooter motors and encoder is optional.
///
/// Both shooter motors receive the same non-negative command; any inversion for how a
/// motor is wired belongs in its `MotorOutput` implementation.
pub struct ShooterIo {
    pub left: Box<dyn MotorOutput>,
    pub right: Box<dyn MotorOutput>,
    pub encoder: Box<dyn PositionSensor>,
    pub hood: Option<Box<dyn BinaryActuator>>,
    pub conveyor: Option<Box<dyn MotorOutput>>,
    pub ranger: Option<Box<dyn RangeSensor>>,
    pub telemetry: Box<dyn TelemetrySink>,
    pub tuning: Box<dyn TuningSink>,
}

pub struct Shooter {
    pub(crate) io: ShooterIo,
    pub(crate) tunables: Arc<Tunables>,
    pub(crate) params: ShooterTunables,
    pub(crate) schedule: LoopCfg,
    pub(crate) sensor: SensorCfg,
    pub(crate) control: ControlCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) period_s: f64,

    pub(crate) regulator: StateSpaceRegulator,
    pub(crate) shaper: ReferenceShaper,
    pub(crate) pid: Pid,
    pub(crate) velocity_filter: MovingAverage<VELOCITY_FILTER_LEN>,
    pub(crate) output_filter: MovingAverage<OUTPUT_FILTER_LEN>,
    pub(crate) shooter_curve: Linearizer,
    pub(crate) conveyor_curve: Linearizer,

    pub(crate) target: f64,
    pub(crate) velocity: f64,
    pub(crate) at_target: bool,
    pub(crate) output_value: f64,
    pub(crate) hood_up: Option<bool>,
    pub(crate) prev_raw: Option<i64>,
    /// Consecutive failed encoder reads since the last good one.
    pub(crate) missed_reads: u32,
    pub(crate) last_tick_at: Option<Instant>,
    pub(crate) last_power: f64,
    pub(crate) last_fault: Option<ShooterError>,
    pub(crate) jitter_events: u64,
    pub(crate) ticks: u64,
    pub(crate) snapshot: TickSnapshot,
}

impl core::fmt::Debug for Shooter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Shooter")
            .field("target", &self.target)
            .field("velocity", &self.velocity)
            .field("at_target", &self.at_target)
            .field("mode", &self.control.mode)
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl Shooter {
    pub(crate) fn new(
        io: ShooterIo,
        tunables: Arc<Tunables>,
        params: ShooterTunables,
        schedule: LoopCfg,
        sensor: SensorCfg,
        control: ControlCfg,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let period = period_s(schedule.rate_hz);
        Self {
            io,
            tunables,
            pid: Pid::new(params.pid),
            shooter_curve: Linearizer::quartic(params.shooter_curve),
            conveyor_curve: Linearizer::deadband_cubic(params.conveyor_curve),
            params,
            regulator: StateSpaceRegulator::new(control.model),
            shaper: ReferenceShaper::new(period),
            schedule,
            sensor,
            control,
            clock,
            period_s: period,
            velocity_filter: MovingAverage::new(),
            output_filter: MovingAverage::new(),
            target: 0.0,
            velocity: 0.0,
            at_target: false,
            output_value: 0.0,
            hood_up: None,
            prev_raw: None,
            missed_reads: 0,
            last_tick_at: None,
            last_power: 0.0,
            last_fault: None,
            jitter_events: 0,
            ticks: 0,
            snapshot: TickSnapshot::default(),
        }
    }

    /// Command a new target velocity in rev/s and pick the hood position for it.
    pub fn set_target_velocity(&mut self, velocity: f64) {
        let velocity = if velocity.is_finite() {
            velocity
        } else {
            tracing::warn!(velocity, "non-finite target velocity; stopping");
            0.0
        };
        self.target = velocity;
        self.pid.reset_error();
        self.output_value = 0.0;

        if velocity > self.params.hood_up_speed {
            self.set_hood_up(true);
        } else if velocity > 0.0 {
            self.set_hood_up(false);
        }
        tracing::info!(target = velocity, hood_up = ?self.hood_up, "shooter target set");
    }

    /// Nudge the target by `steps` increments of `shooterSpeedIncrement`.
    pub fn adjust_target(&mut self, steps: i32) {
        let next = self.target + f64::from(steps) * self.params.speed_increment;
        self.set_target_velocity(next);
    }

    /// Run one control period. Returns whether the filtered velocity is at target.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now();
        let dt_s = self
            .last_tick_at
            .map(|prev| now.saturating_duration_since(prev).as_secs_f64());
        self.last_tick_at = Some(now);
        self.ticks += 1;
        if let Some(dt) = dt_s {
            self.check_period(dt);
        }

        let mut fault = None;
        let (position, raw_velocity) = self.sample_position(&mut fault);
        // PID works on this tick's filtered velocity; the regulator only needs position.
        self.velocity = self.velocity_filter.push(raw_velocity);

        let (power, stopped) = match self.control.mode {
            ControlMode::StateSpace => self.state_space_power(position, &mut fault),
            ControlMode::Pid => self.pid_power(dt_s, &mut fault),
        };

        if stopped {
            self.output_filter.reset();
            self.set_power(0.0);
        } else {
            let power = if self.control.smooth_output {
                self.output_filter.push(power)
            } else {
                power
            };
            let command = self.shooter_curve.apply(power);
            self.set_power(command);
        }

        self.at_target = (self.velocity - self.target).abs() < self.params.velocity_threshold;

        let x_hat = self.regulator.x_hat();
        self.emit(x_hat);

        if let Some(err) = &fault {
            self.last_fault = Some(err.clone());
        }
        self.snapshot = TickSnapshot {
            tick: self.ticks,
            target: self.target,
            raw_velocity,
            velocity: self.velocity,
            position,
            x_hat,
            power: self.last_power,
            at_target: self.at_target,
            stopped,
            dt_s,
            fault,
        };
        tracing::debug!(
            tick = self.ticks,
            velocity = self.velocity,
            target = self.target,
            power = self.last_power,
            at_target = self.at_target,
            "tick"
        );
        self.at_target
    }

    /// Clear the at-target flag, filters, regulator estimate and shaped reference.
    ///
    /// The next tick re-seeds from the encoder exactly as the first tick of a new controller.
    pub fn reset(&mut self) {
        self.at_target = false;
        self.velocity = 0.0;
        self.velocity_filter.reset();
        self.output_filter.reset();
        self.regulator.reset();
        self.shaper.reset();
        self.pid.reset_error();
        self.output_value = 0.0;
        self.prev_raw = None;
        self.missed_reads = 0;
        self.last_tick_at = None;
        tracing::info!("shooter reset");
    }

    pub fn at_target_velocity(&self) -> bool {
        self.at_target
    }

    /// Filtered velocity in rev/s.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn target_velocity(&self) -> f64 {
        self.target
    }

    /// Drive the shooter open-loop through the shooter curve.
    pub fn set_linear_power(&mut self, pwm: f64) {
        let command = self.shooter_curve.apply(pwm);
        self.set_power(command);
    }

    pub fn set_hood_up(&mut self, up: bool) {
        self.hood_up = Some(up);
        let Some(hood) = self.io.hood.as_mut() else {
            return;
        };
        if let Err(e) = hood.set(up) {
            let err = map_hw_error(&*e);
            tracing::warn!(error = %err, up, "hood command failed");
            self.last_fault = Some(err);
        }
    }

    /// Write `pwm` straight to the conveyor, bounded to [-1, 1]. Non-finite input stops it.
    ///
    /// No curve is applied; callers that want compensation run `conveyor_curve()` first.
    pub fn set_linear_conveyor_power(&mut self, pwm: f64) -> Result<(), ShooterError> {
        let command = if pwm.is_finite() {
            pwm.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let conveyor = self
            .io
            .conveyor
            .as_mut()
            .ok_or_else(|| ShooterError::Config("no conveyor motor attached".into()))?;
        conveyor.set(command).map_err(|e| map_hw_error(&*e))
    }

    pub fn get_ball_range(&mut self) -> Result<f64, ShooterError> {
        let ranger = self
            .io
            .ranger
            .as_mut()
            .ok_or_else(|| ShooterError::Config("no range sensor attached".into()))?;
        ranger.read().map_err(|e| map_hw_error(&*e))
    }

    /// Deadbanded conveyor compensation curve from the tunables.
    pub fn conveyor_curve(&self) -> &Linearizer {
        &self.conveyor_curve
    }

    pub fn hood_up(&self) -> Option<bool> {
        self.hood_up
    }

    /// Last normalized command written to the motors.
    pub fn last_power(&self) -> f64 {
        self.last_power
    }

    pub fn last_fault(&self) -> Option<&ShooterError> {
        self.last_fault.as_ref()
    }

    /// Ticks whose measured period strayed beyond the jitter tolerance.
    pub fn jitter_events(&self) -> u64 {
        self.jitter_events
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn snapshot(&self) -> &TickSnapshot {
        &self.snapshot
    }

    pub fn x_hat(&self) -> Vector2 {
        self.regulator.x_hat()
    }

    pub fn tunables(&self) -> &Arc<Tunables> {
        &self.tunables
    }

    pub fn params(&self) -> &ShooterTunables {
        &self.params
    }

    pub fn control_cfg(&self) -> &ControlCfg {
        &self.control
    }

    pub fn loop_cfg(&self) -> &LoopCfg {
        &self.schedule
    }

    /// Nominal control period in seconds.
    pub fn period_s(&self) -> f64 {
        self.period_s
    }

    /// One-direction rule: never reverse the wheel, and never drive it with a zero target.
    fn set_power(&mut self, power: f64) {
        let power = if !power.is_finite() || power < 0.0 || self.target == 0.0 {
            0.0
        } else {
            power.clamp(-1.0, 1.0)
        };
        self.last_power = power;
        for (side, motor) in [("left", &mut self.io.left), ("right", &mut self.io.right)] {
            if let Err(e) = motor.set(power) {
                let err = map_hw_error(&*e);
                tracing::warn!(error = %err, side, "motor write failed");
                self.last_fault = Some(err);
            }
        }
    }

    fn check_period(&mut self, dt: f64) {
        let nominal = self.period_s;
        if (dt - nominal).abs() > self.schedule.jitter_tolerance * nominal {
            self.jitter_events += 1;
            tracing::warn!(
                dt_ms = dt * 1e3,
                nominal_ms = nominal * 1e3,
                "tick period outside tolerance; velocity still uses the nominal period"
            );
        }
    }

    fn counts_to_rad(&self, counts: i64) -> f64 {
        counts as f64 / f64::from(self.sensor.counts_per_rev) * TAU
    }

    /// Read the encoder and return (position rad, instantaneous velocity rev/s).
    fn sample_position(&mut self, fault: &mut Option<ShooterError>) -> (f64, f64) {
        let raw = match self.io.encoder.read_raw() {
            Ok(raw) => raw,
            Err(e) => {
                let err = match map_hw_error(&*e) {
                    ShooterError::Hardware(msg) => ShooterError::SensorAnomaly(msg),
                    other => other,
                };
                tracing::warn!(error = %err, "encoder read failed; coasting on the estimate");
                *fault = Some(err);
                self.missed_reads = self.missed_reads.saturating_add(1);
                // Zero innovation: the regulator runs on its own prediction until reads resume.
                return (self.regulator.x_hat()[0], 0.0);
            }
        };
        let periods = self.missed_reads.saturating_add(1);
        self.missed_reads = 0;
        let position = self.counts_to_rad(raw);

        let Some(prev) = self.prev_raw.replace(raw) else {
            self.regulator.seed_position(position);
            self.shaper.seed(position);
            return (position, 0.0);
        };

        let delta = raw.saturating_sub(prev);
        let limit = u64::from(self.sensor.max_counts_per_tick) * u64::from(periods);
        if delta.unsigned_abs() > limit {
            // Re-anchor on the new reading: the estimate and reference move by the gap
            // between measurement and prediction, so the jump never reaches the innovation.
            let jump = position - self.regulator.x_hat()[0];
            self.regulator.shift_position(jump);
            self.shaper.shift(jump);
            let err = ShooterError::SensorAnomaly(format!(
                "encoder jumped {delta} counts over {periods} tick(s) (limit {limit})"
            ));
            tracing::warn!(error = %err, "discarding velocity sample");
            *fault = Some(err);
            return (position, 0.0);
        }

        // Nominal period, stretched over any reads that were missed in between.
        let revs = delta as f64 / f64::from(self.sensor.counts_per_rev);
        (position, revs / (self.period_s * f64::from(periods)))
    }

    /// Returns (normalized power, stopped).
    fn state_space_power(
        &mut self,
        position: f64,
        fault: &mut Option<ShooterError>,
    ) -> (f64, bool) {
        let step = self.shaper.step(&mut self.regulator, self.target, position);
        match step.control {
            Ok(u) => (u / SUPPLY_VOLTS, step.stopped),
            Err(err) => {
                tracing::warn!(error = %err, "regulator output rejected; forcing zero power");
                *fault = Some(err);
                // Regulator is back at its initial estimate; re-seed both from the next reading.
                self.prev_raw = None;
                self.shaper.reset();
                (0.0, true)
            }
        }
    }

    fn pid_power(&mut self, dt_s: Option<f64>, fault: &mut Option<ShooterError>) -> (f64, bool) {
        if TAU * self.target < STOPPED_GOAL_RAD_S {
            self.output_value = 0.0;
            return (0.0, true);
        }
        let dt = match dt_s {
            Some(dt) if dt > 0.0 => dt,
            _ => self.period_s,
        };
        let correction = self.pid.compute_output(self.target - self.velocity, dt);
        let next = self.output_value + correction;
        if !next.is_finite() {
            let err = ShooterError::NonFinite("pid output");
            tracing::warn!(error = %err, "pid output rejected; forcing zero power");
            *fault = Some(err);
            self.pid.reset_error();
            self.output_value = 0.0;
            return (0.0, true);
        }
        self.output_value = next.clamp(0.0, 1.0);
        (self.output_value, false)
    }

    fn emit(&mut self, x_hat: Vector2) {
        let telemetry = &mut self.io.telemetry;
        telemetry.write("x0", x_hat[0]);
        telemetry.write("x1", x_hat[1]);
        telemetry.write("v", self.velocity);
        telemetry.write("g", TAU * self.target);
        telemetry.flush();
        self.io.tuning.push(self.target, self.velocity, 0.0);
    }
}
