//! Type-state builder for `Shooter`.
//!
//! `build()` only exists once the motor pair and the encoder are provided.
//! `try_build()` is always available and reports what is missing at runtime.

use std::marker::PhantomData;
use std::sync::Arc;

use shooter_config::Tunables;
use shooter_traits::clock::{Clock, MonotonicClock};
use shooter_traits::{
    BinaryActuator, MotorOutput, NullSink, PositionSensor, RangeSensor, TelemetrySink, TuningSink,
};

use crate::config::{ControlCfg, ControlMode, LoopCfg, SensorCfg, ShooterTunables};
use crate::core::{Shooter, ShooterIo};
use crate::error::{BuildError, Result};

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

impl Shooter {
    /// Start building a Shooter.
    pub fn builder() -> ShooterBuilder<Missing, Missing> {
        ShooterBuilder::default()
    }
}

type Motors = (Box<dyn MotorOutput>, Box<dyn MotorOutput>);

pub struct ShooterBuilder<M, E> {
    motors: Option<Motors>,
    encoder: Option<Box<dyn PositionSensor>>,
    hood: Option<Box<dyn BinaryActuator>>,
    conveyor: Option<Box<dyn MotorOutput>>,
    ranger: Option<Box<dyn RangeSensor>>,
    telemetry: Option<Box<dyn TelemetrySink>>,
    tuning: Option<Box<dyn TuningSink>>,
    tunables: Option<Arc<Tunables>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    schedule: Option<LoopCfg>,
    sensor: Option<SensorCfg>,
    control: Option<ControlCfg>,
    _m: PhantomData<M>,
    _e: PhantomData<E>,
}

impl Default for ShooterBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            motors: None,
            encoder: None,
            hood: None,
            conveyor: None,
            ranger: None,
            telemetry: None,
            tuning: None,
            tunables: None,
            clock: None,
            schedule: None,
            sensor: None,
            control: None,
            _m: PhantomData,
            _e: PhantomData,
        }
    }
}

fn validate(
    schedule: &LoopCfg,
    sensor: &SensorCfg,
    control: &ControlCfg,
) -> std::result::Result<(), BuildError> {
    if schedule.rate_hz == 0 {
        return Err(BuildError::InvalidConfig("rate_hz must be > 0"));
    }
    // Plant matrices and the shaper step are only valid at the model's own period.
    if control.mode == ControlMode::StateSpace && schedule.rate_hz != control.model.rate_hz() {
        return Err(BuildError::InvalidConfig(
            "rate_hz must equal the plant model's discretization rate in state-space mode",
        ));
    }
    if !(schedule.jitter_tolerance.is_finite() && schedule.jitter_tolerance > 0.0) {
        return Err(BuildError::InvalidConfig(
            "jitter_tolerance must be finite and > 0",
        ));
    }
    if sensor.counts_per_rev == 0 {
        return Err(BuildError::InvalidConfig("counts_per_rev must be >= 1"));
    }
    if sensor.max_counts_per_tick == 0 {
        return Err(BuildError::InvalidConfig("max_counts_per_tick must be >= 1"));
    }
    Ok(())
}

impl<M, E> ShooterBuilder<M, E> {
    /// Fallible build available in any type-state; returns a detailed error for missing pieces.
    pub fn try_build(self) -> Result<Shooter> {
        let (left, right) = self
            .motors
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMotor))?;
        let encoder = self
            .encoder
            .ok_or_else(|| eyre::Report::new(BuildError::MissingEncoder))?;

        let schedule = self.schedule.unwrap_or_default();
        let sensor = self.sensor.unwrap_or_default();
        let control = self.control.unwrap_or_default();
        validate(&schedule, &sensor, &control).map_err(eyre::Report::new)?;

        let tunables = self
            .tunables
            .unwrap_or_else(|| Arc::new(Tunables::defaults()));
        let params = ShooterTunables::resolve(&tunables).map_err(eyre::Report::new)?;

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };
        let telemetry: Box<dyn TelemetrySink> = match self.telemetry {
            Some(t) => t,
            None => Box::new(NullSink),
        };
        let tuning: Box<dyn TuningSink> = match self.tuning {
            Some(t) => t,
            None => Box::new(NullSink),
        };
        let io = ShooterIo {
            left,
            right,
            encoder,
            hood: self.hood,
            conveyor: self.conveyor,
            ranger: self.ranger,
            telemetry,
            tuning,
        };
        tracing::debug!(
            rate_hz = schedule.rate_hz,
            counts_per_rev = sensor.counts_per_rev,
            mode = ?control.mode,
            "shooter built"
        );
        Ok(Shooter::new(
            io, tunables, params, schedule, sensor, control, clock,
        ))
    }

    // Chainable setters that do not affect type-state.

    pub fn with_hood(mut self, hood: impl BinaryActuator + 'static) -> Self {
        self.hood = Some(Box::new(hood));
        self
    }

    pub fn with_conveyor(mut self, conveyor: impl MotorOutput + 'static) -> Self {
        self.conveyor = Some(Box::new(conveyor));
        self
    }

    pub fn with_ranger(mut self, ranger: impl RangeSensor + 'static) -> Self {
        self.ranger = Some(Box::new(ranger));
        self
    }

    pub fn with_telemetry(mut self, sink: impl TelemetrySink + 'static) -> Self {
        self.telemetry = Some(Box::new(sink));
        self
    }

    pub fn with_tuning_sink(mut self, sink: impl TuningSink + 'static) -> Self {
        self.tuning = Some(Box::new(sink));
        self
    }

    /// Shared configuration store; defaults to the compiled-in table.
    pub fn with_tunables(mut self, tunables: Arc<Tunables>) -> Self {
        self.tunables = Some(tunables);
        self
    }

    /// Inject a clock (e.g. `ManualClock` in tests). Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_loop(mut self, schedule: LoopCfg) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn with_sensor(mut self, sensor: SensorCfg) -> Self {
        self.sensor = Some(sensor);
        self
    }

    pub fn with_control(mut self, control: ControlCfg) -> Self {
        self.control = Some(control);
        self
    }
}

// Setters that advance type-state
impl<E> ShooterBuilder<Missing, E> {
    pub fn with_motors(
        self,
        left: impl MotorOutput + 'static,
        right: impl MotorOutput + 'static,
    ) -> ShooterBuilder<Set, E> {
        let left: Box<dyn MotorOutput> = Box::new(left);
        let right: Box<dyn MotorOutput> = Box::new(right);
        ShooterBuilder {
            motors: Some((left, right)),
            encoder: self.encoder,
            hood: self.hood,
            conveyor: self.conveyor,
            ranger: self.ranger,
            telemetry: self.telemetry,
            tuning: self.tuning,
            tunables: self.tunables,
            clock: self.clock,
            schedule: self.schedule,
            sensor: self.sensor,
            control: self.control,
            _m: PhantomData,
            _e: PhantomData,
        }
    }
}

impl<M> ShooterBuilder<M, Missing> {
    pub fn with_encoder(self, encoder: impl PositionSensor + 'static) -> ShooterBuilder<M, Set> {
        ShooterBuilder {
            motors: self.motors,
            encoder: Some(Box::new(encoder)),
            hood: self.hood,
            conveyor: self.conveyor,
            ranger: self.ranger,
            telemetry: self.telemetry,
            tuning: self.tuning,
            tunables: self.tunables,
            clock: self.clock,
            schedule: self.schedule,
            sensor: self.sensor,
            control: self.control,
            _m: PhantomData,
            _e: PhantomData,
        }
    }
}

impl ShooterBuilder<Set, Set> {
    /// Validate and build. Only available when the motors and encoder are set.
    pub fn build(self) -> Result<Shooter> {
        self.try_build()
    }
}
