//! Narrow capability interfaces between the shooter controller and the outside world.
//!
//! The controller never owns a concrete device; it is handed boxed implementations of
//! these traits at construction so the same control loop runs against real hardware,
//! the simulator in `shooter_hardware`, or test doubles.
pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Motor controller output accepting a normalized command in [-1, 1].
///
/// Positive means "spin the wheel forward"; an implementation for an inverted motor
/// negates the command itself.
pub trait MotorOutput {
    fn set(&mut self, command: f64) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Relative position sensor exposing a raw tick count.
pub trait PositionSensor {
    fn read_raw(&mut self) -> Result<i64, Box<dyn std::error::Error + Send + Sync>>;
}

/// Two-state mechanical actuator (solenoid).
pub trait BinaryActuator {
    fn set(&mut self, on: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Scalar distance sensor.
pub trait RangeSensor {
    fn read(&mut self) -> Result<f64, Box<dyn std::error::Error + Send + Sync>>;
}

/// Fire-and-forget key/value display.
pub trait TelemetrySink {
    fn write(&mut self, key: &str, value: f64);

    /// Push buffered writes to the display, if the sink buffers at all.
    fn flush(&mut self) {}
}

/// Fire-and-forget sink for (target, measured, auxiliary) samples used in offline gain tuning.
pub trait TuningSink {
    fn push(&mut self, target: f64, measured: f64, aux: f64);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn write(&mut self, _key: &str, _value: f64) {}
}

impl TuningSink for NullSink {
    fn push(&mut self, _target: f64, _measured: f64, _aux: f64) {}
}

impl<T: MotorOutput + ?Sized> MotorOutput for Box<T> {
    fn set(&mut self, command: f64) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set(command)
    }
}

impl<T: PositionSensor + ?Sized> PositionSensor for Box<T> {
    fn read_raw(&mut self) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_raw()
    }
}

impl<T: BinaryActuator + ?Sized> BinaryActuator for Box<T> {
    fn set(&mut self, on: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set(on)
    }
}

impl<T: RangeSensor + ?Sized> RangeSensor for Box<T> {
    fn read(&mut self) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read()
    }
}
