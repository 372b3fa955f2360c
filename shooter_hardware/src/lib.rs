//! Simulated flywheel hardware plus the display and tuning-log sinks.
//!
//! `SimFlywheel` is a first-order motor model: `dω/dt = (k·V − ω) / τ`. The device handles
//! it hands out (motors, encoder, hood, conveyor, range sensor) share its state, so the
//! controller writes commands through one handle while the test or CLI advances time
//! through another.
pub mod error;

use std::cell::Cell;
use std::f64::consts::TAU;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use shooter_traits::{
    BinaryActuator, MotorOutput, PositionSensor, RangeSensor, TelemetrySink, TuningSink,
};

use crate::error::HwError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Integration steps per `advance` call.
const SUBSTEPS: u32 = 10;

#[derive(Debug, Clone)]
pub struct SimParams {
    pub time_constant_s: f64,
    /// Steady-state rad/s per applied volt.
    pub rad_per_s_per_volt: f64,
    pub supply_volts: f64,
    pub counts_per_rev: u32,
    /// Value returned by the range sensor.
    pub range_reading: f64,
    /// Motor nonlinearity: the plant delivers the power `p` for which this curve gives the
    /// commanded value. `None` makes the motor linear.
    pub actuator_curve: Option<[f64; 4]>,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            time_constant_s: 0.5,
            rad_per_s_per_volt: 31.4,
            supply_volts: 12.0,
            counts_per_rev: 128,
            range_reading: 0.0,
            actuator_curve: None,
        }
    }
}

#[derive(Debug)]
struct SimState {
    params: SimParams,
    omega: Cell<f64>,
    theta: Cell<f64>,
    left: Cell<f64>,
    right: Cell<f64>,
    conveyor: Cell<f64>,
    hood: Cell<Option<bool>>,
    read_failures: Cell<u32>,
    count_offset: Cell<i64>,
}

/// Simulated dual-motor flywheel.
#[derive(Debug, Clone)]
pub struct SimFlywheel {
    state: Rc<SimState>,
}

impl SimFlywheel {
    pub fn new(params: SimParams) -> Self {
        Self {
            state: Rc::new(SimState {
                params,
                omega: Cell::new(0.0),
                theta: Cell::new(0.0),
                left: Cell::new(0.0),
                right: Cell::new(0.0),
                conveyor: Cell::new(0.0),
                hood: Cell::new(None),
                read_failures: Cell::new(0),
                count_offset: Cell::new(0),
            }),
        }
    }

    pub fn left_motor(&self) -> SimMotor {
        SimMotor {
            state: Rc::clone(&self.state),
            port: MotorPort::Left,
        }
    }

    pub fn right_motor(&self) -> SimMotor {
        SimMotor {
            state: Rc::clone(&self.state),
            port: MotorPort::Right,
        }
    }

    pub fn conveyor(&self) -> SimMotor {
        SimMotor {
            state: Rc::clone(&self.state),
            port: MotorPort::Conveyor,
        }
    }

    pub fn encoder(&self) -> SimEncoder {
        SimEncoder {
            state: Rc::clone(&self.state),
        }
    }

    pub fn hood(&self) -> SimHood {
        SimHood {
            state: Rc::clone(&self.state),
        }
    }

    pub fn ranger(&self) -> SimRanger {
        SimRanger {
            state: Rc::clone(&self.state),
        }
    }

    /// Integrate the plant forward by `dt` using the current motor commands.
    pub fn advance(&self, dt: Duration) {
        let s = &*self.state;
        let p = &s.params;
        let command = 0.5 * (s.left.get() + s.right.get());
        let power = match p.actuator_curve {
            Some(curve) => invert_curve(curve, command),
            None => command,
        };
        let volts = power * p.supply_volts;
        let h = dt.as_secs_f64() / f64::from(SUBSTEPS);
        let (mut omega, mut theta) = (s.omega.get(), s.theta.get());
        for _ in 0..SUBSTEPS {
            omega += h * (p.rad_per_s_per_volt * volts - omega) / p.time_constant_s;
            theta += omega * h;
        }
        s.omega.set(omega);
        s.theta.set(theta);
    }

    /// Wheel speed in rev/s.
    pub fn velocity_rev_s(&self) -> f64 {
        self.state.omega.get() / TAU
    }

    /// Wheel angle in rad.
    pub fn angle(&self) -> f64 {
        self.state.theta.get()
    }

    /// Mean of the two shooter motor commands.
    pub fn motor_command(&self) -> f64 {
        0.5 * (self.state.left.get() + self.state.right.get())
    }

    pub fn conveyor_command(&self) -> f64 {
        self.state.conveyor.get()
    }

    pub fn hood_up(&self) -> Option<bool> {
        self.state.hood.get()
    }

    /// Make the next `n` encoder reads fail.
    pub fn inject_read_failures(&self, n: u32) {
        self.state.read_failures.set(n);
    }

    /// Shift every subsequent encoder reading by `counts`, as a glitching counter would.
    pub fn inject_count_jump(&self, counts: i64) {
        let s = &self.state;
        s.count_offset.set(s.count_offset.get().saturating_add(counts));
    }
}

/// Power `p` in [0, 1] for which the odd quartic `curve` yields `command`.
fn invert_curve([a, b, c, d]: [f64; 4], command: f64) -> f64 {
    if command < 0.0 {
        return -invert_curve([a, b, c, d], -command);
    }
    let f = |x: f64| x * (d + x * (c + x * (b + x * a)));
    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    for _ in 0..60 {
        let mid = 0.5 * (lo + hi);
        if f(mid) < command {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MotorPort {
    Left,
    Right,
    Conveyor,
}

/// Motor handle into a `SimFlywheel`.
#[derive(Debug, Clone)]
pub struct SimMotor {
    state: Rc<SimState>,
    port: MotorPort,
}

impl MotorOutput for SimMotor {
    fn set(&mut self, command: f64) -> Result<(), BoxError> {
        if !command.is_finite() || command.abs() > 1.0 {
            return Err(Box::new(HwError::OutOfRange(format!(
                "{:?} motor command {command}",
                self.port
            ))));
        }
        let cell = match self.port {
            MotorPort::Left => &self.state.left,
            MotorPort::Right => &self.state.right,
            MotorPort::Conveyor => &self.state.conveyor,
        };
        cell.set(command);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SimEncoder {
    state: Rc<SimState>,
}

impl PositionSensor for SimEncoder {
    fn read_raw(&mut self) -> Result<i64, BoxError> {
        let s = &*self.state;
        let pending = s.read_failures.get();
        if pending > 0 {
            s.read_failures.set(pending - 1);
            return Err(Box::new(HwError::SensorFault(
                "simulated encoder dropout".into(),
            )));
        }
        let counts = (s.theta.get() / TAU * f64::from(s.params.counts_per_rev)).floor();
        Ok((counts as i64).saturating_add(s.count_offset.get()))
    }
}

#[derive(Debug, Clone)]
pub struct SimHood {
    state: Rc<SimState>,
}

impl BinaryActuator for SimHood {
    fn set(&mut self, on: bool) -> Result<(), BoxError> {
        self.state.hood.set(Some(on));
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SimRanger {
    state: Rc<SimState>,
}

impl RangeSensor for SimRanger {
    fn read(&mut self) -> Result<f64, BoxError> {
        Ok(self.state.params.range_reading)
    }
}

/// Display sink that emits each flushed batch as one `tracing` event.
#[derive(Debug, Default)]
pub struct TracingTelemetry {
    pending: Vec<(String, f64)>,
}

impl TracingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TelemetrySink for TracingTelemetry {
    fn write(&mut self, key: &str, value: f64) {
        match self.pending.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.pending.push((key.to_string(), value)),
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let line = self
            .pending
            .iter()
            .map(|(k, v)| format!("{k}={v:.3}"))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::debug!(target: "shooter::telemetry", "{line}");
        self.pending.clear();
    }
}

/// Tuning-data sink writing `target,measured,aux` rows as CSV.
///
/// Write failures are logged once and the sink goes quiet; it never disturbs the loop.
pub struct CsvTuningLog<W: Write> {
    writer: csv::Writer<W>,
    rows: u64,
    failed: bool,
}

impl CsvTuningLog<std::fs::File> {
    pub fn create(path: &Path) -> error::Result<Self> {
        let file = std::fs::File::create(path)?;
        Self::from_writer(file)
    }
}

impl<W: Write> CsvTuningLog<W> {
    pub fn from_writer(w: W) -> error::Result<Self> {
        let mut writer = csv::Writer::from_writer(w);
        writer.write_record(["target", "measured", "aux"])?;
        Ok(Self {
            writer,
            rows: 0,
            failed: false,
        })
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn flush(&mut self) -> error::Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> TuningSink for CsvTuningLog<W> {
    fn push(&mut self, target: f64, measured: f64, aux: f64) {
        if self.failed {
            return;
        }
        let record = [target.to_string(), measured.to_string(), aux.to_string()];
        match self.writer.write_record(&record) {
            Ok(()) => self.rows += 1,
            Err(e) => {
                tracing::warn!(error = %e, "tuning log write failed; disabling");
                self.failed = true;
            }
        }
    }
}
