//! Test and helper doubles for driving `Shooter` without a plant.

use std::cell::RefCell;
use std::rc::Rc;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Motor that records every command; clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingMotor {
    log: Rc<RefCell<Vec<f64>>>,
}

impl RecordingMotor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<f64> {
        self.log.borrow().clone()
    }

    pub fn last(&self) -> Option<f64> {
        self.log.borrow().last().copied()
    }
}

impl shooter_traits::MotorOutput for RecordingMotor {
    fn set(&mut self, command: f64) -> Result<(), BoxError> {
        self.log.borrow_mut().push(command);
        Ok(())
    }
}

/// Encoder that replays a caller-fed sequence of readings.
///
/// `Some(raw)` entries are returned as counts, `None` entries as a read failure. Once the
/// queue is empty the last count is repeated.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEncoder {
    state: Rc<RefCell<ScriptState>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    queue: std::collections::VecDeque<Option<i64>>,
    last: i64,
}

impl ScriptedEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, raw: i64) {
        self.state.borrow_mut().queue.push_back(Some(raw));
    }

    pub fn push_failure(&self) {
        self.state.borrow_mut().queue.push_back(None);
    }

    /// Queue a run of readings advancing by `counts_per_tick` from the last queued value.
    pub fn push_constant_rate(&self, counts_per_tick: i64, ticks: usize) {
        let mut st = self.state.borrow_mut();
        let mut at = st.queue.iter().rev().find_map(|r| *r).unwrap_or(st.last);
        for _ in 0..ticks {
            at += counts_per_tick;
            st.queue.push_back(Some(at));
        }
    }
}

impl shooter_traits::PositionSensor for ScriptedEncoder {
    fn read_raw(&mut self) -> Result<i64, BoxError> {
        let mut st = self.state.borrow_mut();
        match st.queue.pop_front() {
            Some(Some(raw)) => {
                st.last = raw;
                Ok(raw)
            }
            Some(None) => Err(Box::new(std::io::Error::other("encoder read timed out"))),
            None => Ok(st.last),
        }
    }
}

/// Hood solenoid that remembers its last command.
#[derive(Debug, Clone, Default)]
pub struct RecordingHood {
    state: Rc<RefCell<Option<bool>>>,
}

impl RecordingHood {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Option<bool> {
        *self.state.borrow()
    }
}

impl shooter_traits::BinaryActuator for RecordingHood {
    fn set(&mut self, on: bool) -> Result<(), BoxError> {
        *self.state.borrow_mut() = Some(on);
        Ok(())
    }
}

/// Telemetry sink that keeps every key/value write.
#[derive(Debug, Clone, Default)]
pub struct RecordingTelemetry {
    writes: Rc<RefCell<Vec<(String, f64)>>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent value written under `key`.
    pub fn latest(&self, key: &str) -> Option<f64> {
        self.writes
            .borrow()
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.writes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.borrow().is_empty()
    }
}

impl shooter_traits::TelemetrySink for RecordingTelemetry {
    fn write(&mut self, key: &str, value: f64) {
        self.writes.borrow_mut().push((key.to_string(), value));
    }
}

/// Tuning sink that keeps every (target, measured, aux) sample.
#[derive(Debug, Clone, Default)]
pub struct RecordingTuning {
    samples: Rc<RefCell<Vec<(f64, f64, f64)>>>,
}

impl RecordingTuning {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<(f64, f64, f64)> {
        self.samples.borrow().clone()
    }
}

impl shooter_traits::TuningSink for RecordingTuning {
    fn push(&mut self, target: f64, measured: f64, aux: f64) {
        self.samples.borrow_mut().push((target, measured, aux));
    }
}
