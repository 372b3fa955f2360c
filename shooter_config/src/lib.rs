#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Configuration for the shooter controller.
//!
//! - `Tunables` is the named-constant store (gains, curve coefficients, thresholds).
//! - `Config` and its sections are deserialized from TOML and validated; they carry
//!   the structural settings (loop rate, sensor scaling, control mode, logging, simulator).
use serde::Deserialize;
use std::path::PathBuf;

pub mod tunables;

pub use tunables::{DEFAULTS, OverrideReport, Tunables, names};

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoopCfg {
    /// Control rate; the nominal tick period is 1 / rate_hz.
    pub rate_hz: u32,
    /// Allowed deviation of the measured tick period, as a fraction of the nominal period.
    pub jitter_tolerance: f64,
}

impl Default for LoopCfg {
    fn default() -> Self {
        Self {
            rate_hz: 50,
            jitter_tolerance: 0.5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorCfg {
    /// Encoder ticks per revolution.
    pub counts_per_rev: u32,
    /// Per-tick position jump above which a reading is treated as an anomaly.
    pub max_counts_per_tick: u32,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            counts_per_rev: 128,
            max_counts_per_tick: 512,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Observer + state feedback with shaped position reference.
    #[default]
    StateSpace,
    /// PID on the filtered velocity error.
    Pid,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlantModel {
    #[default]
    Shooter,
}

impl PlantModel {
    /// Loop rate the model was discretized at.
    pub const fn rate_hz(self) -> u32 {
        match self {
            Self::Shooter => 50,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ControlCfg {
    pub mode: ControlMode,
    pub model: PlantModel,
    /// Smooth the power command with the output filter before linearizing.
    pub smooth_output: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct TunablesCfg {
    /// Optional `name value` override file.
    pub file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    /// Mechanical time constant of the flywheel.
    pub time_constant_s: f64,
    /// Steady-state angular velocity per applied volt.
    pub rad_per_s_per_volt: f64,
    pub supply_volts: f64,
    /// Fixed value returned by the simulated range sensor.
    pub range_reading: f64,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            time_constant_s: 0.5,
            rad_per_s_per_volt: 31.4,
            supply_volts: 12.0,
            range_reading: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default, rename = "loop")]
    pub schedule: LoopCfg,
    #[serde(default)]
    pub sensor: SensorCfg,
    #[serde(default)]
    pub control: ControlCfg,
    #[serde(default)]
    pub tunables: TunablesCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Loop
        if self.schedule.rate_hz == 0 {
            eyre::bail!("loop.rate_hz must be > 0");
        }
        if self.schedule.rate_hz > 1000 {
            eyre::bail!("loop.rate_hz is unreasonably large (>1000)");
        }
        if self.control.mode == ControlMode::StateSpace
            && self.schedule.rate_hz != self.control.model.rate_hz()
        {
            eyre::bail!(
                "loop.rate_hz must be {} for the {:?} model in state_space mode",
                self.control.model.rate_hz(),
                self.control.model
            );
        }
        if !(self.schedule.jitter_tolerance > 0.0 && self.schedule.jitter_tolerance <= 10.0) {
            eyre::bail!("loop.jitter_tolerance must be in (0.0, 10.0]");
        }

        // Sensor
        if self.sensor.counts_per_rev == 0 {
            eyre::bail!("sensor.counts_per_rev must be >= 1");
        }
        if self.sensor.max_counts_per_tick == 0 {
            eyre::bail!("sensor.max_counts_per_tick must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Simulator
        if !(self.sim.time_constant_s.is_finite() && self.sim.time_constant_s > 0.0) {
            eyre::bail!("sim.time_constant_s must be > 0");
        }
        if !(self.sim.rad_per_s_per_volt.is_finite() && self.sim.rad_per_s_per_volt > 0.0) {
            eyre::bail!("sim.rad_per_s_per_volt must be > 0");
        }
        if !(self.sim.supply_volts.is_finite() && self.sim.supply_volts > 0.0) {
            eyre::bail!("sim.supply_volts must be > 0");
        }
        if !self.sim.range_reading.is_finite() {
            eyre::bail!("sim.range_reading must be finite");
        }

        Ok(())
    }

    /// Nominal tick period in seconds.
    pub fn period_s(&self) -> f64 {
        1.0 / f64::from(self.schedule.rate_hz.max(1))
    }
}
