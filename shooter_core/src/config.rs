//! Configuration types for the shooter controller.
//!
//! These are the runtime structs used by `Shooter`. They are separate from the
//! TOML-deserialized config in `shooter_config`; see `conversions` for the bridge.

use shooter_config::{Tunables, names};

use crate::error::BuildError;
use crate::pid::PidGains;
use crate::regulator::ModelTag;

/// Tick scheduling.
#[derive(Debug, Clone)]
pub struct LoopCfg {
    /// Control rate in Hz; nominal period is `1 / rate_hz`.
    pub rate_hz: u32,
    /// Measured periods further than this fraction from nominal are counted as jitter.
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

/// Encoder scaling and plausibility limits.
#[derive(Debug, Clone)]
pub struct SensorCfg {
    pub counts_per_rev: u32,
    /// Larger per-tick jumps are treated as a sensor anomaly.
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    #[default]
    StateSpace,
    Pid,
}

#[derive(Debug, Clone, Default)]
pub struct ControlCfg {
    pub mode: ControlMode,
    pub model: ModelTag,
    /// Route the power command through the output filter before linearizing.
    pub smooth_output: bool,
}

/// Tunables the controller reads, resolved once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ShooterTunables {
    pub pid: PidGains,
    pub shooter_curve: [f64; 4],
    pub conveyor_curve: [f64; 4],
    /// |filtered - target| below this (rev/s) counts as at target.
    pub velocity_threshold: f64,
    /// Targets above this raise the hood; positive targets at or below lower it.
    pub hood_up_speed: f64,
    pub speed_increment: f64,
}

impl ShooterTunables {
    /// Resolve every tunable the controller needs. A missing name fails construction.
    pub fn resolve(t: &Tunables) -> Result<Self, BuildError> {
        let get = |name: &str| {
            t.get(name)
                .ok_or_else(|| BuildError::MissingTunable(name.to_string()))
        };
        Ok(Self {
            pid: PidGains {
                kp: get(names::SHOOTER_KP)?,
                ki: get(names::SHOOTER_KI)?,
                kd: get(names::SHOOTER_KD)?,
            },
            shooter_curve: [
                get(names::SHOOTER_COEFF_A)?,
                get(names::SHOOTER_COEFF_B)?,
                get(names::SHOOTER_COEFF_C)?,
                get(names::SHOOTER_COEFF_D)?,
            ],
            conveyor_curve: [
                get(names::CONVEYOR_COEFF_A)?,
                get(names::CONVEYOR_COEFF_B)?,
                get(names::CONVEYOR_COEFF_C)?,
                get(names::CONVEYOR_COEFF_D)?,
            ],
            velocity_threshold: get(names::VELOCITY_THRESHOLD)?,
            hood_up_speed: get(names::HOOD_UP_SPEED)?,
            speed_increment: get(names::SPEED_INCREMENT)?,
        })
    }
}
