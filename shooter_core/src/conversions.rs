//! `From` implementations bridging `shooter_config` types to `shooter_core` types.

use crate::config::{ControlCfg, ControlMode, LoopCfg, SensorCfg};
use crate::regulator::ModelTag;

// ── LoopCfg ──────────────────────────────────────────────────────────────────

impl From<&shooter_config::LoopCfg> for LoopCfg {
    fn from(c: &shooter_config::LoopCfg) -> Self {
        Self {
            rate_hz: c.rate_hz,
            jitter_tolerance: c.jitter_tolerance,
        }
    }
}

// ── SensorCfg ────────────────────────────────────────────────────────────────

impl From<&shooter_config::SensorCfg> for SensorCfg {
    fn from(c: &shooter_config::SensorCfg) -> Self {
        Self {
            counts_per_rev: c.counts_per_rev,
            max_counts_per_tick: c.max_counts_per_tick,
        }
    }
}

// ── ControlCfg ───────────────────────────────────────────────────────────────

impl From<shooter_config::ControlMode> for ControlMode {
    fn from(m: shooter_config::ControlMode) -> Self {
        match m {
            shooter_config::ControlMode::StateSpace => ControlMode::StateSpace,
            shooter_config::ControlMode::Pid => ControlMode::Pid,
        }
    }
}

impl From<shooter_config::PlantModel> for ModelTag {
    fn from(m: shooter_config::PlantModel) -> Self {
        match m {
            shooter_config::PlantModel::Shooter => ModelTag::Shooter,
        }
    }
}

impl From<&shooter_config::ControlCfg> for ControlCfg {
    fn from(c: &shooter_config::ControlCfg) -> Self {
        Self {
            mode: c.mode.into(),
            model: c.model.into(),
            smooth_output: c.smooth_output,
        }
    }
}
