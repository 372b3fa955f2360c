#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Flywheel velocity control (hardware-agnostic).
//!
//! All device access goes through the capability traits in `shooter_traits`; the
//! controller is handed boxed implementations at construction.
//!
//! ## Architecture
//!
//! - **Filtering**: fixed-capacity moving average (`filter`)
//! - **Regulation**: observer + state feedback over a plant-model registry (`regulator`)
//! - **Reference shaping**: saturation-consistent position reference (`shaper`)
//! - **Linearization**: polynomial power compensation (`linearize`)
//! - **PID**: auxiliary control mode over the same tunables (`pid`)
//! - **Controller**: `Shooter`, its builder and the fixed-period runner
//!
//! ## Units
//!
//! Target and filtered velocity are in rev/s. The regulator works in rad and rad/s and
//! its control input is in volts, divided by `SUPPLY_VOLTS` before linearization.

pub mod builder;
pub mod config;
pub mod conversions;
pub mod core;
pub mod error;
pub mod filter;
pub mod hw_error;
pub mod linearize;
pub mod mocks;
pub mod pid;
pub mod preset;
pub mod regulator;
pub mod runner;
pub mod shaper;
pub mod status;
pub mod util;

pub use crate::builder::{Missing, Set, ShooterBuilder};
pub use crate::config::{ControlCfg, ControlMode, LoopCfg, SensorCfg, ShooterTunables};
pub use crate::core::{SUPPLY_VOLTS, Shooter, ShooterIo};
pub use crate::error::{BuildError, Result, ShooterError};
pub use crate::preset::ShotPreset;
pub use crate::regulator::ModelTag;
pub use crate::runner::{LatencyStats, RunParams, RunSummary};
pub use crate::status::TickSnapshot;
