//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use shooter_core::ShotPreset;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Config file read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG: &str = "etc/shooter.toml";

#[derive(Parser, Debug)]
#[command(name = "shooter", version, about = "Flywheel shooter controller")]
pub struct Cli {
    /// Path to run config TOML (default: etc/shooter.toml when present, else built-in defaults)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Tunables override file (`name value` per line); takes precedence over [tunables].file
    #[arg(long, value_name = "FILE")]
    pub tunables: Option<PathBuf>,

    /// Emit logs and results as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); falls back to [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

impl RtLock {
    pub fn os_default() -> Self {
        if cfg!(target_os = "linux") {
            RtLock::Current
        } else {
            RtLock::None
        }
    }
}

/// Named shooting speeds from the tunables table.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum PresetArg {
    Fender,
    FarFender,
    KeyClose,
    KeyFar,
    AutoKey,
}

impl From<PresetArg> for ShotPreset {
    fn from(p: PresetArg) -> Self {
        match p {
            PresetArg::Fender => ShotPreset::Fender,
            PresetArg::FarFender => ShotPreset::FarFender,
            PresetArg::KeyClose => ShotPreset::KeyClose,
            PresetArg::KeyFar => ShotPreset::KeyFar,
            PresetArg::AutoKey => ShotPreset::AutoKey,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Spin the (simulated) flywheel to a target velocity and report how it tracked
    Spin {
        /// Target velocity in rev/s
        #[arg(
            long,
            value_name = "REV_S",
            required_unless_present = "preset",
            conflicts_with = "preset"
        )]
        velocity: Option<f64>,
        /// Use a named shooting speed instead of --velocity
        #[arg(long, value_enum)]
        preset: Option<PresetArg>,
        /// Speed-increment steps added to the target (negative lowers it)
        #[arg(long, value_name = "STEPS", default_value_t = 0, allow_hyphen_values = true)]
        nudge: i32,
        /// Maximum number of control ticks
        #[arg(long, value_name = "N", default_value_t = 500)]
        ticks: u64,
        /// Stop once the wheel has stayed at target for this many consecutive ticks
        #[arg(long, value_name = "N")]
        hold_ticks: Option<u64>,
        /// Pace ticks with the wall clock instead of simulated time
        #[arg(long, action = ArgAction::SetTrue)]
        realtime: bool,
        /// Write (target, measured, aux) samples to this CSV file
        #[arg(long, value_name = "FILE")]
        tuning_log: Option<PathBuf>,
        /// Enable real-time mode (SCHED_FIFO, affinity, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on supported OSes.\n\nLinux: requests SCHED_FIFO priority, pins the process to one CPU and locks memory with mlockall. Usually needs CAP_SYS_NICE / CAP_IPC_LOCK or root. Failures are logged and the run continues.\n\nOther OSes: only memory locking is attempted."
        )]
        rt: bool,
        /// SCHED_FIFO priority for --rt (Linux only; default: max)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Memory locking mode for --rt: none, current, or all
        #[arg(long, value_enum, value_name = "MODE")]
        rt_lock: Option<RtLock>,
        /// CPU index to pin to for --rt (Linux only; default 0)
        #[arg(long, value_name = "CPU")]
        rt_cpu: Option<usize>,
        /// Print loop latency and deadline stats
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
    },
    /// Build the controller against the simulator and run a short spin-up
    SelfCheck,
    /// Print the effective tunables table
    Tunables,
}
