#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `shooter` command-line front end: spins the simulated flywheel under the controller.

mod cli;
mod error_fmt;
mod rt;
mod spin;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use serde_json::json;
use shooter_config::{Config, Logging, Tunables};
use shooter_core::ShotPreset;
use shooter_core::runner::RunParams;

use crate::cli::{Cli, Commands, DEFAULT_CONFIG, FILE_GUARD, RtLock};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::rt::RtOpts;
use crate::spin::{SpinOpts, print_summary, run_spin, self_check, summary_json};

fn main() {
    let cli = Cli::parse();
    let json = cli.json;
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: error reporter not installed: {e}");
    }
    if let Err(err) = real_main(cli) {
        if json {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    cfg.validate()?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;

    let tunables_path: Option<PathBuf> = cli.tunables.clone().or_else(|| cfg.tunables.file.clone());
    let tunables = Arc::new(Tunables::load(tunables_path.as_deref()));
    let period_s = cfg.period_s();

    match cli.cmd {
        Commands::Spin {
            velocity,
            preset,
            nudge,
            ticks,
            hold_ticks,
            realtime,
            tuning_log,
            rt,
            rt_prio,
            rt_lock,
            rt_cpu,
            stats,
        } => {
            let base = match (velocity, preset) {
                (Some(v), _) => v,
                (None, Some(p)) => ShotPreset::from(p).speed(&tunables)?,
                (None, None) => eyre::bail!("either --velocity or --preset is required"),
            };
            let target = if nudge == 0 {
                base
            } else {
                let step = tunables.require(shooter_config::names::SPEED_INCREMENT)?;
                base + f64::from(nudge) * step
            };

            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = Arc::clone(&shutdown);
                if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                    tracing::warn!(error = %e, "Ctrl-C handler not installed");
                }
            }

            let opts = SpinOpts {
                target,
                params: RunParams {
                    max_ticks: ticks,
                    hold_ticks,
                },
                realtime,
                tuning_log: tuning_log.as_deref(),
                rt: rt.then(|| RtOpts {
                    prio: rt_prio,
                    lock: rt_lock.unwrap_or_else(RtLock::os_default),
                    cpu: rt_cpu,
                }),
            };
            let summary = run_spin(&cfg, tunables, &opts, &shutdown)?;
            if cli.json {
                println!("{}", summary_json(target, &summary, period_s));
            } else {
                print_summary(target, &summary, period_s, stats);
            }
        }
        Commands::SelfCheck => {
            let summary = self_check(&cfg, tunables)?;
            if cli.json {
                println!(
                    "{}",
                    json!({ "status": "ok", "ticks": summary.ticks, "final_velocity_rev_s": summary.final_velocity })
                );
            } else {
                println!(
                    "self-check ok: {} ticks, wheel at {:.2} rev/s",
                    summary.ticks, summary.final_velocity
                );
            }
        }
        Commands::Tunables => {
            if cli.json {
                let map: serde_json::Map<String, serde_json::Value> = tunables
                    .iter()
                    .map(|(name, value)| (name.to_string(), json!(value)))
                    .collect();
                println!("{}", serde_json::Value::Object(map));
            } else {
                for (name, value) in tunables.iter() {
                    println!("{name} {value}");
                }
            }
        }
    }
    Ok(())
}

/// Explicit `--config` must exist; the default path is optional.
fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let path = match path {
        Some(p) => p,
        None => {
            let default = Path::new(DEFAULT_CONFIG);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = shooter_config::load_toml(&text)
        .wrap_err_with(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

fn init_tracing(json: bool, cli_level: Option<&str>, logging: &Logging) -> eyre::Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = cli_level.or(logging.level.as_deref()).unwrap_or("info");
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level).wrap_err_with(|| format!("invalid log level '{level}'"))?,
    };

    // Console logs go to stderr so stdout carries only results.
    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "shooter.log".to_string());
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
