//! Assembling the controller against the simulated flywheel and running it.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use serde_json::json;
use shooter_config::{Config, Tunables};
use shooter_core::runner::{RunParams, RunSummary, run};
use shooter_core::{Shooter, ShooterError, ShooterTunables};
use shooter_hardware::{CsvTuningLog, SimFlywheel, SimParams, TracingTelemetry};
use shooter_traits::{Clock, ManualClock, MonotonicClock};

use crate::rt::{RtOpts, setup_rt_once};

#[derive(Debug, Clone)]
pub struct SpinOpts<'a> {
    pub target: f64,
    pub params: RunParams,
    pub realtime: bool,
    pub tuning_log: Option<&'a Path>,
    pub rt: Option<RtOpts>,
}

/// Simulator parameters from the run config; the motor follows the shooter power curve.
pub fn sim_params(cfg: &Config, tunables: &Tunables) -> eyre::Result<SimParams> {
    let resolved = ShooterTunables::resolve(tunables).map_err(eyre::Report::new)?;
    Ok(SimParams {
        time_constant_s: cfg.sim.time_constant_s,
        rad_per_s_per_volt: cfg.sim.rad_per_s_per_volt,
        supply_volts: cfg.sim.supply_volts,
        counts_per_rev: cfg.sensor.counts_per_rev,
        range_reading: cfg.sim.range_reading,
        actuator_curve: Some(resolved.shooter_curve),
    })
}

/// Controller wired to every handle of `sim`, configured from `cfg`.
pub fn build_shooter(
    cfg: &Config,
    tunables: Arc<Tunables>,
    sim: &SimFlywheel,
    clock: Arc<dyn Clock + Send + Sync>,
    tuning_log: Option<&Path>,
) -> eyre::Result<Shooter> {
    let builder = Shooter::builder()
        .with_motors(sim.left_motor(), sim.right_motor())
        .with_encoder(sim.encoder())
        .with_hood(sim.hood())
        .with_conveyor(sim.conveyor())
        .with_ranger(sim.ranger())
        .with_telemetry(TracingTelemetry::new())
        .with_tunables(tunables)
        .with_clock(clock)
        .with_loop((&cfg.schedule).into())
        .with_sensor((&cfg.sensor).into())
        .with_control((&cfg.control).into());
    let builder = match tuning_log {
        Some(path) => {
            let log = CsvTuningLog::create(path)
                .wrap_err_with(|| format!("create tuning log {}", path.display()))?;
            builder.with_tuning_sink(log)
        }
        None => builder,
    };
    builder.build()
}

/// Spin the simulated wheel to `opts.target` and return the run summary.
pub fn run_spin(
    cfg: &Config,
    tunables: Arc<Tunables>,
    opts: &SpinOpts<'_>,
    shutdown: &AtomicBool,
) -> eyre::Result<RunSummary> {
    if !(opts.target.is_finite() && opts.target >= 0.0) {
        return Err(eyre::Report::new(ShooterError::Config(format!(
            "target velocity must be finite and >= 0 rev/s, got {}",
            opts.target
        ))));
    }
    if let Some(rt) = opts.rt {
        setup_rt_once(rt);
    }

    let sim = SimFlywheel::new(sim_params(cfg, &tunables)?);
    let clock: Arc<dyn Clock + Send + Sync> = if opts.realtime {
        Arc::new(MonotonicClock::new())
    } else {
        Arc::new(ManualClock::new())
    };
    let mut shooter = build_shooter(cfg, tunables, &sim, Arc::clone(&clock), opts.tuning_log)?;
    shooter.set_target_velocity(opts.target);

    let summary = run(
        &mut shooter,
        clock.as_ref(),
        opts.params,
        |_, dt| sim.advance(dt),
        Some(shutdown),
    )?;
    if let Some(path) = opts.tuning_log {
        tracing::info!(path = %path.display(), "tuning log written");
    }
    Ok(summary)
}

/// Short spin-up against a fresh simulator; fails if the loop faulted or never moved the wheel.
pub fn self_check(cfg: &Config, tunables: Arc<Tunables>) -> eyre::Result<RunSummary> {
    let sim = SimFlywheel::new(sim_params(cfg, &tunables)?);
    let clock = ManualClock::new();
    let mut shooter = build_shooter(cfg, tunables, &sim, Arc::new(clock.clone()), None)?;
    shooter
        .get_ball_range()
        .map_err(eyre::Report::new)
        .wrap_err("range sensor")?;
    shooter.set_target_velocity(10.0);
    let summary = run(
        &mut shooter,
        &clock,
        RunParams {
            max_ticks: 25,
            hold_ticks: None,
        },
        |_, dt| sim.advance(dt),
        None,
    )?;
    if let Some(fault) = shooter.last_fault() {
        return Err(eyre::Report::new(fault.clone()));
    }
    if sim.velocity_rev_s() <= 0.0 {
        return Err(eyre::Report::new(ShooterError::Hardware(
            "wheel did not move during self-check".into(),
        )));
    }
    Ok(summary)
}

pub fn summary_json(target: f64, s: &RunSummary, period_s: f64) -> serde_json::Value {
    json!({
        "status": if s.interrupted { "interrupted" } else { "ok" },
        "target_rev_s": target,
        "ticks": s.ticks,
        "first_at_target_tick": s.first_at_target_tick,
        "time_to_target_s": s.first_at_target_tick.map(|t| t as f64 * period_s),
        "at_target": s.at_target,
        "final_velocity_rev_s": s.final_velocity,
        "final_power": s.final_power,
        "faults": s.faults,
        "jitter_events": s.jitter_events,
        "missed_deadlines": s.missed_deadlines,
        "latency_us": {
            "min": s.latency.min_us,
            "mean": s.latency.mean_us,
            "max": s.latency.max_us,
        },
    })
}

pub fn print_summary(target: f64, s: &RunSummary, period_s: f64, stats: bool) {
    let state = if s.interrupted { "interrupted" } else { "complete" };
    println!(
        "spin {state}: target {target:.2} rev/s, velocity {:.2} rev/s, at target: {}",
        s.final_velocity,
        if s.at_target { "yes" } else { "no" }
    );
    match s.first_at_target_tick {
        Some(t) => println!(
            "first at target: tick {t} ({:.2} s)",
            t as f64 * period_s
        ),
        None => println!("first at target: never"),
    }
    println!(
        "ticks: {}, faults: {}, jitter events: {}",
        s.ticks, s.faults, s.jitter_events
    );
    if stats {
        println!(
            "latency: min {} us, mean {:.1} us, max {} us; missed deadlines: {}",
            s.latency.min_us, s.latency.mean_us, s.latency.max_us, s.missed_deadlines
        );
    }
}
