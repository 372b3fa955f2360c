//! Fixed-period scheduler for a `Shooter`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use shooter_traits::clock::Clock;

use crate::core::Shooter;
use crate::error::{Result, ShooterError};
use crate::util::period;

/// How long to drive the controller.
#[derive(Debug, Clone, Copy)]
pub struct RunParams {
    /// Hard cap on ticks.
    pub max_ticks: u64,
    /// Stop early once at-target has held for this many consecutive ticks.
    pub hold_ticks: Option<u64>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            max_ticks: 500,
            hold_ticks: None,
        }
    }
}

/// Busy time of each tick (controller plus `between_ticks` hook), in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyStats {
    pub samples: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub mean_us: f64,
}

impl LatencyStats {
    fn record(&mut self, busy: Duration) {
        let us = u64::try_from(busy.as_micros()).unwrap_or(u64::MAX);
        if self.samples == 0 {
            self.min_us = us;
            self.max_us = us;
        } else {
            self.min_us = self.min_us.min(us);
            self.max_us = self.max_us.max(us);
        }
        self.samples += 1;
        self.mean_us += (us as f64 - self.mean_us) / self.samples as f64;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    /// 1-based tick on which at-target first became true.
    pub first_at_target_tick: Option<u64>,
    pub at_target: bool,
    pub final_velocity: f64,
    pub final_power: f64,
    /// Ticks whose busy time exceeded the period.
    pub missed_deadlines: u64,
    pub jitter_events: u64,
    /// Ticks that raised a fault.
    pub faults: u64,
    /// Stopped by the shutdown flag.
    pub interrupted: bool,
    pub latency: LatencyStats,
}

/// Tick `shooter` once per period on `clock` until `params` or `shutdown` says stop.
///
/// `between_ticks` runs after every tick with the nominal period; a simulated plant
/// advances there. `clock` must be the same timeline the shooter was built with.
pub fn run<F>(
    shooter: &mut Shooter,
    clock: &dyn Clock,
    params: RunParams,
    mut between_ticks: F,
    shutdown: Option<&AtomicBool>,
) -> Result<RunSummary>
where
    F: FnMut(&Shooter, Duration),
{
    if params.max_ticks == 0 {
        return Err(eyre::Report::new(ShooterError::Config(
            "max_ticks must be >= 1".into(),
        )));
    }
    let period = period(shooter.loop_cfg().rate_hz);
    let mut summary = RunSummary::default();
    let mut held = 0u64;

    tracing::info!(
        target = shooter.target_velocity(),
        period_us = period.as_micros() as u64,
        max_ticks = params.max_ticks,
        "run start"
    );

    for _ in 0..params.max_ticks {
        if shutdown.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            summary.interrupted = true;
            tracing::info!(ticks = summary.ticks, "shutdown requested");
            break;
        }

        let started = clock.now();
        let at_target = shooter.tick();
        summary.ticks += 1;
        if shooter.snapshot().fault.is_some() {
            summary.faults += 1;
        }
        if at_target {
            summary.first_at_target_tick.get_or_insert(summary.ticks);
            held += 1;
        } else {
            held = 0;
        }

        between_ticks(shooter, period);

        let busy = clock.elapsed_since(started);
        summary.latency.record(busy);
        if busy > period {
            summary.missed_deadlines += 1;
            tracing::warn!(busy_us = busy.as_micros() as u64, "tick overran its period");
        } else {
            clock.sleep(period - busy);
        }

        if params.hold_ticks.is_some_and(|h| held >= h) {
            break;
        }
    }

    summary.at_target = shooter.at_target_velocity();
    summary.final_velocity = shooter.velocity();
    summary.final_power = shooter.last_power();
    summary.jitter_events = shooter.jitter_events();
    tracing::info!(
        ticks = summary.ticks,
        first_at_target = ?summary.first_at_target_tick,
        velocity = summary.final_velocity,
        missed = summary.missed_deadlines,
        "run complete"
    );
    Ok(summary)
}
