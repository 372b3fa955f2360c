//! Real-time scheduling for the control loop: memory locking, SCHED_FIFO and CPU pinning.
//!
//! Every step is best-effort. A step that fails is logged with a hint and the loop runs
//! with normal scheduling.

use crate::cli::RtLock;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy)]
pub struct RtOpts {
    pub prio: Option<i32>,
    pub lock: RtLock,
    pub cpu: Option<usize>,
}

/// Apply `opts` once per process; later calls are no-ops.
pub fn setup_rt_once(opts: RtOpts) {
    static RT_ONCE: OnceLock<()> = OnceLock::new();
    RT_ONCE.get_or_init(|| {
        match lock_memory(opts.lock) {
            Ok(()) => tracing::info!(mode = ?opts.lock, "rt: memory lock applied"),
            Err(e) => tracing::warn!(mode = ?opts.lock, error = %e, "rt: mlockall failed"),
        }
        match set_fifo(opts.prio) {
            Ok(prio) => tracing::info!(prio, "rt: SCHED_FIFO applied"),
            Err(e) => tracing::warn!(error = %e, "rt: SCHED_FIFO not applied"),
        }
        let cpu = opts.cpu.unwrap_or(0);
        match pin_cpu(cpu) {
            Ok(()) => tracing::info!(cpu, "rt: pinned"),
            Err(e) => tracing::warn!(cpu, error = %e, "rt: affinity not applied"),
        }
    });
}

fn lock_memory(lock: RtLock) -> eyre::Result<()> {
    let flags = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => libc::MCL_CURRENT,
        RtLock::All => libc::MCL_CURRENT | libc::MCL_FUTURE,
    };
    // SAFETY: mlockall takes only flags and touches no caller memory.
    let rc = unsafe { libc::mlockall(flags) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    let retryable = matches!(err.raw_os_error(), Some(c) if c == libc::EPERM || c == libc::ENOMEM);
    if lock == RtLock::All && retryable {
        // SAFETY: as above.
        if unsafe { libc::mlockall(libc::MCL_CURRENT) } == 0 {
            tracing::warn!("rt: mlockall(current|future) refused; locked current pages only");
            return Ok(());
        }
    }
    if retryable {
        eyre::bail!("{err}; needs CAP_IPC_LOCK (or root) and a sufficient 'ulimit -l'");
    }
    Err(eyre::eyre!(err))
}

#[cfg(target_os = "linux")]
fn set_fifo(prio: Option<i32>) -> eyre::Result<i32> {
    // SAFETY: plain queries with no pointer arguments.
    let (min, max) = unsafe {
        (
            libc::sched_get_priority_min(libc::SCHED_FIFO),
            libc::sched_get_priority_max(libc::SCHED_FIFO),
        )
    };
    let (min, max) = if min < 0 || max < 0 { (1, 99) } else { (min, max) };
    let wanted = prio.unwrap_or(max).clamp(min, max);
    let param = libc::sched_param {
        sched_priority: wanted,
    };
    // SAFETY: `param` outlives the call; pid 0 means this process.
    let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EPERM) {
            eyre::bail!("{err}; needs CAP_SYS_NICE or root");
        }
        return Err(eyre::eyre!(err));
    }
    Ok(wanted)
}

#[cfg(not(target_os = "linux"))]
fn set_fifo(_prio: Option<i32>) -> eyre::Result<i32> {
    eyre::bail!("SCHED_FIFO is only supported on Linux")
}

#[cfg(target_os = "linux")]
fn pin_cpu(cpu: usize) -> eyre::Result<()> {
    let capacity = std::mem::size_of::<libc::cpu_set_t>() * 8;
    if cpu >= capacity {
        eyre::bail!("CPU {cpu} exceeds cpu_set_t capacity {capacity}");
    }
    // SAFETY: cpu_set_t is plain data; an all-zero value is the empty set.
    let mut allowed: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    // SAFETY: `allowed` is a valid, correctly sized out-parameter.
    let rc = unsafe {
        libc::sched_getaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &mut allowed)
    };
    if rc != 0 {
        return Err(eyre::eyre!(std::io::Error::last_os_error()));
    }
    // SAFETY: `cpu` is below the set capacity checked above.
    if !unsafe { libc::CPU_ISSET(cpu, &allowed) } {
        eyre::bail!("CPU {cpu} not permitted by the current affinity mask");
    }
    // SAFETY: as above.
    let mut wanted: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    unsafe { libc::CPU_SET(cpu, &mut wanted) };
    // SAFETY: `wanted` is a valid, correctly sized cpu set.
    let rc =
        unsafe { libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &wanted) };
    if rc != 0 {
        return Err(eyre::eyre!(std::io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn pin_cpu(_cpu: usize) -> eyre::Result<()> {
    eyre::bail!("CPU affinity is only supported on Linux")
}
