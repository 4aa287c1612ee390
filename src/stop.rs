//! Stop Controller: the two-phase graceful stop (SIGTERM -> poll -> SIGKILL)
//! applied to a service's whole process tree.
//!
//! Grounded directly on the teacher's `bin/main.rs` `register_signal_handler`
//! — `killpg(pgid, SIGTERM)`, ESRCH/EPERM handling, a bounded sleep-poll
//! loop, then `killpg(pgid, SIGKILL)` — generalized from a fixed 150ms
//! sleep and a one-shot signal send into the spec's ~100ms poll loop with
//! a configurable timeout and a per-PID fallback for descendants that left
//! the process group (§4.3).

use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid as NixPid;
use sysinfo::{ProcessesToUpdate, System};
use tracing::warn;

use crate::constants::{DEFAULT_STOP_TIMEOUT, FINAL_KILL_POLL_TIMEOUT, STOP_POLL_INTERVAL};
use crate::error::{Outcome, Result, SupervisorError};
use crate::state::StateStore;
use crate::status::{descendants_of, is_alive};

/// Stops `name`, escalating from SIGTERM to SIGKILL if it does not exit
/// within `timeout`. A no-op on a service that isn't running returns
/// `Outcome::NotRunning`.
pub fn stop(store: &StateStore, name: &str, timeout: Duration) -> Result<Outcome> {
    let Some(pid) = store.read_pid(name) else {
        return Ok(Outcome::NotRunning);
    };

    if !is_alive(pid) {
        // Stale: recorded PID already gone. Clean up and report success.
        // pid_file is removed last (§3), even on this cleanup path.
        store.remove_start_time(name)?;
        store.remove_pid(name)?;
        return Ok(Outcome::NotRunning);
    }

    let pgid = crate::status::process_group_of(pid).unwrap_or(pid);

    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    let mut tree = descendants_of(&system, pid);

    send_to_group(pgid, Signal::SIGTERM, name);

    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        system.refresh_processes(ProcessesToUpdate::All, true);
        tree = descendants_of(&system, pid);
        if tree.iter().all(|p| !is_alive(*p)) {
            store.remove_start_time(name)?;
            store.remove_pid(name)?;
            return Ok(Outcome::Stopped);
        }
        thread::sleep(STOP_POLL_INTERVAL);
    }

    // Not returned as an error: §7 treats a SIGTERM timeout as a warning,
    // the escalation to SIGKILL below is the documented recovery.
    let timeout_warning = SupervisorError::StopTimeout {
        service: name.to_string(),
        timeout_secs: timeout.as_secs(),
    };
    warn!(service = %name, "{timeout_warning}, escalating to SIGKILL");

    // Escalate: SIGKILL the group, then individually for stragglers that
    // left the group.
    send_to_group(pgid, Signal::SIGKILL, name);
    for p in &tree {
        if is_alive(*p) {
            let _ = signal::kill(NixPid::from_raw(*p), Signal::SIGKILL);
        }
    }

    let final_deadline = Instant::now() + FINAL_KILL_POLL_TIMEOUT;
    let mut survivors = Vec::new();
    while Instant::now() < final_deadline {
        survivors = tree.iter().copied().filter(|p| is_alive(*p)).collect();
        if survivors.is_empty() {
            break;
        }
        thread::sleep(STOP_POLL_INTERVAL);
    }

    store.remove_start_time(name)?;
    store.remove_pid(name)?;

    if survivors.is_empty() {
        Ok(Outcome::Stopped)
    } else {
        warn!(service = %name, pids = ?survivors, "descendant survived SIGKILL window");
        Ok(Outcome::StoppedWithUnkillableDescendants { pids: survivors })
    }
}

fn send_to_group(pgid: i32, sig: Signal, service: &str) {
    match unsafe_killpg(pgid, sig) {
        Ok(()) => {}
        Err(Errno::ESRCH) => {
            // Already gone; nothing to do.
        }
        Err(Errno::EPERM) => {
            warn!(service, pgid, "insufficient permissions to signal process group, falling back to direct kill");
            let _ = signal::kill(NixPid::from_raw(pgid), sig);
        }
        Err(e) => {
            warn!(service, pgid, error = %e, "failed to signal process group");
        }
    }
}

fn unsafe_killpg(pgid: i32, sig: Signal) -> std::result::Result<(), Errno> {
    let ret = unsafe { libc::killpg(pgid, sig as i32) };
    if ret == -1 {
        Err(Errno::last())
    } else {
        Ok(())
    }
}
