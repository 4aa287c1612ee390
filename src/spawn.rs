//! Process Runner: spawns a service as a detached process-group leader
//! with redirected I/O, and records its on-disk state.
//!
//! Grounded on the teacher's `daemon.rs` `Command::new("sh").arg("-c")`
//! spawn shape and `bin/main.rs`'s session/process-group handling, but
//! rewritten per the spec: logs are opened directly in append mode as the
//! child's stdout/stderr (no supervisor-side relay thread, since the
//! supervisor is short-lived and must not hold the child's descriptors
//! open after spawn), and state is written in the `time -> restarts ->
//! pid` order required by §4.2.

use std::fs::OpenOptions;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};

use tracing::info;

use crate::config::ServiceSpec;
use crate::constants::{DEFAULT_SHELL, SHELL_COMMAND_FLAG};
use crate::error::{Outcome, Result, SupervisorError};
use crate::state::StateStore;
use crate::status::is_alive;

/// Starts `spec` if it is not already running. A no-op on an already
/// running service returns `Outcome::AlreadyRunning`, not an error.
///
/// `is_restart` controls whether `restarts_file` is bumped as part of this
/// start; a cold start leaves it untouched (0 if absent).
pub fn start(store: &StateStore, spec: &ServiceSpec, is_restart: bool) -> Result<Outcome> {
    if let Some(pid) = store.read_pid(&spec.name) {
        if is_alive(pid) {
            return Ok(Outcome::AlreadyRunning { pid });
        }
    }

    store.ensure_layout()?;

    let stdout_log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(store.stdout_log_path(&spec.name))?;
    let stderr_log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(store.stderr_log_path(&spec.name))?;

    let mut command = Command::new(DEFAULT_SHELL);
    command
        .arg(SHELL_COMMAND_FLAG)
        .arg(&spec.cmd)
        .current_dir(&spec.cwd)
        .env_clear()
        .envs(spec.env.iter().cloned())
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_log))
        .stderr(Stdio::from(stderr_log));

    // Detach into a fresh session/process group so the Stop Controller can
    // later signal the whole tree via killpg on this pid.
    unsafe {
        command.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = command.spawn().map_err(|e| SupervisorError::SpawnFailed {
        service: spec.name.clone(),
        reason: e.to_string(),
    })?;

    let pid = child.id() as i32;
    // The child is detached; we don't wait on it or hold its handle open
    // beyond this scope. `std::process::Child`'s Drop does not kill it.
    std::mem::forget(child);

    store.write_start_time_now(&spec.name)?;
    if is_restart {
        let next = store.read_restarts(&spec.name) + 1;
        store.write_restarts(&spec.name, next)?;
    }
    store.write_pid(&spec.name, pid)?;

    info!(service = %spec.name, pid, "started");
    Ok(Outcome::Started { pid })
}
