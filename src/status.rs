//! Status Probe: cross-checks recorded state against the OS to report
//! running/stopped/stale, plus uptime, CPU, RSS, and optional GPU
//! attribution.
//!
//! Grounded on the teacher's `status/mod.rs` `sysinfo::System` sampling
//! (`refresh_processes` + per-process `cpu_usage()`/`memory()`) and its
//! `nix::unistd::getpgid` process-group lookup, trimmed of the
//! cron/metrics/spawned-children fields that are Non-goals here.

use std::time::{SystemTime, UNIX_EPOCH};

use nix::sys::signal;
use nix::unistd::Pid as NixPid;
use sysinfo::{Pid as SysPid, ProcessesToUpdate, System};

use crate::config::ServiceSpec;
use crate::gpu::{self, GpuUsage};
use crate::state::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Running,
    Stopped,
    /// `pid_file` exists but the recorded PID is dead or recycled.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusRow {
    pub name: String,
    pub state: ServiceState,
    pub pid: Option<i32>,
    pub uptime_secs: Option<f64>,
    pub restart_count: u32,
    pub cpu_percent: Option<f32>,
    pub mem_rss_bytes: Option<u64>,
    pub gpu: Option<GpuUsage>,
    pub user: Option<String>,
}

/// True if a PID currently maps to a live process, using `kill(pid, 0)`
/// (a null signal probes existence/permission without actually signaling).
pub fn is_alive(pid: i32) -> bool {
    signal::kill(NixPid::from_raw(pid), None).is_ok()
}

/// Process-group id of `pid`, if still resolvable.
pub fn process_group_of(pid: i32) -> Option<i32> {
    nix::unistd::getpgid(Some(NixPid::from_raw(pid)))
        .ok()
        .map(|p| p.as_raw())
}

/// Best-effort descendant walk of the process table rooted at `pid`,
/// including `pid` itself. Used by the Stop Controller as a safety net for
/// processes that left the recorded process group, and by the Status
/// Probe to aggregate CPU/RSS/GPU across a service's tree.
pub fn descendants_of(system: &System, pid: i32) -> Vec<i32> {
    let mut tree = vec![pid];
    let mut frontier = vec![pid];
    while let Some(parent) = frontier.pop() {
        for (child_pid, proc_) in system.processes() {
            if proc_.parent().map(|p| p.as_u32() as i32) == Some(parent) {
                let child = child_pid.as_u32() as i32;
                if !tree.contains(&child) {
                    tree.push(child);
                    frontier.push(child);
                }
            }
        }
    }
    tree
}

/// Computes a [`StatusRow`] for `spec` by reading state and sampling the
/// OS. `system` should have been refreshed by the caller (batch status
/// calls share one refresh across all services).
pub fn status_of(
    store: &StateStore,
    spec: &ServiceSpec,
    system: &System,
    gpu_usage: &std::collections::HashMap<i32, GpuUsage>,
) -> StatusRow {
    let name = spec.name.clone();
    let recorded_pid = store.read_pid(&name);

    let Some(pid) = recorded_pid else {
        return StatusRow {
            name,
            state: ServiceState::Stopped,
            pid: None,
            uptime_secs: None,
            restart_count: store.read_restarts(&spec.name),
            cpu_percent: None,
            mem_rss_bytes: None,
            gpu: None,
            user: None,
        };
    };

    if !is_alive(pid) {
        return StatusRow {
            name,
            state: ServiceState::Stale,
            pid: Some(pid),
            uptime_secs: None,
            restart_count: store.read_restarts(&spec.name),
            cpu_percent: None,
            mem_rss_bytes: None,
            gpu: None,
            user: None,
        };
    }

    let tree = descendants_of(system, pid);
    let mut cpu_total: f32 = 0.0;
    let mut mem_total: u64 = 0;
    let mut user = None;
    let mut any_sampled = false;
    for tpid in &tree {
        if let Some(proc_) = system.process(SysPid::from_u32(*tpid as u32)) {
            any_sampled = true;
            cpu_total += proc_.cpu_usage();
            mem_total += proc_.memory() * 1024; // sysinfo reports KiB
            if user.is_none() {
                user = proc_.user_id().map(|uid| uid.to_string());
            }
        }
    }

    let uptime_secs = store.read_start_time(&name).map(|start| {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        (now - start).max(0.0)
    });

    StatusRow {
        name,
        state: ServiceState::Running,
        pid: Some(pid),
        uptime_secs,
        restart_count: store.read_restarts(&spec.name),
        cpu_percent: any_sampled.then_some(cpu_total),
        mem_rss_bytes: any_sampled.then_some(mem_total),
        gpu: gpu::aggregate_for_pids(gpu_usage, &tree),
        user,
    }
}

/// Produces status rows for every service, sharing a single `sysinfo`
/// refresh and a single `nvidia-smi` sample across the batch.
pub fn status_all(store: &StateStore, specs: &[ServiceSpec]) -> Vec<StatusRow> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    let gpu_usage = gpu::sample_per_pid_usage();

    specs
        .iter()
        .map(|s| status_of(store, s, &system, &gpu_usage))
        .collect()
}

/// Formats a byte count the way the teacher's status renderer does:
/// B/KB/MB/GB with one decimal place above the smallest unit.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}{}", UNITS[unit])
    } else {
        format!("{value:.1}{}", UNITS[unit])
    }
}

/// Formats elapsed seconds as `1h2m3s`-style human uptime.
pub fn format_uptime(total_seconds: f64) -> String {
    let total = total_seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
