//! GPU adapter: a thin, best-effort wrapper around `nvidia-smi`.
//!
//! Like the YAML and dotenv collaborators, this is an external tool
//! wrapper, not a reimplementation: absence of the binary, a non-zero
//! exit, or unparseable output are all treated identically — no GPU
//! attribution, logged at `debug`, never a hard error (§4.7).

use std::collections::HashMap;
use std::process::Command;

use tracing::debug;

/// GPU attribution for one process tree: the memory (bytes) it holds and
/// the device indices it touches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuUsage {
    pub mem_bytes: u64,
    pub device_ids: Vec<u32>,
}

/// Queries `nvidia-smi` for per-PID compute memory usage, keyed by PID.
/// Returns an empty map (not an error) if the tool is unavailable or its
/// output can't be parsed.
pub fn sample_per_pid_usage() -> HashMap<i32, GpuUsage> {
    let index_by_uuid = match query_device_index_by_uuid() {
        Some(m) => m,
        None => return HashMap::new(),
    };

    let output = match Command::new("nvidia-smi")
        .args([
            "--query-compute-apps=pid,used_memory,gpu_uuid",
            "--format=csv,noheader,nounits",
        ])
        .output()
    {
        Ok(o) if o.status.success() => o,
        Ok(o) => {
            debug!(status = ?o.status, "nvidia-smi compute-apps query failed");
            return HashMap::new();
        }
        Err(e) => {
            debug!(error = %e, "nvidia-smi not available");
            return HashMap::new();
        }
    };

    let text = String::from_utf8_lossy(&output.stdout);
    let mut usage: HashMap<i32, GpuUsage> = HashMap::new();
    for line in text.lines() {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 3 {
            continue;
        }
        let Ok(pid) = fields[0].parse::<i32>() else {
            continue;
        };
        let Ok(mem_mib) = fields[1].parse::<u64>() else {
            continue;
        };
        let uuid = fields[2];
        let device_id = index_by_uuid.get(uuid).copied();

        let entry = usage.entry(pid).or_default();
        entry.mem_bytes += mem_mib * 1024 * 1024;
        if let Some(id) = device_id {
            if !entry.device_ids.contains(&id) {
                entry.device_ids.push(id);
            }
        }
    }
    usage
}

fn query_device_index_by_uuid() -> Option<HashMap<String, u32>> {
    let output = Command::new("nvidia-smi")
        .args(["--query-gpu=index,uuid", "--format=csv,noheader"])
        .output()
        .ok()?;
    if !output.status.success() {
        debug!(status = ?output.status, "nvidia-smi index query failed");
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    let mut map = HashMap::new();
    for line in text.lines() {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 2 {
            continue;
        }
        if let Ok(index) = fields[0].parse::<u32>() {
            map.insert(fields[1].to_string(), index);
        }
    }
    Some(map)
}

/// Aggregates per-PID usage across a set of PIDs belonging to one service
/// tree. Returns `None` if none of the PIDs have GPU attribution.
pub fn aggregate_for_pids(per_pid: &HashMap<i32, GpuUsage>, pids: &[i32]) -> Option<GpuUsage> {
    let mut total = GpuUsage::default();
    let mut found = false;
    for pid in pids {
        if let Some(u) = per_pid.get(pid) {
            found = true;
            total.mem_bytes += u.mem_bytes;
            for id in &u.device_ids {
                if !total.device_ids.contains(id) {
                    total.device_ids.push(*id);
                }
            }
        }
    }
    found.then_some(total)
}
