//! Shared test helpers for the black-box integration suite.
//!
//! Grounded on the teacher's `tests/integration/common/mod.rs` polling
//! idiom: a bounded deadline with a short sleep between checks, rather
//! than a fixed sleep that's either too slow or flaky under load.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use assert_cmd::Command;

pub fn pmo_cmd(descriptor_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pmo").expect("pmo binary");
    cmd.current_dir(descriptor_dir);
    cmd
}

pub fn write_descriptor(dir: &Path, yaml: &str) -> PathBuf {
    let path = dir.join("pmo.yml");
    fs::write(&path, yaml).unwrap();
    path
}

fn poll<F: Fn() -> bool>(timeout: Duration, check: F) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

pub fn wait_for_pid_file(dir: &Path, service: &str) -> bool {
    let path = dir.join(".pmo").join(hostname()).join("pids").join(format!("{service}.pid"));
    poll(Duration::from_secs(5), || path.exists())
}

pub fn wait_for_pid_file_removed(dir: &Path, service: &str) -> bool {
    let path = dir.join(".pmo").join(hostname()).join("pids").join(format!("{service}.pid"));
    poll(Duration::from_secs(5), || !path.exists())
}

pub fn read_pid(dir: &Path, service: &str) -> Option<i32> {
    let path = dir.join(".pmo").join(hostname()).join("pids").join(format!("{service}.pid"));
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

pub fn read_restarts(dir: &Path, service: &str) -> u32 {
    let path = dir
        .join(".pmo")
        .join(hostname())
        .join("pids")
        .join(format!("{service}.restarts"));
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

pub fn wait_for_process_exit(pid: i32) -> bool {
    poll(Duration::from_secs(5), || {
        unsafe { libc::kill(pid, 0) == -1 }
    })
}

pub fn hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|s| s.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string())
}
