#[path = "common/mod.rs"]
mod common;

use std::time::{Duration, Instant};

use common::*;
use tempfile::tempdir;

fn log_path(dir: &std::path::Path, service: &str, suffix: &str) -> std::path::PathBuf {
    dir.join(".pmo").join(hostname()).join("logs").join(format!("{service}{suffix}"))
}

#[test]
fn stdout_is_appended_to_out_log() {
    let dir = tempdir().unwrap();
    write_descriptor(dir.path(), "w: \"echo hello-from-w\"\n");
    pmo_cmd(dir.path()).args(["start", "w"]).assert().success();

    let out = log_path(dir.path(), "w", "-out.log");
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut contents = String::new();
    while Instant::now() < deadline {
        if let Ok(c) = std::fs::read_to_string(&out) {
            if c.contains("hello-from-w") {
                contents = c;
                break;
            }
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    assert!(contents.contains("hello-from-w"));
}

#[test]
fn flush_on_stopped_service_deletes_log_files() {
    let dir = tempdir().unwrap();
    write_descriptor(dir.path(), "w: \"sleep 30\"\n");
    pmo_cmd(dir.path()).args(["start", "w"]).assert().success();
    assert!(wait_for_pid_file(dir.path(), "w"));
    let pid = read_pid(dir.path(), "w").unwrap();
    pmo_cmd(dir.path()).args(["stop", "w"]).assert().success();
    assert!(wait_for_process_exit(pid));

    let out = log_path(dir.path(), "w", "-out.log");
    assert!(out.exists());

    pmo_cmd(dir.path()).args(["flush", "w"]).assert().success();
    assert!(!out.exists());
}

#[test]
fn flush_on_running_service_truncates_not_deletes() {
    let dir = tempdir().unwrap();
    write_descriptor(dir.path(), "w: \"sleep 30\"\n");
    pmo_cmd(dir.path()).args(["start", "w"]).assert().success();
    assert!(wait_for_pid_file(dir.path(), "w"));
    let pid = read_pid(dir.path(), "w").unwrap();

    let out = log_path(dir.path(), "w", "-out.log");
    pmo_cmd(dir.path()).args(["flush", "w"]).assert().success();
    assert!(out.exists());
    assert_eq!(std::fs::metadata(&out).unwrap().len(), 0);

    pmo_cmd(dir.path()).args(["stop", "w"]).assert().success();
    assert!(wait_for_process_exit(pid));
}
