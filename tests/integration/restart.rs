#[path = "common/mod.rs"]
mod common;

use common::*;
use tempfile::tempdir;

#[test]
fn restart_increments_restarts_by_two_after_two_restarts() {
    let dir = tempdir().unwrap();
    write_descriptor(dir.path(), "s: \"sleep 30\"\n");

    pmo_cmd(dir.path()).args(["start", "s"]).assert().success();
    assert!(wait_for_pid_file(dir.path(), "s"));
    assert_eq!(read_restarts(dir.path(), "s"), 0);

    pmo_cmd(dir.path()).args(["restart", "s"]).assert().success();
    assert!(wait_for_pid_file(dir.path(), "s"));
    assert_eq!(read_restarts(dir.path(), "s"), 1);

    pmo_cmd(dir.path()).args(["restart", "s"]).assert().success();
    assert!(wait_for_pid_file(dir.path(), "s"));
    assert_eq!(read_restarts(dir.path(), "s"), 2);

    let pid = read_pid(dir.path(), "s").unwrap();
    pmo_cmd(dir.path()).args(["stop", "s"]).assert().success();
    assert!(wait_for_process_exit(pid));
}

#[test]
fn manual_stop_then_start_does_not_advance_restart_count() {
    let dir = tempdir().unwrap();
    write_descriptor(dir.path(), "s: \"sleep 30\"\n");

    pmo_cmd(dir.path()).args(["start", "s"]).assert().success();
    assert!(wait_for_pid_file(dir.path(), "s"));
    pmo_cmd(dir.path()).args(["stop", "s"]).assert().success();
    assert!(wait_for_pid_file_removed(dir.path(), "s"));

    pmo_cmd(dir.path()).args(["start", "s"]).assert().success();
    assert!(wait_for_pid_file(dir.path(), "s"));
    assert_eq!(read_restarts(dir.path(), "s"), 0);

    let pid = read_pid(dir.path(), "s").unwrap();
    pmo_cmd(dir.path()).args(["stop", "s"]).assert().success();
    assert!(wait_for_process_exit(pid));
}
