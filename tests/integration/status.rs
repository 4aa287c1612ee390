#[path = "common/mod.rs"]
mod common;

use std::fs;

use common::*;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn stale_pid_is_reported_and_cleaned_up_on_next_start() {
    let dir = tempdir().unwrap();
    write_descriptor(dir.path(), "x: \"sleep 30\"\n");

    let pids_dir = dir.path().join(".pmo").join(hostname()).join("pids");
    fs::create_dir_all(&pids_dir).unwrap();
    fs::write(pids_dir.join("x.pid"), "999999999").unwrap();

    pmo_cmd(dir.path())
        .arg("ls")
        .assert()
        .success()
        .stdout(predicates::str::contains("stale"));

    pmo_cmd(dir.path()).args(["start", "x"]).assert().success();
    assert!(wait_for_pid_file(dir.path(), "x"));
    let pid = read_pid(dir.path(), "x").unwrap();
    assert_ne!(pid, 999_999_999);

    pmo_cmd(dir.path()).args(["stop", "x"]).assert().success();
    assert!(wait_for_process_exit(pid));
}

#[test]
fn reserved_service_name_is_skipped_with_warning() {
    let dir = tempdir().unwrap();
    write_descriptor(dir.path(), "pmo: \"echo hi\"\nweb: \"sleep 10\"\n");

    pmo_cmd(dir.path())
        .arg("ls")
        .assert()
        .success()
        .stdout(predicates::str::contains("web"))
        .stdout(predicates::str::contains("pmo").not());
}

#[test]
fn never_started_service_reports_stopped() {
    let dir = tempdir().unwrap();
    write_descriptor(dir.path(), "idle: \"sleep 1\"\n");
    pmo_cmd(dir.path())
        .arg("ls")
        .assert()
        .success()
        .stdout(predicates::str::contains("stopped"));
}
