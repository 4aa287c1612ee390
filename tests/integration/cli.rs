#[path = "common/mod.rs"]
mod common;

use common::*;
use tempfile::tempdir;

#[test]
fn dry_run_prints_resolved_spec_without_spawning() {
    let dir = tempdir().unwrap();
    write_descriptor(dir.path(), "web: \"sleep 60\"\n");

    pmo_cmd(dir.path())
        .args(["dry-run", "web"])
        .assert()
        .success()
        .stdout(predicates::str::contains("sleep 60"));

    assert!(!wait_for_pid_file(dir.path(), "web"));
}

#[test]
fn numeric_id_selects_by_iteration_order() {
    let dir = tempdir().unwrap();
    write_descriptor(dir.path(), "first: \"sleep 30\"\nsecond: \"sleep 30\"\n");

    pmo_cmd(dir.path()).args(["start", "0"]).assert().success();
    assert!(wait_for_pid_file(dir.path(), "first"));
    let pid = read_pid(dir.path(), "first").unwrap();
    pmo_cmd(dir.path()).args(["stop", "0"]).assert().success();
    assert!(wait_for_process_exit(pid));
}

#[test]
fn ps_is_an_alias_for_ls() {
    let dir = tempdir().unwrap();
    write_descriptor(dir.path(), "web: \"sleep 1\"\n");
    pmo_cmd(dir.path())
        .arg("ps")
        .assert()
        .success()
        .stdout(predicates::str::contains("web"));
}
