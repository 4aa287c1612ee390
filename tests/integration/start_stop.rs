#[path = "common/mod.rs"]
mod common;

use common::*;
use tempfile::tempdir;

#[test]
fn simple_start_and_ls() {
    let dir = tempdir().unwrap();
    write_descriptor(dir.path(), "web: \"sleep 60\"\n");

    pmo_cmd(dir.path()).args(["start", "web"]).assert().success();
    assert!(wait_for_pid_file(dir.path(), "web"));
    let pid = read_pid(dir.path(), "web").expect("pid recorded");
    assert!(pid > 0);

    pmo_cmd(dir.path())
        .arg("ls")
        .assert()
        .success()
        .stdout(predicates::str::contains("web"))
        .stdout(predicates::str::contains("running"));

    pmo_cmd(dir.path()).args(["stop", "web"]).assert().success();
    assert!(wait_for_pid_file_removed(dir.path(), "web"));
    assert!(wait_for_process_exit(pid));
}

#[test]
fn graceful_stop_of_shell_pipeline() {
    let dir = tempdir().unwrap();
    write_descriptor(dir.path(), "p: \"yes | head -n 100000000 | wc -l\"\n");

    pmo_cmd(dir.path()).args(["start", "p"]).assert().success();
    assert!(wait_for_pid_file(dir.path(), "p"));
    let pid = read_pid(dir.path(), "p").expect("pid recorded");

    pmo_cmd(dir.path()).args(["stop", "p"]).assert().success();
    assert!(wait_for_pid_file_removed(dir.path(), "p"));
    assert!(wait_for_process_exit(pid));
}

#[test]
fn stop_on_not_running_service_is_idempotent() {
    let dir = tempdir().unwrap();
    write_descriptor(dir.path(), "web: \"sleep 1\"\n");
    pmo_cmd(dir.path()).args(["stop", "web"]).assert().success();
    pmo_cmd(dir.path()).args(["stop", "web"]).assert().success();
}

#[test]
fn start_already_running_service_is_a_noop() {
    let dir = tempdir().unwrap();
    write_descriptor(dir.path(), "web: \"sleep 30\"\n");
    pmo_cmd(dir.path()).args(["start", "web"]).assert().success();
    assert!(wait_for_pid_file(dir.path(), "web"));
    let pid = read_pid(dir.path(), "web").unwrap();

    pmo_cmd(dir.path())
        .args(["start", "web"])
        .assert()
        .success()
        .stdout(predicates::str::contains("already running"));

    assert_eq!(read_pid(dir.path(), "web"), Some(pid));
    pmo_cmd(dir.path()).args(["stop", "web"]).assert().success();
}

#[test]
fn unknown_service_exits_with_code_two() {
    let dir = tempdir().unwrap();
    write_descriptor(dir.path(), "web: \"sleep 1\"\n");
    pmo_cmd(dir.path()).args(["start", "nope"]).assert().code(2);
}
