#[path = "common/mod.rs"]
mod common;

use std::fs;

use common::*;
use tempfile::tempdir;

#[test]
fn dotenv_merge_precedence_favors_service_env() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".env"), "FOO=from-env\n").unwrap();
    write_descriptor(
        dir.path(),
        "t:\n  cmd: \"echo $FOO > marker.txt\"\n  env:\n    FOO: from-spec\n",
    );

    pmo_cmd(dir.path()).args(["start", "t"]).assert().success();
    assert!(wait_for_pid_file(dir.path(), "t"));

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    let marker = dir.path().join("marker.txt");
    while std::time::Instant::now() < deadline && !marker.exists() {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    let contents = fs::read_to_string(&marker).unwrap_or_default();
    assert_eq!(contents.trim(), "from-spec");
}

#[test]
fn missing_descriptor_exits_with_code_one() {
    let dir = tempdir().unwrap();
    pmo_cmd(dir.path()).args(["ls"]).assert().code(1);
}

#[test]
fn relative_cwd_resolves_against_descriptor_directory() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("subdir")).unwrap();
    write_descriptor(
        dir.path(),
        "t:\n  cmd: \"pwd > where.txt\"\n  cwd: subdir\n",
    );

    pmo_cmd(dir.path()).args(["start", "t"]).assert().success();
    assert!(wait_for_pid_file(dir.path(), "t"));

    let marker = dir.path().join("subdir").join("where.txt");
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while std::time::Instant::now() < deadline && !marker.exists() {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }
    let contents = fs::read_to_string(&marker).unwrap_or_default();
    assert!(contents.trim().ends_with("subdir"));
}
