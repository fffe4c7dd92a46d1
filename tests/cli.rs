// Copyright 2026 cvise-rs contributors

//! Black-box tests driving the `cvise` binary end to end.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn write_script(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
    }
    path
}

#[test]
fn s1_reduces_to_the_required_line() {
    let dir = tempdir().unwrap();
    let script = write_script(dir.path(), "check.sh", "#!/bin/sh\ngrep -q 'int y' input.c\n");
    let input = dir.path().join("input.c");
    fs::write(&input, "int x;\nint y;\n").unwrap();

    Command::cargo_bin("cvise")
        .unwrap()
        .arg(&script)
        .arg(&input)
        .arg("--n")
        .arg("2")
        .arg("--timeout")
        .arg("5")
        .assert()
        .success();

    let result = fs::read_to_string(&input).unwrap();
    assert!(result.contains("int y"));
    assert!(!result.contains("int x"));
    assert!(result.len() < "int x;\nint y;\n".len());
}

#[test]
fn rejects_a_baseline_that_is_not_interesting() {
    let dir = tempdir().unwrap();
    let script = write_script(dir.path(), "check.sh", "#!/bin/sh\nexit 1\n");
    let input = dir.path().join("input.c");
    fs::write(&input, "int x;\n").unwrap();

    Command::cargo_bin("cvise")
        .unwrap()
        .arg(&script)
        .arg(&input)
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("does not pass"));

    // Original file is left untouched.
    assert_eq!(fs::read_to_string(&input).unwrap(), "int x;\n");
}

#[test]
fn tidy_removes_stale_sandbox_directories() {
    let dir = tempdir().unwrap();
    let stale = dir.path().join("cvise-leftover-1.tmp");
    fs::create_dir(&stale).unwrap();

    Command::cargo_bin("cvise")
        .unwrap()
        .arg("--tidy")
        .arg("--tmpdir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("removed 1"));

    assert!(!stale.exists());
}

#[test]
fn completions_prints_a_script_without_requiring_script_and_file() {
    Command::cargo_bin("cvise")
        .unwrap()
        .arg("--completions")
        .arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("cvise"));
}
