//! CLI smoke tests for the sinktrace binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const VULNERABLE: &str = r"function h(req) {
  const id = req.params.id;
  mysql.query(`SELECT * FROM users WHERE id = ${id}`);
}
";

fn bin() -> Command {
    Command::cargo_bin("sinktrace-bin").unwrap()
}

#[test]
fn test_critical_finding_sets_exit_code() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("app.js");
    fs::write(&file, VULNERABLE).unwrap();

    bin()
        .arg(&file)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("sql-injection"));
}

#[test]
fn test_clean_file_exits_zero() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("lib.js");
    fs::write(&file, "function add(a, b) { return a + b; }\n").unwrap();

    bin().arg(&file).assert().code(0);
}

#[test]
fn test_json_output() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("app.js");
    fs::write(&file, VULNERABLE).unwrap();

    bin()
        .arg(&file)
        .arg("--json")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"issues\""));
}

#[test]
fn test_project_scan() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("app.js"), VULNERABLE).unwrap();

    bin()
        .arg(dir.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("sinktrace:"));
}
