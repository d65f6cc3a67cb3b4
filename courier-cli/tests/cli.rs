use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn courier() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("courier"))
}

#[test]
fn missing_file_argument_is_a_usage_error() {
    courier()
        .assert()
        .failure()
        .code(2)
        .stderr(contains("Usage"))
        .stderr(contains("<FILE>"));
}

#[test]
fn unknown_flags_are_rejected() {
    courier()
        .args(["--interval", "5", "main.styl"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn help_names_the_proxy_file() {
    courier()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Proxy file to watch"));
}

#[test]
fn nonexistent_proxy_file_exits_with_context() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.styl");

    courier()
        .arg(&missing)
        .assert()
        .failure()
        .stderr(contains("courier stopped watching"))
        .stderr(contains("absent.styl"));
}
