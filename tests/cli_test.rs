//! Binary smoke tests that need no network or keyring

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

use common::temp_config_file;

fn moti() -> Command {
    Command::cargo_bin("moti").expect("moti binary")
}

#[test]
fn test_help_describes_coach() {
    moti()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("coach"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("tools"));
}

#[test]
fn test_tools_list_prints_toolkits() {
    let (_dir, config) = temp_config_file("coach:\n  max_task_minutes: 20.0\n");

    moti()
        .args(["--config", config.to_str().unwrap(), "tools", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gmail"))
        .stdout(predicate::str::contains("googlesheets"));
}

#[test]
fn test_tools_list_with_missing_config_uses_defaults() {
    moti()
        .args(["--config", "/nonexistent/moti.yaml", "tools", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("github"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_dir, config) = temp_config_file("coach:\n  scope_reduction_factor: 1.5\n");

    moti()
        .args(["--config", config.to_str().unwrap(), "tools", "list"])
        .assert()
        .failure();
}

#[test]
fn test_ask_requires_text() {
    moti().arg("ask").assert().failure();
}

#[test]
fn test_unknown_service_is_rejected() {
    moti()
        .args(["logout", "--service", "email"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_ask_without_key_prints_fallback() {
    let (_dir, config) = temp_config_file("credentials:\n  backend: memory\n");

    moti()
        .args(["--config", config.to_str().unwrap(), "ask", "start", "my", "essay"])
        .assert()
        .success()
        .stdout(predicate::str::contains("i need an api key"));
}
