//! Integration tests for the `petlibro` CLI binary.
//!
//! These cover argument parsing, help output, config handling and the
//! error exit codes, all without a reachable cloud.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `petlibro` binary with env isolation.
///
/// Clears all `PETLIBRO_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn petlibro_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("petlibro");
    cmd.env("HOME", "/tmp/petlibro-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/petlibro-cli-test-nonexistent")
        .env_remove("PETLIBRO_PROFILE")
        .env_remove("PETLIBRO_BASE_URL")
        .env_remove("PETLIBRO_OUTPUT")
        .env_remove("PETLIBRO_TIMEOUT")
        .env_remove("PETLIBRO_EMAIL")
        .env_remove("PETLIBRO_PASSWORD");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = petlibro_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    petlibro_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("PETLIBRO")
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("feed"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    petlibro_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("petlibro"));
}

#[test]
fn test_subcommand_help() {
    petlibro_cmd()
        .args(["command", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("set_light"));
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_unknown_action_is_usage_error() {
    petlibro_cmd()
        .args(["command", "AF1", "launch_rocket"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("launch_rocket"));
}

#[test]
fn test_non_numeric_portions_is_usage_error() {
    petlibro_cmd().args(["feed", "AF1", "lots"]).assert().code(2);
}

#[test]
fn test_invalid_output_format() {
    petlibro_cmd()
        .args(["-o", "yaml", "devices"])
        .assert()
        .code(2);
}

// ── Config commands ─────────────────────────────────────────────────

#[test]
fn test_config_path_prints_toml_location() {
    petlibro_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_without_file() {
    petlibro_cmd()
        .args(["-o", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

// ── Error exit codes ────────────────────────────────────────────────

#[test]
fn test_missing_credentials_exit_code() {
    let output = petlibro_cmd()
        .arg("devices")
        .write_stdin("")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3), "Expected auth exit code");
    let text = combined_output(&output);
    assert!(
        text.contains("No credentials"),
        "Expected credentials hint in output:\n{text}"
    );
}

#[test]
fn test_missing_password_without_terminal() {
    petlibro_cmd()
        .args(["--email", "cat@example.com", "state"])
        .write_stdin("")
        .assert()
        .code(3);
}

#[test]
fn test_unknown_profile_exit_code() {
    petlibro_cmd()
        .args(["--profile", "nowhere", "devices"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn test_unreachable_cloud_exit_code() {
    // Nothing listens on the discard port.
    petlibro_cmd()
        .args([
            "--email",
            "cat@example.com",
            "--base-url",
            "http://127.0.0.1:9/",
            "--timeout",
            "2",
            "devices",
        ])
        .env("PETLIBRO_PASSWORD", "hunter2")
        .assert()
        .code(7);
}
