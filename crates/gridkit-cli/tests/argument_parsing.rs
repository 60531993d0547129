//! Focused CLI argument parsing tests.
//!
//! Tests that verify command-line argument parsing works correctly without
//! any record files.

#![allow(deprecated)] // Command::cargo_bin is deprecated but replacement requires newer assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn gridkit(project: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gridkit").unwrap();
    cmd.arg("--project").arg(project.path()).arg("--no-color");
    cmd
}

// ============================================================================
// Informational Commands
// ============================================================================

#[test]
fn version_command_succeeds() {
    let project = TempDir::new().unwrap();
    gridkit(&project)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gridkit"));
}

#[test]
fn version_flag_shows_version() {
    Command::cargo_bin("gridkit")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gridkit"));
}

#[test]
fn help_flag_shows_usage() {
    Command::cargo_bin("gridkit")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("data-grid"));
}

// ============================================================================
// Argument Parsing Errors
// ============================================================================

#[test]
fn no_command_shows_help() {
    Command::cargo_bin("gridkit")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn unknown_command_fails() {
    Command::cargo_bin("gridkit")
        .unwrap()
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn run_requires_schema_type_and_records() {
    let project = TempDir::new().unwrap();
    gridkit(&project)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--schema"))
        .stderr(predicate::str::contains("--type"))
        .stderr(predicate::str::contains("--records"));
}

#[test]
fn run_help_lists_options() {
    Command::cargo_bin("gridkit")
        .unwrap()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--request"))
        .stdout(predicate::str::contains("--compact"));
}

#[test]
fn config_show_rejects_unknown_format() {
    let project = TempDir::new().unwrap();
    gridkit(&project)
        .args(["config", "show", "--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format"));
}
