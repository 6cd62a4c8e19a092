//! CLI argument parsing and end-to-end runs.

#![allow(deprecated)] // Command::cargo_bin is deprecated but replacement requires newer assert_cmd

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn blocksim() -> Command {
    let mut cmd = Command::cargo_bin("blocksim").unwrap();
    cmd.arg("--no-color").env("RUST_LOG", "warn");
    cmd
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn version_flag_shows_version() {
    blocksim()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("blocksim"));
}

#[test]
fn help_lists_commands() {
    blocksim()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run").and(predicate::str::contains("config")));
}

#[test]
fn run_rejects_non_numeric_seed() {
    blocksim()
        .args(["run", "--seed", "abc"])
        .assert()
        .failure();
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn config_prints_project_overrides() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("blocksim.toml"),
        "[simulation]\nnum_blocks = 77\n",
    )
    .unwrap();

    blocksim()
        .args(["config", "--project-dir", temp.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("num_blocks = 77"));
}

#[test]
fn run_completes_and_exports_params() {
    let temp = TempDir::new().unwrap();
    let params = temp.path().join("params.json");
    let stats = temp.path().join("stats.json");

    blocksim()
        .args([
            "run",
            "--seed",
            "3",
            "--blocks",
            "5",
            "--max-block-size",
            "10",
            "--project-dir",
            temp.path().to_str().unwrap(),
            "--params",
            params.to_str().unwrap(),
            "--stats",
            stats.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("seed 3")
                .and(predicate::str::contains("Simulation complete"))
                .and(predicate::str::contains("Simulated 5 blocks")),
        );

    let snapshot = fs::read_to_string(&params).unwrap();
    assert!(snapshot.contains("num_keys"));
    assert!(stats.exists());
}

#[test]
fn run_rejects_zero_blocks() {
    let temp = TempDir::new().unwrap();

    blocksim()
        .args([
            "run",
            "--blocks",
            "0",
            "--project-dir",
            temp.path().to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("num_blocks"));
}
