//! Integration tests for the adseq CLI

use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

use crate::helpers::fixture_path;

/// Run adseq with its config file pointed into `config_dir`.
fn run_adseq(config_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_adseq"))
        .args(args)
        .env("ADSEQ_CONFIG", config_dir.join("config.toml"))
        .env_remove("ADSEQ_LOG")
        .output()
        .expect("Failed to execute adseq");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

fn adseq(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("adseq").unwrap();
    cmd.env("ADSEQ_CONFIG", config_dir.join("config.toml"))
        .env_remove("ADSEQ_LOG");
    cmd
}

fn scenario(name: &str) -> String {
    fixture_path("scenarios")
        .join(name)
        .to_string_lossy()
        .to_string()
}

// ============================================================================
// Help Output Tests
// ============================================================================

#[test]
fn help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    let (stdout, _stderr, exit_code) = run_adseq(dir.path(), &["--help"]);

    assert_eq!(exit_code, 0);
    assert!(stdout.contains("Decides what plays next on a linear stream"));
    assert!(stdout.contains("simulate"));
    assert!(stdout.contains("config"));
    assert!(stdout.contains("completions"));
}

#[test]
fn short_help_shows_summary() {
    let dir = TempDir::new().unwrap();
    let (stdout, _stderr, exit_code) = run_adseq(dir.path(), &["-h"]);

    assert_eq!(exit_code, 0);
    assert!(stdout.contains("Ad-aware playback sequencer for linear streams"));
}

#[test]
fn simulate_without_file_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let (_stdout, stderr, exit_code) = run_adseq(dir.path(), &["simulate"]);

    assert_eq!(exit_code, 2);
    assert!(stderr.contains("<FILE>"));
}

// ============================================================================
// Simulate
// ============================================================================

#[test]
fn simulate_prints_transcript() {
    let dir = TempDir::new().unwrap();
    adseq(dir.path())
        .args(["simulate", &scenario("preroll.toml")])
        .assert()
        .success()
        .stdout(predicate::str::contains("[   0] play pre.mp4 @0.000 x1"))
        .stdout(predicate::str::contains(
            "Finished after 6 ticks (4 seekbar updates)",
        ));
}

#[test]
fn simulate_json_is_parseable() {
    let dir = TempDir::new().unwrap();
    let (stdout, _stderr, exit_code) =
        run_adseq(dir.path(), &["simulate", "--json", &scenario("vast_pod.toml")]);

    assert_eq!(exit_code, 0);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["final_state"], "finished");
    assert!(json["records"].as_array().unwrap().len() > 4);
}

#[test]
fn simulate_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    adseq(dir.path())
        .args(["simulate", &scenario("missing.toml")])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read scenario"));
}

#[test]
fn simulate_invalid_scenario_fails() {
    let dir = TempDir::new().unwrap();
    adseq(dir.path())
        .args(["simulate", &scenario("invalid.toml")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid scenario"));
}

#[test]
fn simulate_rejects_broken_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), "[sequencer]\ntime_tolerance = -1.0\n").unwrap();

    adseq(dir.path())
        .args(["simulate", &scenario("preroll.toml")])
        .assert()
        .failure();
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn config_path_honours_env_override() {
    let dir = TempDir::new().unwrap();
    let (stdout, _stderr, exit_code) = run_adseq(dir.path(), &["config", "path"]);

    assert_eq!(exit_code, 0);
    assert_eq!(
        stdout.trim(),
        dir.path().join("config.toml").display().to_string()
    );
}

#[test]
fn config_init_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().unwrap();

    adseq(dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));
    assert!(dir.path().join("config.toml").exists());

    adseq(dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    adseq(dir.path())
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn config_show_prints_defaults() {
    let dir = TempDir::new().unwrap();
    adseq(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[sequencer]"))
        .stdout(predicate::str::contains("timeout_secs = 10"));
}

// ============================================================================
// Completions
// ============================================================================

#[test]
fn completions_for_bash() {
    let dir = TempDir::new().unwrap();
    adseq(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_adseq"));
}
