//! Basic CLI E2E tests.
//!
//! Tests invoke the built `setpace` binary with HOME pointed at a scratch
//! directory, so config reads and writes never touch the real one.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use setpace_core::{Exercise, Pace, Workout, WorkoutBlock};
use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_setpace"))
        .args(args)
        .env("HOME", home)
        .env_remove("SETPACE_ENV")
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn write_workout(dir: &Path, name: &str, workout: &Workout) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(workout).unwrap()).unwrap();
    path
}

fn one_second_workout() -> Workout {
    Workout::new(
        "Quick",
        vec![WorkoutBlock::new(1, Pace::time(1), vec![Exercise::timed("Hold", 1)])],
    )
}

#[test]
fn test_sample_prints_valid_workout() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["sample"]);
    assert_eq!(code, 0);
    let workout = Workout::from_json_str(&stdout).unwrap();
    assert_eq!(workout.blocks.len(), 2);
}

#[test]
fn test_plan_text_output() {
    let home = TempDir::new().unwrap();
    let path = write_workout(home.path(), "sample.json", &Workout::sample());
    let (stdout, _, code) = run_cli(home.path(), &["plan", path.to_str().unwrap(), "--prep", "5"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("PREP"));
    assert!(stdout.contains("next: Finish"));
    assert!(stdout.contains("run key:"));
}

#[test]
fn test_plan_json_output() {
    let home = TempDir::new().unwrap();
    let path = write_workout(home.path(), "sample.json", &Workout::sample());
    let (stdout, _, code) = run_cli(home.path(), &["plan", path.to_str().unwrap(), "--json"]);
    assert_eq!(code, 0);
    let plan: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(plan["total_blocks"], 2);
    assert_eq!(plan["steps"][0]["label"], "PREP");
}

#[test]
fn test_plan_without_prep() {
    let home = TempDir::new().unwrap();
    let path = write_workout(home.path(), "sample.json", &Workout::sample());
    let (stdout, _, code) = run_cli(home.path(), &["plan", path.to_str().unwrap(), "--prep", "0"]);
    assert_eq!(code, 0);
    assert!(!stdout.contains("PREP"));
}

#[test]
fn test_plan_missing_file_fails() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["plan", "does-not-exist.json"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_progress_of_first_work_step() {
    let home = TempDir::new().unwrap();
    let path = write_workout(home.path(), "sample.json", &Workout::sample());
    let (stdout, _, code) = run_cli(home.path(), &["progress", path.to_str().unwrap(), "1"]);
    assert_eq!(code, 0);
    let range: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(range["start_progress"], 0.0);
    assert_eq!(range["step_duration_ms"], 20_000);
}

#[test]
fn test_progress_out_of_range_fails() {
    let home = TempDir::new().unwrap();
    let path = write_workout(home.path(), "sample.json", &Workout::sample());
    let (_, stderr, code) = run_cli(home.path(), &["progress", path.to_str().unwrap(), "99"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("out of range"));
}

#[test]
fn test_simulate_confirms_rep_steps() {
    let home = TempDir::new().unwrap();
    let path = write_workout(home.path(), "sample.json", &Workout::sample());
    let (stdout, _, code) = run_cli(
        home.path(),
        &["simulate", path.to_str().unwrap(), "--tick-ms", "1000"],
    );
    assert_eq!(code, 0);
    assert!(stdout.contains("finish"));
    assert!(stdout.contains("1 manual confirmations"));
}

#[test]
fn test_simulate_json_lines() {
    let home = TempDir::new().unwrap();
    let path = write_workout(home.path(), "quick.json", &one_second_workout());
    let (stdout, _, code) = run_cli(home.path(), &["simulate", path.to_str().unwrap(), "--prep", "0", "--json"]);
    assert_eq!(code, 0);
    let types: Vec<String> = stdout
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["event"]["type"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(types, vec!["STARTED", "FINISHED"]);
}

#[test]
fn test_run_streams_events_until_finished() {
    let home = TempDir::new().unwrap();
    let path = write_workout(home.path(), "quick.json", &one_second_workout());
    let (stdout, _, code) = run_cli(home.path(), &["run", path.to_str().unwrap(), "--prep", "0"]);
    assert_eq!(code, 0);
    let first = stdout.lines().next().unwrap();
    assert!(first.contains("\"STARTED\""));
    assert!(stdout.lines().last().unwrap().contains("\"FINISHED\""));
}

#[test]
fn test_config_get_default() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "plan.prep_sec"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "5");
}

#[test]
fn test_config_set_persists() {
    let home = TempDir::new().unwrap();
    let (_, _, code) = run_cli(home.path(), &["config", "set", "plan.prep_sec", "12"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "plan.prep_sec"]);
    assert_eq!(stdout.trim(), "12");

    let (_, _, code) = run_cli(home.path(), &["config", "reset"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "plan.prep_sec"]);
    assert_eq!(stdout.trim(), "5");
}

#[test]
fn test_config_set_tick_interval() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "set", "timer.tick_interval_ms", "500"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "timer.tick_interval_ms"]);
    assert_eq!(stdout.trim(), "500");
}

#[test]
fn test_config_help_names_real_keys() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "set", "--help"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("timer.tick_interval_ms"));
}

#[test]
fn test_config_unknown_key_fails() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "plan.nope", "1"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("setpace"));
}
