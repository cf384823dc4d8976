//! Basic CLI E2E tests.
//!
//! Tests run the built binary against an isolated data directory and verify
//! the JSON it prints.

use std::process::Command;
use std::time::{Duration, Instant};

use chrono::DateTime;
use pomocycle_core::{
    Clock, Database, Phase, Session, SessionStore, SqliteSessionStore, SqliteWakeQueue,
    SystemClock, WakeScheduler, WakeTag,
};
use serde_json::Value;
use tempfile::TempDir;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(data_dir: &TempDir, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_pomocycle"))
        .args(args)
        .env("POMOCYCLE_DATA_DIR", data_dir.path())
        .env_remove("POMOCYCLE_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn run_json(data_dir: &TempDir, args: &[&str]) -> Value {
    let (code, stdout, stderr) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("{args:?} printed invalid JSON ({e}): {stdout}"))
}

/// Store a focus phase as a previous process would have left it.
fn seed_running_focus(data_dir: &TempDir, start_ms: u64, finish_ms: u64) {
    let db = Database::open_at(&data_dir.path().join("pomocycle.db")).unwrap();
    SqliteSessionStore::new(db.clone())
        .save(&Session {
            phase: Phase::FocusRunning,
            start_time: Some(start_ms),
            finish_time: Some(finish_ms),
            ..Session::default()
        })
        .unwrap();
    SqliteWakeQueue::new(db).schedule(finish_ms, WakeTag::FocusTimeout);
}

fn event_types(report: &Value) -> Vec<String> {
    report["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["type"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_status_fresh_is_idle() {
    let dir = TempDir::new().unwrap();
    let report = run_json(&dir, &["timer", "status"]);
    assert_eq!(report["status"]["phase"], "idle");
    assert_eq!(report["status"]["cycle_count"], 0);
    assert_eq!(report["status"]["remaining_ms"], 0);
    assert!(event_types(&report).is_empty());
}

#[test]
fn test_start_persists_across_invocations() {
    let dir = TempDir::new().unwrap();
    let started = run_json(&dir, &["timer", "start"]);
    assert_eq!(event_types(&started), vec!["focus_started"]);
    assert_eq!(started["status"]["phase"], "focus_running");
    assert_eq!(started["status"]["total_ms"], 25 * 60 * 1000);

    let status = run_json(&dir, &["timer", "status"]);
    assert_eq!(status["status"]["phase"], "focus_running");
    assert!(status["status"]["remaining_ms"].as_u64().unwrap() > 0);
}

#[test]
fn test_start_while_running_fails() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["timer", "start"]);
    let (code, _, stderr) = run_cli(&dir, &["timer", "start"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error: cannot begin while focus_running"), "{stderr}");
}

#[test]
fn test_full_cycle_records_history() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["timer", "start"]);

    let finished = run_json(&dir, &["timer", "fire", "focus"]);
    assert_eq!(event_types(&finished), vec!["focus_finished"]);
    assert_eq!(finished["events"][0]["cycle_count"], 1);
    assert_eq!(finished["events"][0]["break_kind"], "normal");
    assert_eq!(finished["status"]["phase"], "focus_finished");

    let rest = run_json(&dir, &["timer", "start"]);
    assert_eq!(event_types(&rest), vec!["rest_started"]);
    assert_eq!(rest["status"]["total_ms"], 5 * 60 * 1000);

    let rest_done = run_json(&dir, &["timer", "fire", "rest"]);
    assert_eq!(event_types(&rest_done), vec!["rest_finished"]);
    assert_eq!(rest_done["status"]["phase"], "rest_finished");

    let stats = run_json(&dir, &["stats", "--all"]);
    assert_eq!(stats["focus_completed"], 1);
    assert_eq!(stats["rest_completed"], 1);
    assert_eq!(stats["long_breaks"], 0);
}

#[test]
fn test_stale_fire_is_ignored() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["timer", "start"]);
    let report = run_json(&dir, &["timer", "fire", "rest"]);
    assert!(event_types(&report).is_empty());
    assert_eq!(report["status"]["phase"], "focus_running");
}

#[test]
fn test_cancel_returns_to_idle() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["timer", "start"]);

    let cancelled = run_json(&dir, &["timer", "cancel"]);
    assert_eq!(event_types(&cancelled), vec!["focus_cancelled"]);
    assert_eq!(cancelled["status"]["phase"], "idle");

    let again = run_json(&dir, &["timer", "cancel"]);
    assert!(event_types(&again).is_empty());
}

#[test]
fn test_wake_before_due_does_nothing() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["timer", "start"]);
    let report = run_json(&dir, &["timer", "wake"]);
    assert!(event_types(&report).is_empty());
    assert_eq!(report["status"]["phase"], "focus_running");
}

#[test]
fn test_long_break_after_interval() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&dir, &["config", "set", "schedule.pomodoros_before_long_break", "2"]);
    assert_eq!(code, 0, "{stderr}");

    run_json(&dir, &["timer", "start"]);
    run_json(&dir, &["timer", "fire", "focus"]);
    run_json(&dir, &["timer", "cancel"]);
    run_json(&dir, &["timer", "start"]);
    let second = run_json(&dir, &["timer", "fire", "focus"]);
    assert_eq!(second["events"][0]["cycle_count"], 2);
    assert_eq!(second["events"][0]["break_kind"], "long");

    let rest = run_json(&dir, &["timer", "start"]);
    assert_eq!(rest["status"]["total_ms"], 15 * 60 * 1000);
}

#[test]
fn test_config_get_set() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&dir, &["config", "get", "schedule.focus_duration"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "25");

    let (code, stdout, _) = run_cli(&dir, &["config", "set", "schedule.focus_duration", "50"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (_, stdout, _) = run_cli(&dir, &["config", "get", "schedule.focus_duration"]);
    assert_eq!(stdout.trim(), "50");

    let started = run_json(&dir, &["timer", "start"]);
    assert_eq!(started["status"]["total_ms"], 50 * 60 * 1000);
}

#[test]
fn test_config_rejects_bad_input() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&dir, &["config", "set", "schedule.focus_duration", "-1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Invalid configuration value"), "{stderr}");
    let (code, _, _) = run_cli(&dir, &["config", "get", "schedule.nope"]);
    assert_eq!(code, 1);
}

#[test]
fn test_config_list() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&dir, &["config", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("schedule.short_break = 5"), "{stdout}");
}

#[test]
fn test_stats_today_empty() {
    let dir = TempDir::new().unwrap();
    let stats = run_json(&dir, &["stats"]);
    assert_eq!(stats["focus_completed"], 0);
    assert_eq!(stats["rest_completed"], 0);
}

#[test]
fn test_restore_completes_phase_that_expired_offline() {
    let dir = TempDir::new().unwrap();
    let now = SystemClock.now_ms();
    let finish = now - 5 * 60_000;
    seed_running_focus(&dir, finish - 25 * 60_000, finish);

    let report = run_json(&dir, &["timer", "status"]);
    assert_eq!(event_types(&report), vec!["focus_finished"]);
    assert_eq!(report["status"]["phase"], "focus_finished");
    assert_eq!(report["status"]["cycle_count"], 1);

    let stats = run_json(&dir, &["stats", "--all"]);
    assert_eq!(stats["focus_completed"], 1);
    assert_eq!(stats["focus_min"], 25);

    let recent = run_json(&dir, &["stats", "--recent", "5"]);
    let phases = recent.as_array().unwrap();
    assert_eq!(phases.len(), 1);
    assert_eq!(phases[0]["kind"], "focus");
    let completed_at = DateTime::parse_from_rfc3339(phases[0]["completed_at"].as_str().unwrap()).unwrap();
    assert_eq!(completed_at.timestamp_millis() as u64, finish);

    // The completed phase's wake was dropped with it.
    let later = run_json(&dir, &["timer", "wake"]);
    assert!(event_types(&later).is_empty());
    assert_eq!(later["status"]["cycle_count"], 1);
}

#[test]
fn test_watch_delivers_timeout_when_due() {
    let dir = TempDir::new().unwrap();
    let now = SystemClock.now_ms();
    seed_running_focus(&dir, now - 60_000, now + 1_500);

    let started = Instant::now();
    let report = run_json(&dir, &["timer", "watch"]);
    assert!(started.elapsed() >= Duration::from_millis(1_000));
    assert_eq!(event_types(&report), vec!["focus_finished"]);
    assert_eq!(report["status"]["phase"], "focus_finished");

    let stats = run_json(&dir, &["stats", "--all"]);
    assert_eq!(stats["focus_completed"], 1);
}

#[test]
fn test_watch_returns_immediately_when_idle() {
    let dir = TempDir::new().unwrap();
    let report = run_json(&dir, &["timer", "watch"]);
    assert!(event_types(&report).is_empty());
    assert_eq!(report["status"]["phase"], "idle");
}
