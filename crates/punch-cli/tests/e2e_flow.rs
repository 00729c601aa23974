//! End-to-end integration tests for the employee tracking flow.
//!
//! Drives the built binary through the full pipeline:
//! import → start → active → stop → complete → earnings.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use chrono::Datelike;
use tempfile::TempDir;

fn punch_binary() -> String {
    env!("CARGO_BIN_EXE_punch").to_string()
}

fn punch(temp: &std::path::Path, args: &[&str]) -> Output {
    Command::new(punch_binary())
        .env("PUNCH_DATABASE_PATH", temp.join("punch.db"))
        .env("HOME", temp)
        .args(args)
        .output()
        .expect("failed to run punch")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{what} should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// A weekday index (0=Sunday) that is never today or tomorrow, so a
/// schedule pinned to it is deterministically locked.
fn far_weekday() -> u32 {
    (chrono::Local::now().weekday().num_days_from_sunday() + 3) % 7
}

fn seed_document() -> String {
    format!(
        r#"{{
        "tasks": [{{"id": "t1", "company_id": "acme", "name": "Website"}}],
        "sub_tasks": [
            {{"id": "st-api", "task_id": "t1", "name": "API work",
              "billing_mode": "hourly", "hourly_rate": 40.0, "estimated_hours": 2.0}},
            {{"id": "st-shift", "task_id": "t1", "name": "Support shift",
              "billing_mode": "scheduled", "hourly_rate": 25.0,
              "start_time": "09:00", "end_time": "17:00",
              "schedule_days": [{}]}}
        ],
        "employees": [
            {{"id": "u1", "company_id": "acme", "name": "Dana",
              "pay_kind": "hourly", "hourly_rate": 40.0}},
            {{"id": "u2", "company_id": "acme", "name": "Kim",
              "pay_kind": "monthly", "monthly_salary": 3000.0, "currency": "EUR"}}
        ]
    }}"#,
        far_weekday()
    )
}

fn import_seed(temp: &std::path::Path) {
    let mut child = Command::new(punch_binary())
        .env("PUNCH_DATABASE_PATH", temp.join("punch.db"))
        .env("HOME", temp)
        .arg("import")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn punch import");
    child
        .stdin
        .as_mut()
        .expect("stdin")
        .write_all(seed_document().as_bytes())
        .expect("failed to write import document");
    let output = child.wait_with_output().expect("import did not finish");
    assert_success(&output, "punch import");
}

#[test]
fn test_import_then_status_reports_counts() {
    let temp = TempDir::new().unwrap();
    import_seed(temp.path());

    let output = punch(temp.path(), &["status", "--json"]);
    assert_success(&output, "punch status");
    let status: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(status["tasks"], 1);
    assert_eq!(status["sub_tasks"], 2);
    assert_eq!(status["employees"], 2);
    assert_eq!(status["open_sessions"], 0);
}

#[test]
fn test_full_tracking_flow() {
    let temp = TempDir::new().unwrap();
    import_seed(temp.path());

    // Start opens a session.
    let output = punch(temp.path(), &["start", "st-api", "--user", "u1", "--json"]);
    assert_success(&output, "punch start");
    let started: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(started["time_log"]["sub_task_id"], "st-api");
    assert!(started["stopped_sub_task"].is_null());
    assert_eq!(started["sub_task"]["status"], "in_progress");

    // Active shows it with live elapsed seconds.
    let output = punch(temp.path(), &["active", "--user", "u1", "--json"]);
    assert_success(&output, "punch active");
    let active: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(active["sub_task"]["id"], "st-api");
    assert!(active["elapsed_seconds"].as_i64().unwrap() >= 0);

    // Stop closes it and reports the duration.
    let output = punch(temp.path(), &["stop", "st-api", "--user", "u1", "--json"]);
    assert_success(&output, "punch stop");
    let stopped: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(stopped["duration_seconds"].as_i64().unwrap() >= 0);

    let output = punch(temp.path(), &["active", "--user", "u1", "--json"]);
    assert_success(&output, "punch active after stop");
    assert_eq!(stdout(&output).trim(), "null");

    // Complete without an open session still succeeds, and is idempotent.
    let output = punch(
        temp.path(),
        &["complete", "st-api", "--user", "u1", "--comment", "done", "--json"],
    );
    assert_success(&output, "punch complete");
    let completed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(completed["sub_task"]["status"], "completed");
    assert!(completed["closed_duration_seconds"].is_null());

    let output = punch(temp.path(), &["complete", "st-api", "--user", "u1"]);
    assert_success(&output, "punch complete (again)");

    // A completed sub-task refuses further starts.
    let output = punch(temp.path(), &["start", "st-api", "--user", "u1"]);
    assert!(!output.status.success(), "start on completed should fail");
}

#[test]
fn test_start_auto_pauses_other_session() {
    let temp = TempDir::new().unwrap();
    import_seed(temp.path());

    assert_success(
        &punch(temp.path(), &["start", "st-api", "--user", "u1"]),
        "first start",
    );
    // st-shift is locked, so reuse st-api's sibling via a second import entry
    // is not needed: starting st-api again also exercises the auto-pause path.
    let output = punch(temp.path(), &["start", "st-api", "--user", "u1", "--json"]);
    assert_success(&output, "second start");
    let started: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(started["stopped_sub_task"]["sub_task_id"], "st-api");

    let output = punch(temp.path(), &["status", "--json"]);
    let status: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(status["open_sessions"], 1);
    assert_eq!(status["closed_entries"], 1);
}

#[test]
fn test_locked_schedule_prints_countdown_without_failing() {
    let temp = TempDir::new().unwrap();
    import_seed(temp.path());

    let output = punch(temp.path(), &["start", "st-shift", "--user", "u1", "--json"]);
    assert_success(&output, "punch start (locked)");
    let locked: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(locked["schedule_locked"], true);
    assert!(locked["countdown"].is_string());
    assert!(locked["eval"]["starts_in_seconds"].as_i64().unwrap() > 0);

    // Nothing was opened.
    let output = punch(temp.path(), &["active", "--user", "u1", "--json"]);
    assert_eq!(stdout(&output).trim(), "null");
}

#[test]
fn test_stop_without_session_is_a_no_op() {
    let temp = TempDir::new().unwrap();
    import_seed(temp.path());

    let output = punch(temp.path(), &["stop", "st-api", "--user", "u1"]);
    assert_success(&output, "punch stop with nothing open");
    assert!(stdout(&output).contains("No active session"));
}

#[test]
fn test_list_enriches_sub_tasks() {
    let temp = TempDir::new().unwrap();
    import_seed(temp.path());

    let output = punch(temp.path(), &["list", "t1", "--json"]);
    assert_success(&output, "punch list");
    let rows: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);

    let api = rows.iter().find(|r| r["id"] == "st-api").unwrap();
    assert_eq!(api["schedule_display"]["status"], "no_schedule");
    assert_eq!(api["budget_seconds"], 7_200);
    assert_eq!(api["remaining_budget_seconds"], 7_200);

    let shift = rows.iter().find(|r| r["id"] == "st-shift").unwrap();
    assert_eq!(shift["schedule_display"]["status"], "locked");
    assert!(shift["schedule_display"]["countdown"].is_string());
}

#[test]
fn test_earnings_snapshots() {
    let temp = TempDir::new().unwrap();
    import_seed(temp.path());

    let output = punch(temp.path(), &["earnings", "--user", "u1", "--json"]);
    assert_success(&output, "punch earnings");
    let snapshot: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(snapshot["user_id"], "u1");
    assert_eq!(snapshot["worked_seconds"], 0);
    assert_eq!(snapshot["currency"], "USD");

    let output = punch(temp.path(), &["company-earnings", "acme", "--json"]);
    assert_success(&output, "punch company-earnings");
    let snapshots: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let snapshots = snapshots.as_array().unwrap();
    assert_eq!(snapshots.len(), 2);
    // The monthly employee accrues salary regardless of tracked time.
    let kim = snapshots.iter().find(|s| s["user_id"] == "u2").unwrap();
    assert_eq!(kim["currency"], "EUR");
}

#[test]
fn test_unknown_user_fails() {
    let temp = TempDir::new().unwrap();
    import_seed(temp.path());

    let output = punch(temp.path(), &["start", "st-api", "--user", "ghost"]);
    assert!(!output.status.success());
}

#[test]
fn test_missing_identity_fails_with_hint() {
    let temp = TempDir::new().unwrap();
    import_seed(temp.path());

    let output = punch(temp.path(), &["start", "st-api"]);
    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("no user identity"),
        "stderr should explain how to pass an identity"
    );
}
