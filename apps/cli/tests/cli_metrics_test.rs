//! Integration tests for the `mydiet metrics` commands.

use assert_cmd::Command;
use mydiet_core::Database;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn mydiet(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mydiet-cli").unwrap();
    cmd.current_dir(temp_dir.path()).env_remove("MYDIET_STORAGE__DATABASE_PATH");
    cmd
}

fn write_record(temp_dir: &TempDir, name: &str, body: &str) -> String {
    let path = temp_dir.path().join(name);
    fs::write(&path, body).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_help_lists_commands() {
    let temp_dir = TempDir::new().unwrap();
    mydiet(&temp_dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("metrics"))
        .stdout(predicate::str::contains("retrain"))
        .stdout(predicate::str::contains("upload"));
}

#[test]
fn test_latest_on_empty_store_fails() {
    let temp_dir = TempDir::new().unwrap();
    Database::open(&temp_dir.path().join("mydiet.db")).unwrap();

    mydiet(&temp_dir)
        .args(["metrics", "latest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No metrics found"));
}

#[test]
fn test_read_commands_do_not_create_a_database() {
    let temp_dir = TempDir::new().unwrap();

    for args in [["metrics", "latest"], ["metrics", "history"]] {
        mydiet(&temp_dir)
            .args(args)
            .args(["--db", "typo.db"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("does not exist"));
    }
    assert!(!temp_dir.path().join("typo.db").exists());
}

#[test]
fn test_record_then_latest() {
    let temp_dir = TempDir::new().unwrap();
    let older = write_record(
        &temp_dir,
        "older.json",
        r#"{"metrics": {"accuracy": 0.71}, "trained_at": "2024-01-01T00:00:00Z"}"#,
    );
    let newer = write_record(
        &temp_dir,
        "newer.json",
        r#"{"metrics": {"accuracy": 0.93, "report": {"f1": 0.9}},
            "model_versions": {"classifier": "rf-v2"},
            "trained_at": "2024-03-01T00:00:00Z"}"#,
    );

    // Record the newer run first; the answer must follow trained_at
    mydiet(&temp_dir)
        .args(["metrics", "record", &newer])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded training run"));
    mydiet(&temp_dir).args(["metrics", "record", &older]).assert().success();

    let output = mydiet(&temp_dir).args(["metrics", "latest", "--json"]).output().unwrap();
    assert!(output.status.success());
    let metrics: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(metrics, serde_json::json!({ "accuracy": 0.93, "report": { "f1": 0.9 } }));

    mydiet(&temp_dir)
        .args(["metrics", "latest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Latest training run"))
        .stdout(predicate::str::contains("rf-v2"));
}

#[test]
fn test_record_rejects_invalid_metric_values() {
    let temp_dir = TempDir::new().unwrap();
    let bad = write_record(&temp_dir, "bad.json", r#"{"metrics": {"accuracy": [1, 2]}}"#);

    mydiet(&temp_dir)
        .args(["metrics", "record", &bad])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid metrics file"));
}

#[test]
fn test_history_respects_limit_and_db_flag() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("custom.db");
    let db = db.to_str().unwrap();
    for day in 1..=3 {
        let file = write_record(
            &temp_dir,
            &format!("run{day}.json"),
            &format!(r#"{{"metrics": {{"day": {day}}}, "trained_at": "2024-02-0{day}"}}"#),
        );
        mydiet(&temp_dir).args(["metrics", "record", &file, "--db", db]).assert().success();
    }

    let output = mydiet(&temp_dir).args(["metrics", "history", "--db", db, "-n", "2"]).output().unwrap();
    assert!(output.status.success());
    let records: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["metrics"]["day"], 3.0);

    mydiet(&temp_dir).args(["metrics", "history", "--db", db, "-n", "0"]).assert().failure();
}
