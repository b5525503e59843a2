//! E2E CLI workflow tests.
//!
//! Each test runs `mb` as a subprocess against an isolated temp store
//! directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the mb binary, rooted in `store`.
fn mb_cmd(store: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mb"));
    cmd.arg("--data-dir").arg(store);
    // Suppress tracing output that goes to stderr
    cmd.env("MB_LOG", "error");
    cmd
}

/// Create a work via CLI, return its id.
fn create_work(store: &Path, name: &str) -> String {
    let output = mb_cmd(store)
        .args(["create", "--name", name, "--json"])
        .output()
        .expect("create should not crash");
    assert!(
        output.status.success(),
        "create failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: Value =
        serde_json::from_slice(&output.stdout).expect("create --json should produce valid JSON");
    json["id"]
        .as_str()
        .expect("create output should have 'id' field")
        .to_string()
}

fn list_names(store: &Path) -> Vec<String> {
    let output = mb_cmd(store)
        .args(["list", "--json"])
        .output()
        .expect("list should not crash");
    assert!(output.status.success());
    let rows: Vec<Value> = serde_json::from_slice(&output.stdout).expect("list JSON");
    rows.iter()
        .map(|row| row["name"].as_str().expect("name").to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn init_creates_a_starter_work() {
    let store = TempDir::new().expect("temp dir");

    mb_cmd(store.path())
        .args(["init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Store ready"));

    let names = list_names(store.path());
    assert_eq!(names, ["New work 1"]);
}

#[test]
fn create_list_and_open_roundtrip() {
    let store = TempDir::new().expect("temp dir");
    let id = create_work(store.path(), "Quarter test");

    let names = list_names(store.path());
    assert!(names.contains(&"Quarter test".to_string()));

    // Open by id prefix.
    let prefix = &id[..8];
    mb_cmd(store.path())
        .args(["open", prefix])
        .assert()
        .success()
        .stdout(predicate::str::contains("Quarter test"));
}

#[test]
fn record_scores_through_the_buffer() {
    let store = TempDir::new().expect("temp dir");
    create_work(store.path(), "Scored");

    mb_cmd(store.path())
        .args(["task", "add", "--max-score", "2"])
        .assert()
        .success();
    mb_cmd(store.path())
        .args(["roster", "add", "A. Ivanov"])
        .assert()
        .success();
    mb_cmd(store.path())
        .args([
            "record", "--student", "A. Ivanov", "--task", "0", "--score", "2",
        ])
        .assert()
        .success();

    let output = mb_cmd(store.path())
        .args(["stats", "--json"])
        .output()
        .expect("stats should not crash");
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("stats JSON");
    assert_eq!(json["current"]["stats"]["totalStudents"], 1);
    assert_eq!(json["current"]["stats"]["completionPercent"], 100.0);
}

#[test]
fn record_rejects_out_of_range_task() {
    let store = TempDir::new().expect("temp dir");
    create_work(store.path(), "Empty");

    mb_cmd(store.path())
        .args(["record", "--student", "0", "--task", "0", "--score", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn duplicate_produces_copy_suffix() {
    let store = TempDir::new().expect("temp dir");
    create_work(store.path(), "Test");

    mb_cmd(store.path())
        .args(["dup", "Test"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test (copy)"));

    let names = list_names(store.path());
    assert!(names.contains(&"Test (copy)".to_string()));
}

#[test]
fn delete_requires_yes_in_batch_mode() {
    let store = TempDir::new().expect("temp dir");
    create_work(store.path(), "Doomed");

    mb_cmd(store.path())
        .args(["delete", "Doomed", "--yes"])
        .assert()
        .success();

    let names = list_names(store.path());
    assert!(!names.contains(&"Doomed".to_string()));
    // The store auto-created a replacement so one work is always open.
    assert!(!names.is_empty());
}

#[test]
fn export_wipe_import_restores_the_work() {
    let store = TempDir::new().expect("temp dir");
    create_work(store.path(), "Portable");
    mb_cmd(store.path())
        .args(["task", "add", "--max-score", "3"])
        .assert()
        .success();

    let export_path = store.path().join("backup.json");
    mb_cmd(store.path())
        .args(["export", "Portable", "--output"])
        .arg(&export_path)
        .assert()
        .success();

    // Import into a brand-new store.
    let fresh = TempDir::new().expect("temp dir");
    mb_cmd(fresh.path())
        .arg("import")
        .arg(&export_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1"));

    let names = list_names(fresh.path());
    assert!(names.contains(&"Portable".to_string()));
}

#[test]
fn unknown_reference_fails_with_error() {
    let store = TempDir::new().expect("temp dir");
    mb_cmd(store.path())
        .args(["open", "no-such-work"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no project matches"));
}
