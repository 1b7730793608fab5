// Integration tests for the tpilot binary: inspect/suggest/sample/history
// and the --json stdout contract.
//
// Run with: cargo test -p tablepilot-cli --test cli_tests -- --nocapture

use std::process::Command;

fn tpilot() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tpilot"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd
}

fn write_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

/// Assert stdout is a single, parseable JSON value.
fn assert_single_json(stdout: &str) -> serde_json::Value {
    let trimmed = stdout.trim();
    assert!(!trimmed.is_empty(), "stdout should not be empty");
    serde_json::from_str(trimmed).unwrap_or_else(|e| {
        panic!(
            "stdout must be valid JSON.\nParse error: {}\nstdout:\n{}",
            e, trimmed
        )
    })
}

// ---------------------------------------------------------------------------
// inspect
// ---------------------------------------------------------------------------

#[test]
fn inspect_json_reports_shape_and_columns() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&dir, "t.csv", "a,b\n1,x\n2,y\n3,\n");

    let output = tpilot()
        .args(["inspect", &csv, "--json"])
        .output()
        .expect("tpilot inspect --json");

    assert!(
        output.status.success(),
        "exit: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );

    let val = assert_single_json(&String::from_utf8_lossy(&output.stdout));
    assert_eq!(val["rows"], 3);
    assert_eq!(val["cols"], 2);
    assert_eq!(val["columns"][0]["name"], "a");
    assert_eq!(val["columns"][1]["null_count"], 1);
}

#[test]
fn inspect_text_mentions_shape() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&dir, "t.csv", "a,b\n1,x\n");

    let output = tpilot().args(["inspect", &csv]).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 rows x 2 columns"), "stdout: {}", stdout);
}

#[test]
fn inspect_missing_file_exits_3() {
    let output = tpilot()
        .args(["inspect", "/nonexistent/data.csv"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("file not found"));
}

// ---------------------------------------------------------------------------
// suggest
// ---------------------------------------------------------------------------

#[test]
fn suggest_lists_fixed_and_topical_steps() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&dir, "t.csv", "price,name\n1,a\n2,b\n");

    let output = tpilot()
        .args(["suggest", &csv, "any correlation between price and name?"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1. Data Overview"));
    assert!(stdout.contains("Correlation Analysis"));
}

// ---------------------------------------------------------------------------
// sample
// ---------------------------------------------------------------------------

#[test]
fn sample_writes_importable_csv() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("demo.csv");

    let output = tpilot()
        .args(["sample", out.to_str().unwrap(), "--rows", "25"])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(out.exists());

    // Header + 25 data rows
    let content = std::fs::read_to_string(&out).unwrap();
    assert_eq!(content.lines().count(), 26);
    assert!(content.starts_with("date,product_category"));
}

#[test]
fn sample_zero_rows_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("demo.csv");

    let output = tpilot()
        .args(["sample", out.to_str().unwrap(), "--rows", "0"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

#[test]
fn history_unknown_thread_is_empty_not_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("sessions.db");

    let output = tpilot()
        .args(["history", "nope", "--db", db.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No history"));
}

#[test]
fn history_json_is_empty_array_for_unknown_thread() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("sessions.db");

    let output = tpilot()
        .args(["history", "nope", "--db", db.to_str().unwrap(), "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let val = assert_single_json(&String::from_utf8_lossy(&output.stdout));
    assert_eq!(val, serde_json::json!([]));
}

// ---------------------------------------------------------------------------
// ask (configuration errors only — no live planner in tests)
// ---------------------------------------------------------------------------

#[test]
fn ask_without_key_exits_11_with_hint() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&dir, "t.csv", "a\n1\n");
    let db = dir.path().join("sessions.db");

    let output = tpilot()
        .env_remove("TABLEPILOT_MISTRAL_KEY")
        .env_remove("MISTRAL_API_KEY")
        .args(["ask", "hello", "--data", &csv, "--db", db.to_str().unwrap()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(11));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("API key"), "stderr: {}", stderr);
    assert!(stderr.contains("hint:"), "stderr: {}", stderr);
}

#[test]
fn ask_missing_dataset_exits_3_before_touching_planner() {
    let output = tpilot()
        .args(["ask", "hello", "--data", "/nonexistent/x.csv"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
}
