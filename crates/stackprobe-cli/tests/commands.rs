//! Binary-level checks of the `stackprobe` commands.

use std::fs;
use std::net::TcpListener;
use std::process::{Command, Output};

use tempfile::TempDir;

fn stackprobe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stackprobe"))
        .args(args)
        .env_remove("STACKPROBE_CONFIG")
        .env_remove("STACKPROBE_OUTPUT_DIR")
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run stackprobe")
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn write_config(dir: &TempDir, json: &str) -> String {
    let path = dir.path().join("monitor.json");
    fs::write(&path, json).unwrap();
    path.display().to_string()
}

#[test]
fn default_config_prints_loadable_json() {
    let output = stackprobe(&["default-config"]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["components"].as_array().unwrap().len(), 6);
    assert_eq!(json["startup_timeout_ms"], 45_000);
}

#[test]
fn check_config_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        r#"{"components": [{"name": "web", "kind": "frontend", "ready_port": 0}]}"#,
    );

    let output = stackprobe(&["check-config", "--config", &config]);
    assert_eq!(output.status.code(), Some(78));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Port must be between 1 and 65535"), "{stderr}");
}

#[test]
fn check_config_lists_components() {
    let output = stackprobe(&["check-config"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration is valid (6 components)"));
    assert!(stdout.contains("templates"));
}

#[test]
fn run_writes_reports_and_exits_zero_on_warning() {
    let dir = TempDir::new().unwrap();
    let port = closed_port();
    let config = write_config(
        &dir,
        &format!(
            r#"{{
                "startup_timeout_ms": 300,
                "poll_interval_ms": 50,
                "components": [{{"name": "web", "kind": "frontend", "ready_port": {port}}}]
            }}"#
        ),
    );
    let out_dir = dir.path().join("reports");

    let output = stackprobe(&[
        "run",
        "--config",
        &config,
        "--output-dir",
        out_dir.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Overall Status: ⚠️ WARNING"), "{stdout}");

    let results: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("diagnostics-results.json")).unwrap())
            .unwrap();
    assert_eq!(results["overallStatus"], "warning");
    assert_eq!(results["components"]["web"]["status"], "unreachable");
    assert!(out_dir.join("diagnostics-report.md").exists());
}

#[test]
fn run_with_no_write_leaves_no_files() {
    let dir = TempDir::new().unwrap();
    let port = closed_port();
    let config = write_config(
        &dir,
        &format!(
            r#"{{"startup_timeout_ms": 200, "poll_interval_ms": 50,
                "components": [{{"name": "api", "kind": "api", "ready_port": {port}}}]}}"#
        ),
    );
    let out_dir = dir.path().join("reports");

    let output = stackprobe(&[
        "run",
        "--config",
        &config,
        "--output-dir",
        out_dir.to_str().unwrap(),
        "--no-write",
    ]);

    assert_eq!(output.status.code(), Some(0));
    assert!(!out_dir.exists());
}
