//! CLI integration tests for the `swb` binary.
//!
//! These tests run the compiled binary via `std::process::Command`. Each
//! test spawns a fresh process with `SWITCHBOARD_CONFIG` pointing at a
//! nonexistent path (empty config) or at a temporary config file.

use std::path::Path;
use std::process::Command;

/// Build a `Command` pointing at the compiled `swb` binary.
///
/// Points `SWITCHBOARD_CONFIG` at a nonexistent path so tests never load a
/// real user config from `~/.switchboard/config.json`.
fn swb_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_swb"));
    cmd.env("SWITCHBOARD_CONFIG", "/tmp/.switchboard-test-nonexistent-config.json");
    // Suppress tracing output so test assertions only match program output.
    cmd.env("RUST_LOG", "off");
    cmd
}

fn write_config(dir: &Path, json: &str) -> String {
    let path = dir.join("config.json");
    std::fs::write(&path, json).expect("failed to write config");
    path.to_string_lossy().into_owned()
}

// ── Version and help ────────────────────────────────────────────────────

#[test]
fn version_output() {
    let output = swb_bin().arg("--version").output().expect("failed to run swb");

    assert!(output.status.success(), "exit code should be 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("swb") && stdout.contains(env!("CARGO_PKG_VERSION")),
        "version output should contain name and version, got: {stdout}"
    );
}

#[test]
fn help_output() {
    let output = swb_bin().arg("--help").output().expect("failed to run swb");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for sub in ["providers", "models", "test", "ask"] {
        assert!(stdout.contains(sub), "help should list `{sub}`, got: {stdout}");
    }
}

#[test]
fn unknown_subcommand_fails() {
    let output = swb_bin().arg("frobnicate").output().expect("failed to run swb");
    assert!(!output.status.success());
}

// ── providers ───────────────────────────────────────────────────────────

#[test]
fn providers_with_empty_config() {
    let output = swb_bin().arg("providers").output().expect("failed to run swb");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("No providers configured"),
        "got: {stdout}"
    );
}

#[test]
fn providers_table_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        r#"{
            "activeProviderId": "claude",
            "providers": [
                {"id": "claude", "name": "Claude", "type": "anthropic", "apiKey": "sk-secret-value", "order": 1},
                {"id": "local", "name": "Local", "type": "openai", "baseUrl": "http://127.0.0.1:9/v1", "enabled": false}
            ]
        }"#,
    );

    let output = swb_bin()
        .args(["providers", "--config", &config])
        .output()
        .expect("failed to run swb");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("claude"));
    assert!(stdout.contains("anthropic"));
    assert!(stdout.contains("local"));
    assert!(!stdout.contains("sk-secret-value"));
}

#[test]
fn providers_json_via_env_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        r#"{"providers": [{"id": "g", "type": "gemini", "apiKey": "k"}]}"#,
    );

    let output = swb_bin()
        .env("SWITCHBOARD_CONFIG", &config)
        .args(["providers", "--json"])
        .output()
        .expect("failed to run swb");

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["providers"][0]["id"], "g");
    assert_eq!(value["providers"][0]["type"], "gemini");
    assert_eq!(value["providers"][0]["ready"], true);
}

#[test]
fn missing_explicit_config_fails() {
    let output = swb_bin()
        .args(["providers", "--config", "/tmp/.switchboard-definitely-missing.json"])
        .output()
        .expect("failed to run swb");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config file not found"), "got: {stderr}");
}

// ── models / test / ask ─────────────────────────────────────────────────

#[test]
fn models_unknown_provider_fails() {
    let output = swb_bin().args(["models", "nope"]).output().expect("failed to run swb");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown provider"), "got: {stderr}");
}

#[test]
fn models_falls_back_to_static_list_when_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        r#"{"providers": [{"id": "o", "type": "openai", "models": ["m-one", "m-two"]}]}"#,
    );

    let output = swb_bin()
        .args(["models", "o", "--config", &config])
        .output()
        .expect("failed to run swb");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["m-one", "m-two"]);
}

#[test]
fn test_reports_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        r#"{"providers": [{"id": "keyless", "type": "anthropic"}]}"#,
    );

    let output = swb_bin()
        .args(["test", "--config", &config])
        .output()
        .expect("failed to run swb");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("keyless"));
    assert!(stdout.contains("not ready"));
}

#[test]
fn ask_without_providers_fails() {
    let output = swb_bin().args(["ask", "hello"]).output().expect("failed to run swb");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no ready providers"), "got: {stderr}");
}

#[test]
fn ask_with_unknown_provider_fails() {
    let output = swb_bin()
        .args(["ask", "hello", "--provider", "ghost"])
        .output()
        .expect("failed to run swb");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown provider: ghost"), "got: {stderr}");
}
