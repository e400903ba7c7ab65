//! Integration tests for the `poolmath` CLI binary.
//!
//! Argument parsing, config management, and fetches against a local
//! wiremock server. Nothing touches the user's real configuration.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `poolmath` binary with env isolation.
///
/// Clears all `POOLMATH_*` env vars and points config and state at `dir`.
fn poolmath_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("poolmath");
    cmd.env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env("XDG_DATA_HOME", dir.join("data"))
        .env("POOLMATH_CONFIG", dir.join("config.toml"))
        .env("POOLMATH_STATE_DIR", dir.join("state"))
        .env_remove("POOLMATH_BASE_URL")
        .env_remove("POOLMATH_OUTPUT")
        .env_remove("POOLMATH_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn pool_body(logs: Value) -> Value {
    json!({"pools": [{"pool": {"id": "pool-1", "userId": "user-1", "name": "Backyard", "logs": logs}}]})
}

async fn pool_server(logs: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/share/pool"))
        .and(query_param("userId", "user-1"))
        .and(query_param("poolId", "pool-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pool_body(logs)))
        .mount(&server)
        .await;
    server
}

async fn share_server() -> MockServer {
    let server = pool_server(json!([{"fc": 5, "ts": "2024-01-01T10:00:00Z"}])).await;
    Mock::given(method("GET"))
        .and(path("/share/6WPG8yL.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pools": [{"pool": {"id": "pool-1", "userId": "user-1"}}]
        })))
        .mount(&server)
        .await;
    server
}

const POOL_URL: &str = "https://troublefreepool.com/mypool/user-1/pool-1";

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = poolmath_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let dir = tempfile::tempdir().unwrap();
    poolmath_cmd(dir.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("Pool Math")
            .and(predicate::str::contains("fetch"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("migrate")),
    );
}

#[test]
fn test_version_flag() {
    let dir = tempfile::tempdir().unwrap();
    poolmath_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("poolmath"));
}

#[test]
fn test_completions_zsh() {
    let dir = tempfile::tempdir().unwrap();
    poolmath_cmd(dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Config management ───────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    let dir = tempfile::tempdir().unwrap();
    poolmath_cmd(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_add_then_list() {
    let dir = tempfile::tempdir().unwrap();
    poolmath_cmd(dir.path())
        .args(["config", "add", "backyard", POOL_URL, "--name", "Backyard", "--interval", "10m"])
        .assert()
        .success();

    let output = poolmath_cmd(dir.path())
        .args(["pools", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let pools: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(pools[0]["key"], "backyard");
    assert_eq!(pools[0]["identity"], "user-1/pool-1");
    assert_eq!(pools[0]["poll_interval_secs"], 600);
    assert_eq!(pools[0]["needs_migration"], false);
}

#[test]
fn test_config_add_duplicate_is_conflict() {
    let dir = tempfile::tempdir().unwrap();
    poolmath_cmd(dir.path())
        .args(["config", "add", "backyard", POOL_URL])
        .assert()
        .success();
    poolmath_cmd(dir.path())
        .args(["config", "add", "backyard", POOL_URL])
        .assert()
        .code(6);
}

#[test]
fn test_config_add_rejects_foreign_link() {
    let dir = tempfile::tempdir().unwrap();
    poolmath_cmd(dir.path())
        .args(["config", "add", "spa", "https://example.com/pool/1"])
        .assert()
        .code(2);
}

#[test]
fn test_config_add_rejects_short_interval() {
    let dir = tempfile::tempdir().unwrap();
    poolmath_cmd(dir.path())
        .args(["config", "add", "spa", POOL_URL, "--interval", "30s"])
        .assert()
        .code(2);
}

#[test]
fn test_config_remove_unknown_pool() {
    let dir = tempfile::tempdir().unwrap();
    poolmath_cmd(dir.path())
        .args(["config", "remove", "nope"])
        .assert()
        .code(4);
}

#[test]
fn test_fetch_without_pools() {
    let dir = tempfile::tempdir().unwrap();
    let output = poolmath_cmd(dir.path()).arg("fetch").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("No pools configured"));
}

// ── Fetching ────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_url_prints_readings() {
    let server = pool_server(json!([
        {"fc": "3.5", "cc": "0.5", "ph": "7.6", "ts": "2024-01-01T10:00:00Z"}
    ]))
    .await;
    let dir = tempfile::tempdir().unwrap();

    let output = poolmath_cmd(dir.path())
        .env("POOLMATH_BASE_URL", server.uri())
        .args(["fetch", "--url", POOL_URL, "--name", "Backyard", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let readings: Value = serde_json::from_slice(&output.stdout).unwrap();
    let readings = readings.as_array().unwrap();
    let by_code = |code: &str| {
        readings
            .iter()
            .find(|r| r["code"] == code)
            .unwrap_or_else(|| panic!("no {code} in {readings:?}"))
    };
    assert_eq!(by_code("fc")["value"].as_f64(), Some(3.5));
    assert_eq!(by_code("tc")["value"].as_f64(), Some(4.0));
    assert_eq!(by_code("ph")["name"], "Backyard pH");
    assert_eq!(by_code("ph")["target"]["out_of_range"], false);
    assert_eq!(by_code("fc")["last_updated"], "2024-01-01T10:00:00Z");

    // Restore state was persisted for the next run.
    assert!(dir.path().join("state/user-1_pool-1.json").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_empty_log_exits_with_no_data() {
    let server = pool_server(json!([])).await;
    let dir = tempfile::tempdir().unwrap();

    let output = poolmath_cmd(dir.path())
        .env("POOLMATH_BASE_URL", server.uri())
        .args(["fetch", "--url", POOL_URL])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(9));
    assert!(combined_output(&output).contains("No chemistry has been logged"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_migrates_legacy_pool_on_first_use() {
    let server = share_server().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[pools.backyard]\nname = \"Backyard\"\nshare_id = \"6WPG8yL\"\n",
    )
    .unwrap();

    poolmath_cmd(dir.path())
        .env("POOLMATH_BASE_URL", server.uri())
        .args(["fetch", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backyard\tfc\t5.0"));

    let config = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(config.contains("user_id = \"user-1\""), "{config}");
    assert!(!config.contains("share_id"), "{config}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_migrate_dry_run_leaves_config() {
    let server = share_server().await;
    let dir = tempfile::tempdir().unwrap();
    let original = "[pools.backyard]\nshare_id = \"6WPG8yL\"\n";
    std::fs::write(dir.path().join("config.toml"), original).unwrap();

    poolmath_cmd(dir.path())
        .env("POOLMATH_BASE_URL", server.uri())
        .args(["migrate", "--dry-run", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backyard\tuser-1/pool-1"));

    let config = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert_eq!(config, original);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_resolve_share_token() {
    let server = share_server().await;
    let dir = tempfile::tempdir().unwrap();

    poolmath_cmd(dir.path())
        .env("POOLMATH_BASE_URL", server.uri())
        .args(["resolve", "https://example.com/mypool/6WPG8yL"])
        .assert()
        .code(2);

    poolmath_cmd(dir.path())
        .env("POOLMATH_BASE_URL", server.uri())
        .args(["resolve", "share_id=6WPG8yL", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("user-1/pool-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watch_prints_first_update_and_exits() {
    let server = pool_server(json!([{"salt": 3100, "ts": "2024-01-01T10:00:00Z"}])).await;
    let dir = tempfile::tempdir().unwrap();

    poolmath_cmd(dir.path())
        .env("POOLMATH_BASE_URL", server.uri())
        .args(["watch", "--url", POOL_URL, "--count", "1", "-o", "plain"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("url\tsalt\t3100"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_diagnostics_are_redacted() {
    let server = pool_server(json!([{"ph": 7.4, "ts": "2024-01-01T10:00:00Z"}])).await;
    let dir = tempfile::tempdir().unwrap();

    let output = poolmath_cmd(dir.path())
        .env("POOLMATH_BASE_URL", server.uri())
        .args(["diagnostics", "--url", POOL_URL, "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let text = String::from_utf8_lossy(&output.stdout);
    assert!(!text.contains("user-1"), "{text}");
    assert!(text.contains("**REDACTED**"));
}
