//! End-to-end CLI tests for feedview.
//!
//! These tests run the actual binary against an isolated config directory
//! and cover the commands that work without a backend, plus error reporting
//! when the backend is unreachable.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::time::Instant;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

/// Log a test event with timestamp
macro_rules! test_log {
    ($($arg:tt)*) => {
        let timestamp = chrono::Utc::now().format("%H:%M:%S%.3f");
        eprintln!("[TEST {}] {}", timestamp, format!($($arg)*));
    };
}

/// The feedview command with HOME and XDG dirs pointed at `home`.
fn feedview_cmd(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("feedview");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("FEEDVIEW_API_URL")
        .env_remove("FEEDVIEW_VIEWER_ID")
        .env_remove("FEEDVIEW_FORMAT")
        .env_remove("FEEDVIEW_NOTIFICATION_LIMIT")
        .env_remove("RUST_LOG");
    cmd
}

fn temp_home() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

// =============================================================================
// General CLI
// =============================================================================

#[test]
fn test_cli_help_lists_commands() {
    let home = temp_home();
    feedview_cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("feed"))
        .stdout(predicate::str::contains("profile"))
        .stdout(predicate::str::contains("graph"))
        .stdout(predicate::str::contains("--api-url"));
}

#[test]
fn test_cli_version() {
    let home = temp_home();
    feedview_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_rejects_unknown_view() {
    let home = temp_home();
    feedview_cmd(&home)
        .args(["profile", "2", "--view", "mutuals"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not-following"));
}

#[test]
fn test_cli_log_flags() {
    let home = temp_home();
    feedview_cmd(&home)
        .args(["params", "--log-level", "trace", "--log-format", "pretty"])
        .assert()
        .success()
        .stdout(predicate::str::contains("user_id"));
    feedview_cmd(&home)
        .args(["params", "--log-level", "loud"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log level"));
}

#[test]
fn test_invalid_env_value_fails_before_running() {
    let home = temp_home();
    feedview_cmd(&home)
        .env("FEEDVIEW_NOTIFICATION_LIMIT", "lots")
        .arg("params")
        .assert()
        .failure()
        .stderr(predicate::str::contains("FEEDVIEW_NOTIFICATION_LIMIT"));
}

// =============================================================================
// params
// =============================================================================

#[test]
fn test_params_defaults() {
    let start = Instant::now();
    let home = temp_home();
    let output = feedview_cmd(&home)
        .arg("params")
        .assert()
        .success()
        .stdout(predicate::str::contains("user_id"))
        .stdout(predicate::str::contains("recency_popularity"))
        .stdout(predicate::str::contains("0.6"))
        .get_output()
        .stdout
        .clone();
    test_log!(
        "params output ({} bytes) in {:?}",
        output.len(),
        start.elapsed()
    );
}

#[test]
fn test_params_out_of_range_is_clamped() {
    let home = temp_home();
    feedview_cmd(&home)
        .args(["params", "--set", "topic_tech=1.5", "--set", "niche_viral=-2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("clamped from 1.5"))
        .stdout(predicate::str::contains("clamped from -2"));
}

#[test]
fn test_params_json_is_flat() {
    let home = temp_home();
    let output = feedview_cmd(&home)
        .args(["params", "--format", "json", "--viewer", "3", "--set", "topic_culture=0.25"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: serde_json::Value =
        serde_json::from_slice(&output).expect("params output is JSON");
    assert_eq!(value["user_id"], 3);
    assert_eq!(value["topic_culture"], 0.25);
    assert_eq!(value["friends_global"], 0.5);
    assert_eq!(value.as_object().map(serde_json::Map::len), Some(7));
}

#[test]
fn test_params_viewer_from_env() {
    let home = temp_home();
    feedview_cmd(&home)
        .env("FEEDVIEW_VIEWER_ID", "7")
        .args(["params", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"user_id\":7"));
}

#[test]
fn test_params_unknown_preference_suggests_closest() {
    let home = temp_home();
    feedview_cmd(&home)
        .args(["params", "--set", "topic_tec=0.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown preference"))
        .stderr(predicate::str::contains("Did you mean 'topic_tech'"));
}

#[test]
fn test_params_non_numeric_value() {
    let home = temp_home();
    feedview_cmd(&home)
        .args(["params", "--set", "topic_tech=lots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value 'lots'"));
}

// =============================================================================
// config
// =============================================================================

#[test]
fn test_config_show_defaults() {
    let home = temp_home();
    feedview_cmd(&home)
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[api]"))
        .stdout(predicate::str::contains("http://localhost:8000"))
        .stdout(predicate::str::contains("notification_limit = 6"));
}

#[test]
fn test_config_set_persists_and_applies() {
    let home = temp_home();
    feedview_cmd(&home)
        .args(["config", "--set", "feed.topic_politics=0.9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set feed.topic_politics"));

    let path = home.path().join(".config").join("feedview").join("config.toml");
    let content = std::fs::read_to_string(&path).expect("config file written");
    test_log!("config file:\n{content}");
    assert!(content.contains("topic_politics = 0.9"));

    feedview_cmd(&home)
        .args(["params", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"topic_politics\":0.9"));
}

#[test]
fn test_config_set_unknown_key() {
    let home = temp_home();
    feedview_cmd(&home)
        .args(["config", "--set", "api.base_ur=http://x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"))
        .stderr(predicate::str::contains("api.base_url"));
}

#[test]
fn test_config_init_writes_once() {
    let home = temp_home();
    feedview_cmd(&home)
        .args(["config", "--init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));
    feedview_cmd(&home)
        .args(["config", "--init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

// =============================================================================
// Backend commands
// =============================================================================

#[test]
fn test_feed_unreachable_backend_reports_transport_error() {
    let home = temp_home();
    feedview_cmd(&home)
        .args(["feed", "--api-url", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("No posts to show."))
        .stderr(predicate::str::contains("transport error"));
}

#[test]
fn test_invalid_api_url() {
    let home = temp_home();
    feedview_cmd(&home)
        .args(["trends", "--api-url", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid backend URL"));
}

#[test]
fn test_completions_bash() {
    let home = temp_home();
    feedview_cmd(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("feedview"));
}
