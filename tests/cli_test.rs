//! CLI integration tests
//!
//! Tests for the command-line interface using assert_cmd.
//!
//! These tests verify:
//! - Help and version flags
//! - Configuration validation and its output formats
//! - Error handling for invalid configuration

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

/// Get a command for the vsphere-exporter binary
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin("vsphere-exporter").expect("Failed to find vsphere-exporter binary")
}

/// Helper to create a temporary config file with given content
fn create_temp_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    file.flush().expect("Failed to flush");
    file
}

const VALID_CONFIG: &str = r#"
mode: multi
clusters:
  default:
    username: monitor@vsphere.local
    password: do-not-print-me
  vc01.example.com:
    username: admin@vsphere.local
    password: also-secret
server:
  port: 19272
  path: /vsphere
vsphere:
  timeout_ms: 15000
"#;

/// Test --help flag displays usage information
#[test]
fn test_help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:").or(predicate::str::contains("usage:")))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--validate"));
}

/// Test --version flag displays version
#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

/// Test that a valid configuration is accepted via --validate flag
#[test]
fn test_validate_valid_config() {
    let file = create_temp_config(VALID_CONFIG);

    cmd()
        .arg("-c")
        .arg(file.path())
        .arg("--validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("vc01.example.com"))
        .stdout(predicate::str::contains("do-not-print-me").not());
}

/// Test --validate with JSON output
#[test]
fn test_validate_json_output() {
    let file = create_temp_config(VALID_CONFIG);

    let output = cmd()
        .arg("-c")
        .arg(file.path())
        .arg("--validate")
        .arg("--output-format")
        .arg("json")
        .arg("-p")
        .arg("19999")
        .output()
        .expect("Failed to run binary");

    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("validate output is JSON");
    assert_eq!(report["valid"], true);
    assert_eq!(report["mode"], "multi");
    assert_eq!(report["port"], 19999);
    assert_eq!(report["timeout_ms"], 15000);
    assert!(!String::from_utf8_lossy(&output.stdout).contains("also-secret"));
}

/// Test --validate with YAML output
#[test]
fn test_validate_yaml_output() {
    let file = create_temp_config(VALID_CONFIG);

    cmd()
        .arg("-c")
        .arg(file.path())
        .arg("--validate")
        .arg("--output-format")
        .arg("yaml")
        .assert()
        .success()
        .stdout(predicate::str::contains("mode: multi"))
        .stdout(predicate::str::contains("path: /vsphere"));
}

/// Test that invalid YAML is rejected
#[test]
fn test_validate_invalid_config_bad_yaml() {
    let file = create_temp_config("clusters: [not valid yaml\n");

    cmd()
        .arg("-c")
        .arg(file.path())
        .arg("--validate")
        .assert()
        .failure();
}

/// Test that single mode without enabled_cluster is rejected
#[test]
fn test_single_mode_without_enabled_cluster() {
    let file = create_temp_config("mode: single\n");

    cmd()
        .arg("-c")
        .arg(file.path())
        .arg("--validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("enabled_cluster"));
}

/// Test that invalid port (0) is rejected before the server starts
#[test]
fn test_invalid_port_zero() {
    let file = create_temp_config("server:\n  port: 0\n");

    cmd()
        .arg("-c")
        .arg(file.path())
        .timeout(std::time::Duration::from_millis(1000))
        .assert()
        .failure();
}

/// Test that the scrape path may not shadow built-in routes
#[test]
fn test_scrape_path_conflicts() {
    for path in ["/", "/health", "/metrics", "no-leading-slash"] {
        let file = create_temp_config(&format!("server:\n  path: \"{}\"\n", path));

        cmd()
            .arg("-c")
            .arg(file.path())
            .arg("--validate")
            .assert()
            .failure();
    }
}

/// Test that --validate needs an existing file
#[test]
fn test_validate_missing_config_file() {
    cmd()
        .arg("-c")
        .arg("/nonexistent/path/config.yaml")
        .arg("--validate")
        .assert()
        .failure();
}

/// Test that log level and format are accepted
#[test]
fn test_log_arguments() {
    let file = create_temp_config(VALID_CONFIG);

    cmd()
        .arg("-c")
        .arg(file.path())
        .arg("--log-level")
        .arg("debug")
        .arg("--log-format")
        .arg("json")
        .arg("--validate")
        .assert()
        .success();
}

/// Test that an unknown log level is rejected by the parser
#[test]
fn test_invalid_log_level() {
    cmd()
        .arg("--log-level")
        .arg("verbose")
        .assert()
        .failure()
        .stderr(predicate::str::contains("verbose"));
}

/// Test environment variable for the config path
#[test]
fn test_env_config_path() {
    let file = create_temp_config(VALID_CONFIG);

    cmd()
        .env("VSPHERE_EXPORTER_CONFIG", file.path())
        .arg("--validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}
