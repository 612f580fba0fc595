//! Unit tests for configuration loading and validation
//!
//! These tests verify JSON/TOML parsing, validation and job resolution.

use bcupper::config::{load_config, resolve_jobs, Protocol};
use test_utils::{deployed_config_json, ConfigBuilder, ResultAssertions, TestContext};
use std::fs;

#[test]
fn test_config_loading_toml() {
    let builder = ConfigBuilder::minimal().add_remote_directory("site", Protocol::Sftp, Some(5));
    let (config, temp_dir) = builder.persist();

    // Write config to file
    let config_path = temp_dir.path().join("config.toml");
    let toml_str = toml::to_string_pretty(&config).unwrap();
    fs::write(&config_path, toml_str).unwrap();

    let loaded = load_config(&config_path);
    assert!(loaded.is_ok(), "Config should load successfully: {:?}", loaded.err());

    let loaded = loaded.unwrap();
    assert_eq!(loaded.directories.len(), 2);
    let remote = loaded.directories[1].ftp.as_ref().unwrap();
    assert_eq!(remote.protocol, Protocol::Sftp);
    assert!(remote.insecure_skip_host_key);
}

#[test]
fn test_config_loading_deployed_json() {
    let ctx = TestContext::new();
    let source = ctx.create_subdir("docs");
    let destination = ctx.temp_dir().join("backups");

    let config_path = ctx.create_file(
        "config.json",
        &deployed_config_json(&source, &destination),
    );

    let config = load_config(&config_path).assert_ok();
    let jobs = resolve_jobs(&config);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].source, source);
    assert_eq!(jobs[0].max_backups.map(|n| n.get()), Some(2));
    assert!(jobs[0].is_local());
}

#[test]
fn test_config_rejects_empty_directory_list() {
    let ctx = TestContext::new();
    let config_path = ctx.create_file("config.json", r#"{ "directories": [] }"#);

    load_config(&config_path).assert_err_contains("No directories defined");
}

#[test]
fn test_config_rejects_zero_max_backups() {
    let ctx = TestContext::new();
    let config_path = ctx.create_file(
        "config.toml",
        r#"
[[directories]]
source = "/srv/photos"
destination = "/mnt/backups"
max_backups = 0
"#,
    );

    load_config(&config_path).assert_err_contains("max_backups");
}

#[test]
fn test_config_accepts_remote_alias() {
    let ctx = TestContext::new();
    let config_path = ctx.create_file(
        "config.toml",
        r#"
[[directories]]
source = "/srv/site"
destination = "/backups/site"

[directories.remote]
protocol = "ftp"
host = "nas.local"
user = "backup"
password = "secret"
"#,
    );

    let config = load_config(&config_path).assert_ok();
    let jobs = resolve_jobs(&config);
    assert!(!jobs[0].is_local());
    assert_eq!(jobs[0].max_backups, None);
    assert_eq!(jobs[0].destination_label(), "ftp://backup@nas.local:21/backups/site");
}

#[test]
fn test_config_missing_file() {
    let ctx = TestContext::new();
    load_config(ctx.temp_dir().join("absent.json")).assert_err_contains("Failed to read");
}

#[test]
fn test_missing_source_still_resolves() {
    // A missing source is a runtime warning, not a config error
    let (config, _temp_dir) = ConfigBuilder::new().add_missing_directory("gone").persist();
    let jobs = resolve_jobs(&config);
    assert_eq!(jobs.len(), 1);
    assert!(!jobs[0].source.exists());
}
