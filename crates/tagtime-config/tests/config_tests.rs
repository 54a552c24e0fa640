// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the TagTime configuration system.

use tagtime_config::diagnostic::ConfigError;
use tagtime_config::model::{BackoffKind, TagTimeConfig};
use tagtime_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[logging]
level = "debug"

[schedule]
gap_minutes = 30
retro_threshold_secs = 120
prompt = false
quick_tags = 5

[storage]
database_path = "/tmp/tagtime-test.db"
wal_mode = false

[sync]
enabled = true
max_retries = 3
retry_delay_secs = 10
backoff = "exponential"
max_retry_delay_secs = 600
handshake_timeout_secs = 5
not_found_after_retries = 2
max_concurrent = 8

[beeminder]
base_url = "http://localhost:9999"
request_timeout_secs = 7
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.schedule.gap_minutes, 30);
    assert_eq!(config.schedule.retro_threshold_secs, 120);
    assert!(!config.schedule.prompt);
    assert_eq!(config.schedule.quick_tags, 5);
    assert_eq!(config.storage.database_path, "/tmp/tagtime-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.sync.max_retries, 3);
    assert_eq!(config.sync.backoff, BackoffKind::Exponential);
    assert_eq!(config.sync.max_retry_delay_secs, 600);
    assert_eq!(config.sync.handshake_timeout_secs, 5);
    assert_eq!(config.sync.not_found_after_retries, 2);
    assert_eq!(config.sync.max_concurrent, 8);
    assert_eq!(config.beeminder.base_url, "http://localhost:9999");
    assert_eq!(config.beeminder.request_timeout_secs, 7);
}

#[test]
fn empty_toml_yields_defaults() {
    let config = load_and_validate_str("").expect("empty config is valid");
    let defaults = TagTimeConfig::default();
    assert_eq!(config, defaults);
    assert_eq!(config.schedule.gap_minutes, 45);
    assert_eq!(config.schedule.retro_threshold_secs, 60);
    assert_eq!(config.sync.max_retries, 5);
    assert_eq!(config.sync.retry_delay_secs, 60);
    assert_eq!(config.sync.backoff, BackoffKind::Fixed);
    assert_eq!(config.sync.handshake_timeout_secs, 30);
    assert!(config.storage.database_path.ends_with("tagtime.db"));
}

#[test]
fn unknown_key_gets_suggestion() {
    let toml = "[schedule]\ngap_minuts = 30\n";
    let errors = load_and_validate_str(toml).expect_err("unknown key must be rejected");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "gap_minuts");
            assert_eq!(suggestion.as_deref(), Some("gap_minutes"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn unknown_section_is_rejected() {
    let errors = load_and_validate_str("[telemetry]\nenabled = true\n")
        .expect_err("unknown section must be rejected");
    assert!(matches!(errors[0], ConfigError::UnknownKey { .. }));
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[sync]\nmax_retries = \"five\"\n")
        .expect_err("string for integer must be rejected");
    match &errors[0] {
        ConfigError::InvalidType { key, .. } => assert_eq!(key, "sync.max_retries"),
        other => panic!("expected InvalidType, got {other:?}"),
    }
}

#[test]
fn unknown_backoff_is_rejected() {
    assert!(load_and_validate_str("[sync]\nbackoff = \"random\"\n").is_err());
}

#[test]
fn validation_runs_after_deserialization() {
    let errors = load_and_validate_str("[schedule]\ngap_minutes = 0\n")
        .expect_err("zero gap must fail validation");
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}

#[test]
#[serial_test::serial]
fn explicit_path_is_loaded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tagtime.toml");
    std::fs::write(&path, "[sync]\nmax_concurrent = 2\n").expect("write config");
    let config = load_and_validate_path(&path).expect("valid file");
    assert_eq!(config.sync.max_concurrent, 2);
}
