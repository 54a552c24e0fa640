// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::TagTimeConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validates semantic constraints serde cannot express.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &TagTimeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::validation(format!(
            "logging.level `{}` must be one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.schedule.gap_minutes == 0 {
        errors.push(ConfigError::validation(
            "schedule.gap_minutes must be at least 1",
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let sync = &config.sync;
    if sync.retry_delay_secs == 0 {
        errors.push(ConfigError::validation(
            "sync.retry_delay_secs must be at least 1",
        ));
    }
    if sync.max_retry_delay_secs < sync.retry_delay_secs {
        errors.push(ConfigError::validation(format!(
            "sync.max_retry_delay_secs ({}) must not be below sync.retry_delay_secs ({})",
            sync.max_retry_delay_secs, sync.retry_delay_secs
        )));
    }
    if sync.handshake_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "sync.handshake_timeout_secs must be at least 1",
        ));
    }
    if sync.max_concurrent == 0 {
        errors.push(ConfigError::validation(
            "sync.max_concurrent must be at least 1",
        ));
    }

    let url = config.beeminder.base_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(ConfigError::validation(format!(
            "beeminder.base_url `{url}` must start with http:// or https://"
        )));
    }
    if config.beeminder.request_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "beeminder.request_timeout_secs must be at least 1",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &TagTimeConfig) -> Vec<String> {
        validate_config(config)
            .err()
            .unwrap_or_default()
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&TagTimeConfig::default()).is_ok());
    }

    #[test]
    fn zero_gap_fails_validation() {
        let mut config = TagTimeConfig::default();
        config.schedule.gap_minutes = 0;
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("schedule.gap_minutes"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = TagTimeConfig::default();
        config.storage.database_path = "  ".into();
        config.sync.handshake_timeout_secs = 0;
        config.beeminder.base_url = "ftp://example.com".into();
        config.logging.level = "loud".into();
        assert_eq!(messages(&config).len(), 4);
    }

    #[test]
    fn retry_delay_cap_below_base_fails() {
        let mut config = TagTimeConfig::default();
        config.sync.retry_delay_secs = 120;
        config.sync.max_retry_delay_secs = 60;
        let msgs = messages(&config);
        assert!(msgs[0].contains("max_retry_delay_secs"));
    }
}
