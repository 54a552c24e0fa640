// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of silently falling back to a default.

use serde::{Deserialize, Serialize};

/// Top-level TagTime configuration. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TagTimeConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Ping schedule settings.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Goal synchronisation and retry settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Beeminder HTTP endpoint settings.
    #[serde(default)]
    pub beeminder: BeeminderConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Ping schedule configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Mean minutes between pings. A change applies to future draws only.
    #[serde(default = "default_gap_minutes")]
    pub gap_minutes: u32,

    /// Pings older than this many seconds when the scheduler catches up are
    /// recorded as `OFF` without prompting.
    #[serde(default = "default_retro_threshold_secs")]
    pub retro_threshold_secs: u64,

    /// When false, due pings are recorded as `OFF` and never prompted.
    #[serde(default = "default_prompt")]
    pub prompt: bool,

    /// How many frequently used tags to offer with a new ping.
    #[serde(default = "default_quick_tags")]
    pub quick_tags: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            gap_minutes: default_gap_minutes(),
            retro_threshold_secs: default_retro_threshold_secs(),
            prompt: default_prompt(),
            quick_tags: default_quick_tags(),
        }
    }
}

fn default_gap_minutes() -> u32 {
    45
}

fn default_retro_threshold_secs() -> u64 {
    60
}

fn default_prompt() -> bool {
    true
}

fn default_quick_tags() -> usize {
    3
}

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("tagtime").join("tagtime.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("tagtime.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Delay growth between retries of a failed sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay before every retry.
    #[default]
    Fixed,
    /// Delay doubles per retry, capped at `max_retry_delay_secs`.
    Exponential,
}

/// Goal synchronisation configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Disable to keep samples local only.
    #[serde(default = "default_sync_enabled")]
    pub enabled: bool,

    /// Retry ceiling for a failed reconciliation.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    #[serde(default)]
    pub backoff: BackoffKind,

    /// Upper bound for exponential backoff.
    #[serde(default = "default_max_retry_delay_secs")]
    pub max_retry_delay_secs: u64,

    /// Bound on each wait for a session callback.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,

    /// From this retry onward a `NotFound` answer to a delete counts as done.
    #[serde(default = "default_not_found_after_retries")]
    pub not_found_after_retries: u32,

    /// Samples reconciled in parallel.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: default_sync_enabled(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            backoff: BackoffKind::default(),
            max_retry_delay_secs: default_max_retry_delay_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            not_found_after_retries: default_not_found_after_retries(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_sync_enabled() -> bool {
    true
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay_secs() -> u64 {
    60
}

fn default_max_retry_delay_secs() -> u64 {
    3600
}

fn default_handshake_timeout_secs() -> u64 {
    30
}

fn default_not_found_after_retries() -> u32 {
    1
}

fn default_max_concurrent() -> usize {
    4
}

/// Beeminder API configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeeminderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BeeminderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.beeminder.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}
