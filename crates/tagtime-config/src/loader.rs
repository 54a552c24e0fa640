// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./tagtime.toml` > `~/.config/tagtime/tagtime.toml` >
//! `/etc/tagtime/tagtime.toml`, with `TAGTIME_` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TagTimeConfig;

/// Config sections addressable from the environment.
const SECTIONS: &[&str] = &["logging", "schedule", "storage", "sync", "beeminder"];

pub const SYSTEM_CONFIG_PATH: &str = "/etc/tagtime/tagtime.toml";
pub const LOCAL_CONFIG_PATH: &str = "tagtime.toml";

/// `<XDG config dir>/tagtime/tagtime.toml`, when a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tagtime").join("tagtime.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tagtime/tagtime.toml`
/// 3. `~/.config/tagtime/tagtime.toml`
/// 4. `./tagtime.toml`
/// 5. `TAGTIME_*` environment variables
pub fn load_config() -> Result<TagTimeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string on top of the defaults only.
pub fn load_config_from_str(toml_content: &str) -> Result<TagTimeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TagTimeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TagTimeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TagTimeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment, before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(TagTimeConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH));
    if let Some(user) = user_config_path() {
        figment = figment.merge(Toml::file(user));
    }
    figment.merge(Toml::file(LOCAL_CONFIG_PATH)).merge(env_provider())
}

/// Environment provider mapping `TAGTIME_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `TAGTIME_SYNC_MAX_RETRIES` maps to `sync.max_retries`.
fn env_provider() -> Env {
    Env::prefixed("TAGTIME_").map(|key| {
        let key_str = key.as_str().to_ascii_lowercase();
        SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|field| format!("{section}.{field}"))
            })
            .unwrap_or(key_str)
            .into()
    })
}
