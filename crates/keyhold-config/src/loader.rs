// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Settings loader using Figment for layered merging.
//!
//! Lookup order: `./keyhold.toml` > `~/.config/keyhold/keyhold.toml` >
//! `/etc/keyhold/keyhold.toml`, with `KEYHOLD_*` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::KeyholdConfig;

/// System-wide settings file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/keyhold/keyhold.toml";

/// Load settings from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/keyhold/keyhold.toml`
/// 3. `~/.config/keyhold/keyhold.toml`
/// 4. `./keyhold.toml`
/// 5. `KEYHOLD_*` environment variables
pub fn load_config() -> Result<KeyholdConfig, figment::Error> {
    build_figment().extract()
}

/// Load settings from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<KeyholdConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KeyholdConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load settings from one explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KeyholdConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KeyholdConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(KeyholdConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("keyhold/keyhold.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("keyhold.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `KEYHOLD_SYNC_RECONNECT_INTERVAL_SECS` must map to
/// `sync.reconnect_interval_secs`. `KEYHOLD_PIN` and `KEYHOLD_NEW_PIN` carry
/// PINs, not settings, and are filtered out.
fn env_provider() -> Env {
    Env::prefixed("KEYHOLD_")
        .ignore(&["pin", "new_pin"])
        .map(|key| {
            let mapped = key
                .as_str()
                .replacen("agent_", "agent.", 1)
                .replacen("sync_", "sync.", 1)
                .replacen("pin_", "pin.", 1);
            mapped.into()
        })
}
