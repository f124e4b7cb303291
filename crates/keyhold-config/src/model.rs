// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Settings model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so misspelled keys are
//! rejected at startup with a suggestion.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level keyhold settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeyholdConfig {
    /// Process-wide behaviour.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Push channel and resync cadence.
    #[serde(default)]
    pub sync: SyncConfig,

    /// PIN cache behaviour.
    #[serde(default)]
    pub pin: PinConfig,
}

/// Process-wide agent settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Override for the encrypted config record location.
    #[serde(default)]
    pub record_path: Option<String>,

    /// Write the config record to disk. `false` keeps it in memory only.
    #[serde(default = "default_true")]
    pub persist_record: bool,

    /// Lock key buffers into RAM so they are never swapped out.
    #[serde(default = "default_true")]
    pub hardened_memory: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            record_path: None,
            persist_record: true,
            hardened_memory: true,
        }
    }
}

impl AgentConfig {
    /// Resolved record path: the override, or `~/.config/keyhold/keyhold.json`.
    pub fn resolved_record_path(&self) -> PathBuf {
        match &self.record_path {
            Some(path) => PathBuf::from(path),
            None => default_record_path(),
        }
    }
}

/// Default location of the encrypted config record.
pub fn default_record_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keyhold")
        .join("keyhold.json")
}

/// Location used by releases that kept the record directly in the config dir.
pub fn legacy_record_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keyhold.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Push channel and resync settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Keep a push connection open for incremental updates.
    #[serde(default = "default_true")]
    pub websocket_enabled: bool,

    /// Pause between a dropped connection and the next connect attempt.
    #[serde(default = "default_reconnect_interval_secs")]
    pub reconnect_interval_secs: u64,

    /// Poll interval while the store is locked.
    #[serde(default = "default_locked_poll_interval_secs")]
    pub locked_poll_interval_secs: u64,

    /// How often the liveness monitor checks lock and session state.
    #[serde(default = "default_liveness_interval_secs")]
    pub liveness_interval_secs: u64,

    /// Timeout for each remote HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            websocket_enabled: true,
            reconnect_interval_secs: default_reconnect_interval_secs(),
            locked_poll_interval_secs: default_locked_poll_interval_secs(),
            liveness_interval_secs: default_liveness_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SyncConfig {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs)
    }

    pub fn locked_poll_interval(&self) -> Duration {
        Duration::from_secs(self.locked_poll_interval_secs)
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_secs(self.liveness_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_reconnect_interval_secs() -> u64 {
    60
}

fn default_locked_poll_interval_secs() -> u64 {
    5
}

fn default_liveness_interval_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// PIN cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PinConfig {
    /// How long an entered PIN may be reused for silent re-unlock.
    /// Zero disables the cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl PinConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn default_cache_ttl_secs() -> u64 {
    300
}
