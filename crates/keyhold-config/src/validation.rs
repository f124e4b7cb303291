// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for settings values.

use crate::diagnostic::ConfigError;
use crate::model::KeyholdConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every failure rather than stopping at the first one.
pub fn validate_config(config: &KeyholdConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.agent.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.log_level `{}` is not one of {}",
                config.agent.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if let Some(path) = &config.agent.record_path
        && path.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "agent.record_path must not be empty when set".to_string(),
        });
    }

    let intervals = [
        ("sync.reconnect_interval_secs", config.sync.reconnect_interval_secs),
        ("sync.locked_poll_interval_secs", config.sync.locked_poll_interval_secs),
        ("sync.liveness_interval_secs", config.sync.liveness_interval_secs),
        ("sync.request_timeout_secs", config.sync.request_timeout_secs),
    ];
    for (key, value) in intervals {
        if value == 0 {
            errors.push(ConfigError::Validation {
                message: format!("{key} must be greater than zero"),
            });
        }
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

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&KeyholdConfig::default()).is_ok());
    }

    #[test]
    fn zero_intervals_are_all_reported() {
        let mut config = KeyholdConfig::default();
        config.sync.reconnect_interval_secs = 0;
        config.sync.liveness_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut config = KeyholdConfig::default();
        config.agent.log_level = "verbose".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("agent.log_level"));
    }

    #[test]
    fn blank_record_path_is_rejected() {
        let mut config = KeyholdConfig::default();
        config.agent.record_path = Some("  ".into());
        assert!(validate_config(&config).is_err());
    }
}
