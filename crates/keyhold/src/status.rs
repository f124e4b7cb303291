// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `keyhold status` command implementation.
//!
//! Reports what the config record says without unlocking it: where it
//! lives, whether a PIN and an account are set up, and the endpoints in use.

use std::io::IsTerminal;

use keyhold_config::KeyholdConfig;
use keyhold_core::KeyholdError;
use keyhold_credentials::CredentialStore;
use serde::Serialize;

use crate::startup;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub record_path: String,
    pub record_exists: bool,
    pub pin_set: bool,
    pub locked: bool,
    pub logged_in: bool,
    pub device_id: String,
    pub api_url: String,
    pub identity_url: String,
    pub notifications_url: String,
    pub vault_url: String,
    pub websocket_enabled: bool,
}

impl StatusReport {
    pub fn collect(store: &CredentialStore, config: &KeyholdConfig) -> Self {
        Self {
            record_path: store.record_path().display().to_string(),
            record_exists: store.record_path().is_file(),
            pin_set: store.has_pin(),
            locked: store.is_locked(),
            logged_in: store.is_logged_in(),
            device_id: store.device_id(),
            api_url: store.api_url(),
            identity_url: store.identity_url(),
            notifications_url: store.notifications_url(),
            vault_url: store.vault_url(),
            websocket_enabled: config.sync.websocket_enabled,
        }
    }
}

pub fn run_status(config: &KeyholdConfig, json: bool, plain: bool) -> Result<(), KeyholdError> {
    let store = startup::open_store(config)?;
    let report = StatusReport::collect(&store, config);

    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| KeyholdError::Internal(format!("failed to render status: {e}")))?;
        println!("{rendered}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&report, use_color);
    }
    Ok(())
}

fn flag(value: bool, good_when: bool, use_color: bool) -> String {
    let text = if value { "yes" } else { "no" };
    if !use_color {
        return text.to_string();
    }
    use colored::Colorize;
    if value == good_when {
        text.green().to_string()
    } else {
        text.yellow().to_string()
    }
}

fn print_status(report: &StatusReport, use_color: bool) {
    println!();
    println!("  keyhold status");
    println!("  {}", "-".repeat(35));
    println!("    Record:        {}", report.record_path);
    if !report.record_exists {
        println!("                   (not written yet)");
    }
    println!("    PIN set:       {}", flag(report.pin_set, true, use_color));
    println!("    Locked:        {}", flag(report.locked, false, use_color));
    println!("    Logged in:     {}", flag(report.logged_in, true, use_color));
    println!("    Device:        {}", report.device_id);
    println!("    API:           {}", report.api_url);
    println!("    Identity:      {}", report.identity_url);
    println!("    Notifications: {}", report.notifications_url);
    println!("    Web vault:     {}", report.vault_url);
    println!(
        "    Push channel:  {}",
        if report.websocket_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyhold_test_utils::TestHarness;

    #[test]
    fn report_reflects_store_state() {
        let harness = TestHarness::builder().with_pin().build().unwrap();
        harness.store.lock();
        let report = StatusReport::collect(&harness.store, &KeyholdConfig::default());

        assert!(report.pin_set);
        assert!(report.locked);
        assert!(report.logged_in);
        assert_eq!(report.device_id, harness.store.device_id());
        assert!(report.websocket_enabled);
        assert!(!report.record_exists);
    }

    #[test]
    fn report_serializes_without_secrets() {
        let harness = TestHarness::builder().build().unwrap();
        let report = StatusReport::collect(&harness.store, &KeyholdConfig::default());
        let json = serde_json::to_string(&report).unwrap();

        assert!(json.contains("\"logged_in\":true"));
        assert!(json.contains("\"pin_set\":false"));
        assert!(!json.contains(keyhold_test_utils::TEST_ACCESS_TOKEN));
    }

    #[test]
    fn plain_flags_have_no_escape_codes() {
        assert_eq!(flag(true, true, false), "yes");
        assert_eq!(flag(false, true, false), "no");
    }
}
