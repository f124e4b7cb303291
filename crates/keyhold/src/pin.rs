// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `keyhold set-pin`, `keyhold verify-pin` and `keyhold purge`.

use keyhold_config::KeyholdConfig;
use keyhold_core::KeyholdError;
use keyhold_credentials::{CredentialStore, get_new_pin_with_confirm, get_pin};
use secrecy::SecretString;

use crate::startup;

pub fn run_set_pin(config: &KeyholdConfig) -> Result<(), KeyholdError> {
    let store = startup::open_store(config)?;
    startup::unlock(&store)?;
    let new_pin = get_new_pin_with_confirm()?;
    set_pin(&store, &new_pin)?;
    store.wipe();
    println!("PIN updated for {}", store.record_path().display());
    Ok(())
}

/// Re-key an unlocked store.
pub fn set_pin(store: &CredentialStore, new_pin: &SecretString) -> Result<(), KeyholdError> {
    store.update_pin(new_pin)
}

pub fn run_verify_pin(config: &KeyholdConfig) -> Result<(), KeyholdError> {
    let store = startup::open_store(config)?;
    if !store.has_pin() {
        println!("no PIN is set");
        return Ok(());
    }
    let pin = get_pin()?;
    check_pin(&store, &pin)?;
    println!("PIN is correct");
    Ok(())
}

/// Verify `pin` without changing lock state.
pub fn check_pin(store: &CredentialStore, pin: &SecretString) -> Result<(), KeyholdError> {
    if store.verify_pin(pin)? {
        Ok(())
    } else {
        Err(KeyholdError::InvalidPin)
    }
}

pub fn run_purge(config: &KeyholdConfig, confirmed: bool) -> Result<(), KeyholdError> {
    if !confirmed {
        return Err(KeyholdError::Config(
            "purge erases every stored secret; pass --yes to confirm".to_string(),
        ));
    }
    let store = startup::open_store(config)?;
    store.purge()?;
    store.wipe();
    println!("purged {}", store.record_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyhold_test_utils::{TEST_PIN, TestHarness};

    fn pin(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn check_pin_does_not_unlock() {
        let harness = TestHarness::builder().with_pin().build().unwrap();
        harness.store.lock();

        check_pin(&harness.store, &pin(TEST_PIN)).unwrap();
        assert!(matches!(
            check_pin(&harness.store, &pin("9999")),
            Err(KeyholdError::InvalidPin)
        ));
        assert!(harness.store.is_locked());
    }

    #[test]
    fn set_pin_keeps_secrets_readable() {
        let harness = TestHarness::builder().with_pin().build().unwrap();
        set_pin(&harness.store, &pin("2468")).unwrap();
        harness.store.lock();

        assert!(harness.unlock().is_err());
        harness.store.unlock(&pin("2468")).unwrap();
        let token = harness.store.token().unwrap().unwrap();
        assert_eq!(token.access_token, keyhold_test_utils::TEST_ACCESS_TOKEN);
    }

    #[test]
    fn purge_requires_confirmation() {
        let config = KeyholdConfig::default();
        assert!(matches!(
            run_purge(&config, false),
            Err(KeyholdError::Config(_))
        ));
    }
}
