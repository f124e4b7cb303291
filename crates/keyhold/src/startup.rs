// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opening and unlocking the credential store.

use std::path::Path;
use std::sync::Arc;

use keyhold_config::KeyholdConfig;
use keyhold_config::model::{default_record_path, legacy_record_path};
use keyhold_core::KeyholdError;
use keyhold_credentials::prompt::PIN_ENV_VAR;
use keyhold_credentials::{
    CredentialStore, LegacyMigration, StoreOptions, get_pin, migrate_legacy_record,
};
use tracing::{debug, info, warn};

/// Interactive unlock attempts before giving up.
pub const MAX_PIN_ATTEMPTS: u32 = 3;

/// Store options from the agent settings.
pub fn store_options(config: &KeyholdConfig) -> StoreOptions {
    let mut options = StoreOptions::new(config.agent.resolved_record_path());
    options.persist = config.agent.persist_record;
    options.hardened_memory = config.agent.hardened_memory;
    options.pin_cache_ttl = config.pin.cache_ttl();
    options
}

/// Open the record the settings point at.
///
/// When no explicit path is configured, a record left at the legacy
/// location is moved into place first.
pub fn open_store(config: &KeyholdConfig) -> Result<Arc<CredentialStore>, KeyholdError> {
    if config.agent.record_path.is_none() {
        migrate_legacy(&legacy_record_path(), &default_record_path())?;
    }
    Ok(Arc::new(CredentialStore::open(store_options(config))?))
}

/// Run the legacy migration to completion.
///
/// A first pass may only create the new directory; the second pass then
/// performs the move.
pub fn migrate_legacy(legacy: &Path, current: &Path) -> Result<LegacyMigration, KeyholdError> {
    let mut outcome = migrate_legacy_record(legacy, current)?;
    if outcome == LegacyMigration::ParentCreated {
        outcome = migrate_legacy_record(legacy, current)?;
    }
    debug!(?outcome, "legacy record migration");
    Ok(outcome)
}

/// Unlock the store, trying the PIN cache before asking for a PIN.
///
/// For a logged-in account the stored user key must decrypt under the
/// unlocked config key; if it does not, the store is locked again.
pub fn unlock(store: &CredentialStore) -> Result<(), KeyholdError> {
    if !store.is_locked() {
        debug!("credential store has no PIN or is already unlocked");
        return Ok(());
    }
    unlock_with_pin(store)?;
    check_account_key(store)
}

fn check_account_key(store: &CredentialStore) -> Result<(), KeyholdError> {
    if !store.is_logged_in() {
        return Ok(());
    }
    match store.user_symmetric_key() {
        Ok(_) => Ok(()),
        Err(e) => {
            warn!(error = %e, "user key does not decrypt, locking again");
            store.lock();
            Err(e)
        }
    }
}

fn unlock_with_pin(store: &CredentialStore) -> Result<(), KeyholdError> {
    if store.try_unlock_cached()? {
        info!("credential store unlocked from PIN cache");
        return Ok(());
    }

    // A PIN from the environment cannot change between attempts.
    let retries = if std::env::var_os(PIN_ENV_VAR).is_some() {
        1
    } else {
        MAX_PIN_ATTEMPTS
    };

    for attempt in 1..=retries {
        let pin = get_pin()?;
        match store.unlock(&pin) {
            Ok(()) => {
                info!("credential store unlocked");
                return Ok(());
            }
            Err(KeyholdError::InvalidPin) if attempt < retries => {
                warn!(attempt, "wrong PIN");
                eprintln!("wrong PIN, try again");
            }
            Err(e) => return Err(e),
        }
    }
    Err(KeyholdError::InvalidPin)
}
