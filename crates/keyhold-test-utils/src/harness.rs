// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for sync-path integration tests.
//!
//! `TestHarness` assembles a credential store (fast KDF, temp directory),
//! a vault and a sync engine wired to mock collaborators.

use std::sync::Arc;
use std::time::Duration;

use keyhold_core::{Decision, KeyholdError, LoginToken};
use keyhold_credentials::{CredentialStore, KdfParams, StoreOptions};
use keyhold_sync::{Collaborators, SyncEngine, VaultState};
use secrecy::SecretString;

use crate::mock_api::MockVaultApi;
use crate::mock_approval::{PrefixKeyring, ScriptedApproval, StaticPresence};

/// Access token stored by a logged-in harness.
pub const TEST_ACCESS_TOKEN: &str = "test-access-token";

/// PIN set when the harness is built with a PIN.
pub const TEST_PIN: &str = "1234";

/// Cheapest Argon2 cost the crate accepts.
const FAST_KDF: KdfParams = KdfParams::explicit(8, 1, 1);

/// Builder for test environments.
pub struct TestHarnessBuilder {
    logged_in: bool,
    pin: bool,
    persist: bool,
    presence: bool,
    decisions: Vec<Decision>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            logged_in: true,
            pin: false,
            persist: false,
            presence: true,
            decisions: Vec::new(),
        }
    }

    /// Store no session token (the agent is not logged in).
    pub fn logged_out(mut self) -> Self {
        self.logged_in = false;
        self
    }

    /// Protect the store with [`TEST_PIN`]. It is left unlocked.
    pub fn with_pin(mut self) -> Self {
        self.pin = true;
        self
    }

    /// Write the record to the harness temp directory.
    pub fn persisted(mut self) -> Self {
        self.persist = true;
        self
    }

    /// Answer of the presence check.
    pub fn with_presence(mut self, present: bool) -> Self {
        self.presence = present;
        self
    }

    /// Decisions the approval prompt will return, in order.
    pub fn with_decisions(mut self, decisions: Vec<Decision>) -> Self {
        self.decisions = decisions;
        self
    }

    pub fn build(self) -> Result<TestHarness, KeyholdError> {
        let temp_dir = tempfile::TempDir::new().map_err(KeyholdError::storage)?;

        let mut options = StoreOptions::new(temp_dir.path().join("keyhold").join("keyhold.json"));
        options.persist = self.persist;
        options.hardened_memory = false;
        options.kdf = FAST_KDF;
        options.pin_cache_ttl = Duration::from_secs(60);
        let store = Arc::new(CredentialStore::open(options)?);

        if self.logged_in {
            store.set_token(&LoginToken {
                access_token: TEST_ACCESS_TOKEN.to_string(),
                expires_in: 3600,
                token_type: "Bearer".to_string(),
                ..LoginToken::default()
            })?;
            store.set_master_password_hash(b"test-master-password-hash")?;
        }
        if self.pin {
            store.update_pin(&SecretString::from(TEST_PIN.to_string()))?;
        }

        let api = MockVaultApi::new();
        let approval = ScriptedApproval::new(self.decisions);
        let vault = Arc::new(VaultState::new(store.clone()));
        let engine = Arc::new(SyncEngine::new(
            Collaborators {
                api: Arc::new(api.clone()),
                keyring: Arc::new(PrefixKeyring),
                approval: Arc::new(approval.clone()),
                presence: Arc::new(StaticPresence(self.presence)),
            },
            store.clone(),
            vault.clone(),
        ));

        Ok(TestHarness {
            store,
            vault,
            engine,
            api,
            approval,
            _temp_dir: temp_dir,
        })
    }
}

/// Assembled store, vault, engine and their mocks.
pub struct TestHarness {
    pub store: Arc<CredentialStore>,
    pub vault: Arc<VaultState>,
    pub engine: Arc<SyncEngine>,
    pub api: MockVaultApi,
    pub approval: ScriptedApproval,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Unlock with [`TEST_PIN`].
    pub fn unlock(&self) -> Result<(), KeyholdError> {
        self.store.unlock(&SecretString::from(TEST_PIN.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_harness_is_logged_in_and_unlocked() {
        let harness = TestHarness::builder().build().unwrap();
        assert!(harness.store.is_logged_in());
        assert!(!harness.store.is_locked());
        assert!(!harness.store.has_pin());
    }

    #[test]
    fn pinned_harness_locks_and_unlocks() {
        let harness = TestHarness::builder().with_pin().build().unwrap();
        harness.store.lock();
        assert!(harness.store.is_locked());
        harness.unlock().unwrap();
        assert!(!harness.store.is_locked());
    }

    #[test]
    fn logged_out_harness_has_no_token() {
        let harness = TestHarness::builder().logged_out().build().unwrap();
        assert!(!harness.store.is_logged_in());
        assert!(harness.store.token().unwrap().is_none());
    }
}
