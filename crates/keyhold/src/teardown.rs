// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiping in-memory secrets on the way out.
//!
//! `std::process::exit` skips destructors, so every exit path calls
//! [`wipe_secrets`] explicitly before leaving.

use keyhold_credentials::CredentialStore;
use keyhold_sync::VaultState;
use tracing::{debug, info};

/// Drop every decrypted vault item and zero the config key and PIN cache.
/// The record on disk is left as is.
pub async fn wipe_secrets(store: &CredentialStore, vault: &VaultState) {
    vault.clear().await;
    store.wipe();
    debug!("in-memory secrets wiped");
}

/// Wipe secrets and terminate the process with `code`.
pub async fn secure_exit(store: &CredentialStore, vault: &VaultState, code: i32) -> ! {
    wipe_secrets(store, vault).await;
    info!(code, "exiting");
    std::process::exit(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyhold_test_utils::{PrefixKeyring, TestHarness};
    use keyhold_core::{Cipher, CipherKind, Profile, SyncData};

    #[tokio::test]
    async fn wipe_clears_vault_and_locks_store() {
        let harness = TestHarness::builder().with_pin().build().unwrap();
        harness
            .api
            .set_snapshot(SyncData {
                profile: Profile::default(),
                ciphers: vec![Cipher {
                    id: "n1".to_string(),
                    kind: CipherKind::SecureNote,
                    organization_id: None,
                    name: Some(PrefixKeyring::protect("note")),
                    notes: Some(PrefixKeyring::protect("secret body")),
                    login: None,
                    ssh_key: None,
                    revision_date: None,
                    deleted_date: None,
                }],
            })
            .await;
        harness.engine.full_sync().await.unwrap();
        assert_eq!(harness.vault.len().await.unwrap(), 1);

        wipe_secrets(&harness.store, &harness.vault).await;
        assert!(harness.store.is_locked());
        assert!(!harness.store.try_unlock_cached().unwrap());

        harness.unlock().unwrap();
        assert!(harness.vault.is_empty().await.unwrap());
    }
}
