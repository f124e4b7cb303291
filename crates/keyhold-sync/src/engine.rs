// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Full and incremental synchronization of the vault.
//!
//! [`SyncEngine::full_sync`] rebuilds the vault from one remote snapshot;
//! [`SyncEngine::apply_event`] applies a single push event. Both take the
//! same write gate, so a resync never interleaves with an incremental
//! update.

use std::collections::HashMap;
use std::sync::Arc;

use keyhold_core::traits::AuthResponse;
use keyhold_core::types::{ItemMeta, LoginItem, SecureNoteItem, SshKeyItem};
use keyhold_core::{
    ApprovalPrompt, Cipher, CipherKind, Decision, EventKind, ItemKeyring, KeyholdError,
    NotificationEvent, PresenceCheck, Sensitive, VaultApi, VaultItem,
};
use keyhold_credentials::CredentialStore;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::vault::VaultState;

/// What applying one event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Upserted(String),
    Deleted(String),
    /// A full resync ran; carries the number of items materialized.
    Resynced(usize),
    /// The auth-request flow was started in the background.
    AuthRequestRouted,
    /// The event was recognized but has no effect on the vault.
    Ignored,
    /// The remote ended the session. The caller must wipe and exit.
    Logout,
}

/// The external collaborators the engine talks to.
pub struct Collaborators {
    pub api: Arc<dyn VaultApi>,
    pub keyring: Arc<dyn ItemKeyring>,
    pub approval: Arc<dyn ApprovalPrompt>,
    pub presence: Arc<dyn PresenceCheck>,
}

pub struct SyncEngine {
    api: Arc<dyn VaultApi>,
    keyring: Arc<dyn ItemKeyring>,
    approval: Arc<dyn ApprovalPrompt>,
    presence: Arc<dyn PresenceCheck>,
    store: Arc<CredentialStore>,
    vault: Arc<VaultState>,
    org_keys: RwLock<HashMap<String, String>>,
    write_gate: Mutex<()>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("vault", &self.vault)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    pub fn new(
        collaborators: Collaborators,
        store: Arc<CredentialStore>,
        vault: Arc<VaultState>,
    ) -> Self {
        Self {
            api: collaborators.api,
            keyring: collaborators.keyring,
            approval: collaborators.approval,
            presence: collaborators.presence,
            store,
            vault,
            org_keys: RwLock::new(HashMap::new()),
            write_gate: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn vault(&self) -> &Arc<VaultState> {
        &self.vault
    }

    /// Organization id to organization key, as of the last full sync.
    pub async fn org_keys(&self) -> HashMap<String, String> {
        self.org_keys.read().await.clone()
    }

    fn access_token(&self) -> Result<String, KeyholdError> {
        match self.store.token()? {
            Some(token) if !token.access_token.is_empty() => Ok(token.access_token),
            _ => Err(KeyholdError::NotLoggedIn),
        }
    }

    /// Pull the whole remote snapshot and rebuild the vault from it.
    ///
    /// Returns the number of items materialized. Items that fail to open
    /// are logged and skipped. Running it twice over the same snapshot
    /// yields the same vault.
    pub async fn full_sync(&self) -> Result<usize, KeyholdError> {
        let _gate = self.write_gate.lock().await;
        self.full_sync_locked().await
    }

    async fn full_sync_locked(&self) -> Result<usize, KeyholdError> {
        info!("performing full sync");
        let token = self.access_token()?;
        let snapshot = self.api.fetch_snapshot(&token).await?;

        let org_keys: HashMap<String, String> = snapshot
            .profile
            .organizations
            .iter()
            .filter_map(|org| org.key.clone().map(|key| (org.id.clone(), key)))
            .collect();
        debug!(count = org_keys.len(), "organization keys read");
        *self.org_keys.write().await = org_keys;

        self.vault.clear().await;
        self.vault.mark_synced_now();

        let mut materialized = 0;
        for cipher in &snapshot.ciphers {
            match self.materialize(cipher) {
                Ok(Some(item)) => {
                    self.vault.upsert(item).await?;
                    materialized += 1;
                }
                Ok(None) => {}
                Err(e) => warn!(id = %cipher.id, error = %e, "skipping item that failed to open"),
            }
        }

        info!(
            items = materialized,
            total = snapshot.ciphers.len(),
            "full sync complete"
        );
        Ok(materialized)
    }

    /// Apply one push event.
    ///
    /// Errors are per-event: the caller logs them and keeps reading. The
    /// vault is never left half-updated by a failed event.
    pub async fn apply_event(
        self: &Arc<Self>,
        event: &NotificationEvent,
    ) -> Result<EventOutcome, KeyholdError> {
        debug!(kind = %event.kind, id = %event.id, "applying event");
        match event.kind {
            EventKind::CipherCreate | EventKind::CipherUpdate => {
                let id = required_id(event)?;
                let _gate = self.write_gate.lock().await;
                self.refresh_item(id).await
            }
            EventKind::CipherDelete | EventKind::LoginDelete => {
                let id = required_id(event)?;
                let _gate = self.write_gate.lock().await;
                let existed = self.vault.remove(id).await?;
                info!(id, existed, "vault item deleted");
                Ok(EventOutcome::Deleted(id.to_string()))
            }
            EventKind::SyncCiphers | EventKind::SyncVault => {
                warn!(kind = %event.kind, "resync requested by remote");
                Ok(EventOutcome::Resynced(self.full_sync().await?))
            }
            EventKind::Logout => {
                warn!("logout received from remote");
                Ok(EventOutcome::Logout)
            }
            EventKind::AuthRequest => {
                let id = required_id(event)?.to_string();
                info!(id = %id, "auth request received");
                let engine = Arc::clone(self);
                tokio::spawn(async move {
                    if let Err(e) = engine.handle_auth_request(&id).await {
                        error!(id = %id, error = %e, "auth request flow failed");
                    }
                });
                Ok(EventOutcome::AuthRequestRouted)
            }
            EventKind::AuthRequestResponse => {
                info!(id = %event.id, "auth request response received");
                Ok(EventOutcome::Ignored)
            }
            EventKind::FolderCreate | EventKind::FolderUpdate | EventKind::FolderDelete => {
                warn!(kind = %event.kind, "folders are not supported");
                Ok(EventOutcome::Ignored)
            }
            EventKind::SendCreate | EventKind::SendUpdate | EventKind::SendDelete => {
                warn!(kind = %event.kind, "sends are not supported");
                Ok(EventOutcome::Ignored)
            }
            EventKind::OrgKeys | EventKind::Settings => {
                warn!(kind = %event.kind, "organizations and settings are not supported");
                Ok(EventOutcome::Ignored)
            }
        }
    }

    async fn refresh_item(&self, id: &str) -> Result<EventOutcome, KeyholdError> {
        let token = self.access_token()?;
        let cipher = self.api.fetch_cipher(&token, id).await?;

        if cipher.is_deleted() {
            info!(id, "item moved to trash");
            self.vault.remove(id).await?;
            return Ok(EventOutcome::Deleted(id.to_string()));
        }

        match self.materialize(&cipher)? {
            Some(item) => {
                self.vault.upsert(item).await?;
                self.vault.mark_synced_now();
                Ok(EventOutcome::Upserted(id.to_string()))
            }
            None => {
                debug!(id, "item kind not materialized");
                Ok(EventOutcome::Ignored)
            }
        }
    }

    /// Run the approval flow for one passwordless-login request.
    ///
    /// Nothing is posted unless the user approves AND the presence check
    /// passes. A failure anywhere before the post counts as a denial.
    pub async fn handle_auth_request(&self, id: &str) -> Result<Decision, KeyholdError> {
        let token = self.access_token()?;
        let request = self.api.fetch_auth_request(&token, id).await?;
        info!(
            id,
            ip = %request.request_ip_address,
            device_type = %request.request_device_type,
            "auth request details"
        );

        if !self.approval.request_approval(&request).await.is_approved() {
            info!(id, "auth request denied");
            return Ok(Decision::Denied);
        }
        if !self.presence.verify_presence().await {
            info!(id, "auth request denied, presence check failed");
            return Ok(Decision::Denied);
        }

        let key = self.keyring.seal_account_key_for(&request.public_key)?;
        let response = AuthResponse {
            request_id: request.id.clone(),
            key,
            device_identifier: self.store.device_id(),
            request_approved: true,
        };
        self.api.post_auth_response(&token, &response).await?;
        info!(id, "auth request approved");
        Ok(Decision::Approved)
    }

    /// Turn a remote cipher into a vault item.
    ///
    /// Organization-owned items and kinds the agent does not hold (cards,
    /// identities, unknown codes) yield `None`.
    fn materialize(&self, cipher: &Cipher) -> Result<Option<VaultItem>, KeyholdError> {
        if cipher.organization_id.is_some() {
            return Ok(None);
        }

        let meta = ItemMeta {
            id: cipher.id.clone(),
            name: self
                .open_optional(&cipher.name)?
                .map(|name| name.expose().to_string())
                .unwrap_or_default(),
            revision_date: cipher.revision_date,
            deleted_date: cipher.deleted_date,
        };

        let item = match cipher.kind {
            CipherKind::Login => {
                let login = cipher.login.clone().unwrap_or_default();
                let mut uris = Vec::with_capacity(login.uris.len());
                for uri in &login.uris {
                    if let Some(opened) = self.open_optional(&uri.uri)? {
                        uris.push(opened.expose().to_string());
                    }
                }
                VaultItem::Login(LoginItem {
                    meta,
                    username: self
                        .open_optional(&login.username)?
                        .map(|u| u.expose().to_string()),
                    password: self.open_optional(&login.password)?,
                    totp: self.open_optional(&login.totp)?,
                    uris,
                })
            }
            CipherKind::SecureNote => VaultItem::SecureNote(SecureNoteItem {
                notes: self.open_optional(&cipher.notes)?,
                meta,
            }),
            CipherKind::SshKey => {
                let Some(ssh) = &cipher.ssh_key else {
                    return Err(KeyholdError::Decode(format!(
                        "ssh key item {} has no key material",
                        cipher.id
                    )));
                };
                let Some(private_key) = self.open_optional(&ssh.private_key)? else {
                    return Err(KeyholdError::Decode(format!(
                        "ssh key item {} has no private key",
                        cipher.id
                    )));
                };
                VaultItem::SshKey(SshKeyItem {
                    meta,
                    public_key: self.open_plain(&ssh.public_key)?,
                    private_key,
                    fingerprint: self.open_plain(&ssh.key_fingerprint)?,
                })
            }
            CipherKind::Card | CipherKind::Identity | CipherKind::Other(_) => return Ok(None),
        };
        Ok(Some(item))
    }

    fn open_optional(&self, field: &Option<String>) -> Result<Option<Sensitive>, KeyholdError> {
        match field.as_deref() {
            Some(protected) if !protected.is_empty() => {
                self.keyring.open_field(protected).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn open_plain(&self, field: &Option<String>) -> Result<String, KeyholdError> {
        Ok(self
            .open_optional(field)?
            .map(|value| value.expose().to_string())
            .unwrap_or_default())
    }
}

fn required_id(event: &NotificationEvent) -> Result<&str, KeyholdError> {
    event
        .affected_id()
        .ok_or_else(|| KeyholdError::Decode(format!("{} event carries no id", event.kind)))
}
