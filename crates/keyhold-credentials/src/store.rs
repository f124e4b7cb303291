// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The credential store and its lock state machine.
//!
//! The store owns the config record and the config key. Lock state is not
//! stored: the store is locked exactly when the key buffer is all-zero and
//! the record carries a key hash. A record without a hash (first run, or
//! after a purge) is always unlocked.
//!
//! Every read-modify-write of the record or the key runs under one mutex.
//! Argon2 derivations are slow, so they run outside it; the caller re-checks
//! the record afterwards and refuses to install a key for a record that
//! changed underneath it.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use keyhold_core::{KeyholdError, LoginToken};
use secrecy::{ExposeSecret, SecretSlice, SecretString};
use strum::IntoEnumIterator;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto;
use crate::guarded::{GuardedBuffer, KEY_LEN};
use crate::kdf::KdfParams;
use crate::pin_cache::PinCache;
use crate::record::{ConfigRecord, RuntimeFlags};

/// Lock-state transitions, broadcast to anyone who subscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEvent {
    Unlocked,
    Locked,
    Purged,
}

/// The encrypted fields of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum SecretField {
    Token,
    ClientId,
    ClientSecret,
    UserSymmetricKey,
    MasterPasswordHash,
    MasterKey,
}

impl SecretField {
    fn slot(self, record: &ConfigRecord) -> &String {
        match self {
            SecretField::Token => &record.encrypted_token,
            SecretField::ClientId => &record.encrypted_client_id,
            SecretField::ClientSecret => &record.encrypted_client_secret,
            SecretField::UserSymmetricKey => &record.encrypted_user_symmetric_key,
            SecretField::MasterPasswordHash => &record.encrypted_master_password_hash,
            SecretField::MasterKey => &record.encrypted_master_key,
        }
    }

    fn slot_mut(self, record: &mut ConfigRecord) -> &mut String {
        match self {
            SecretField::Token => &mut record.encrypted_token,
            SecretField::ClientId => &mut record.encrypted_client_id,
            SecretField::ClientSecret => &mut record.encrypted_client_secret,
            SecretField::UserSymmetricKey => &mut record.encrypted_user_symmetric_key,
            SecretField::MasterPasswordHash => &mut record.encrypted_master_password_hash,
            SecretField::MasterKey => &mut record.encrypted_master_key,
        }
    }
}

/// How a store is opened.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Where the record lives.
    pub record_path: PathBuf,
    /// Write the record on every change. `false` keeps it in memory only.
    pub persist: bool,
    /// Pin the key buffer in RAM.
    pub hardened_memory: bool,
    /// Argon2 cost. Anything other than [`KdfParams::CONTRACT`] is for tests.
    pub kdf: KdfParams,
    /// How long an accepted PIN stays available for silent re-unlock.
    pub pin_cache_ttl: Duration,
}

impl StoreOptions {
    pub fn new(record_path: impl Into<PathBuf>) -> Self {
        Self {
            record_path: record_path.into(),
            persist: true,
            hardened_memory: true,
            kdf: KdfParams::CONTRACT,
            pin_cache_ttl: Duration::from_secs(300),
        }
    }
}

struct Inner {
    record: ConfigRecord,
    key: GuardedBuffer,
}

impl Inner {
    fn is_locked(&self) -> bool {
        self.key.is_zero() && !self.record.config_key_hash.is_empty()
    }

    fn ensure_unlocked(&self) -> Result<(), KeyholdError> {
        if self.is_locked() {
            Err(KeyholdError::ConfigLocked)
        } else {
            Ok(())
        }
    }
}

/// The persisted config record plus the config key that unlocks it.
pub struct CredentialStore {
    inner: Mutex<Inner>,
    path: PathBuf,
    kdf: KdfParams,
    pin_cache: PinCache,
    events: broadcast::Sender<LockEvent>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("path", &self.path)
            .field("locked", &self.is_locked())
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl CredentialStore {
    /// Open the record at `options.record_path`, or start a fresh one if no
    /// file exists yet. The store starts locked whenever the record has a
    /// key hash.
    pub fn open(options: StoreOptions) -> Result<Self, KeyholdError> {
        let mut record = match ConfigRecord::load(&options.record_path)? {
            Some(record) => {
                info!(path = %options.record_path.display(), "config record loaded");
                record
            }
            None => {
                info!(path = %options.record_path.display(), "no config record found, starting fresh");
                ConfigRecord::fresh()
            }
        };
        let assigned = record.ensure_device_id();
        let store = Self::with_record(record, options);
        if assigned {
            let inner = store.inner();
            store.persist(&inner.record)?;
            info!(device_id = %inner.record.device_uuid, "assigned missing device id");
        }
        Ok(store)
    }

    /// Wrap an already-loaded record.
    pub fn with_record(mut record: ConfigRecord, options: StoreOptions) -> Self {
        record.ensure_device_id();
        record.runtime = RuntimeFlags {
            do_not_persist: !options.persist,
            hardened_memory: options.hardened_memory,
        };
        let key = GuardedBuffer::zeroed(options.hardened_memory);
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Mutex::new(Inner { record, key }),
            path: options.record_path,
            kdf: options.kdf,
            pin_cache: PinCache::new(options.pin_cache_ttl),
            events,
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, record: &ConfigRecord) -> Result<(), KeyholdError> {
        if record.runtime.do_not_persist {
            return Ok(());
        }
        record.write_to(&self.path)
    }

    fn notify(&self, event: LockEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LockEvent> {
        self.events.subscribe()
    }

    pub fn record_path(&self) -> &Path {
        &self.path
    }

    pub fn is_locked(&self) -> bool {
        self.inner().is_locked()
    }

    /// Whether a PIN has been configured.
    pub fn has_pin(&self) -> bool {
        !self.inner().record.config_key_hash.is_empty()
    }

    /// Whether an account is set up, judged by the stored master password hash.
    pub fn is_logged_in(&self) -> bool {
        !self.inner().record.encrypted_master_password_hash.is_empty()
    }

    pub fn device_id(&self) -> String {
        self.inner().record.device_uuid.clone()
    }

    pub fn api_url(&self) -> String {
        self.inner().record.api_url.clone()
    }

    pub fn identity_url(&self) -> String {
        self.inner().record.identity_url.clone()
    }

    pub fn notifications_url(&self) -> String {
        self.inner().record.notifications_url.clone()
    }

    pub fn vault_url(&self) -> String {
        self.inner().record.vault_url.clone()
    }

    /// Point the store at a different server. Endpoints are not secret, so
    /// this works while locked.
    pub fn set_endpoints(
        &self,
        api_url: &str,
        identity_url: &str,
        notifications_url: &str,
    ) -> Result<(), KeyholdError> {
        let mut inner = self.inner();
        let mut next = inner.record.clone();
        next.api_url = api_url.to_string();
        next.identity_url = identity_url.to_string();
        next.notifications_url = notifications_url.to_string();
        self.persist(&next)?;
        inner.record = next;
        Ok(())
    }

    /// Derive the key for `pin` and compare its hash against the record.
    /// Returns the key on a match.
    ///
    /// A derivation failure (an unusable device id in a damaged record)
    /// counts as a mismatch, so callers see the same outcome as a wrong PIN.
    fn derive_matching(
        &self,
        pin: &SecretString,
        device_id: &str,
        expected_hash: &str,
    ) -> Option<Zeroizing<[u8; KEY_LEN]>> {
        let key = match self.kdf.derive(pin.expose_secret().as_bytes(), device_id) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "config key derivation failed");
                return None;
            }
        };
        let hash = crypto::key_hash(&key);
        crypto::constant_time_eq(hash.as_bytes(), expected_hash.as_bytes()).then_some(key)
    }

    /// Unlock with `pin`. A no-op when already unlocked.
    pub fn unlock(&self, pin: &SecretString) -> Result<(), KeyholdError> {
        let (device_id, expected_hash) = {
            let inner = self.inner();
            if !inner.is_locked() {
                return Ok(());
            }
            (
                inner.record.device_uuid.clone(),
                inner.record.config_key_hash.clone(),
            )
        };

        let Some(key) = self.derive_matching(pin, &device_id, &expected_hash) else {
            warn!("unlock rejected");
            return Err(KeyholdError::InvalidPin);
        };

        {
            let mut inner = self.inner();
            if !inner.is_locked() {
                return Ok(());
            }
            if inner.record.device_uuid != device_id || inner.record.config_key_hash != expected_hash {
                warn!("config record changed during unlock");
                return Err(KeyholdError::InvalidPin);
            }
            inner.key.replace(&key);
        }

        self.pin_cache.store(pin.expose_secret());
        info!("credential store unlocked");
        self.notify(LockEvent::Unlocked);
        Ok(())
    }

    /// Unlock with the cached PIN, if one is still cached.
    ///
    /// Returns `Ok(true)` when the store is unlocked afterwards.
    pub fn try_unlock_cached(&self) -> Result<bool, KeyholdError> {
        if !self.is_locked() {
            return Ok(true);
        }
        let Some(pin) = self.pin_cache.get() else {
            return Ok(false);
        };
        match self.unlock(&pin) {
            Ok(()) => Ok(true),
            Err(KeyholdError::InvalidPin) => {
                self.pin_cache.clear();
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Check `pin` without touching lock state.
    pub fn verify_pin(&self, pin: &SecretString) -> Result<bool, KeyholdError> {
        let (device_id, expected_hash) = {
            let inner = self.inner();
            (
                inner.record.device_uuid.clone(),
                inner.record.config_key_hash.clone(),
            )
        };
        Ok(self.derive_matching(pin, &device_id, &expected_hash).is_some())
    }

    /// Zero the config key. A no-op when already locked.
    pub fn lock(&self) {
        {
            let mut inner = self.inner();
            if inner.is_locked() {
                return;
            }
            inner.key.wipe();
        }
        info!("credential store locked");
        self.notify(LockEvent::Locked);
    }

    /// Forget every secret and the PIN. Irreversible.
    pub fn purge(&self) -> Result<(), KeyholdError> {
        {
            let mut inner = self.inner();
            inner.record.clear_secrets();
            inner.key.wipe();
            self.persist(&inner.record)?;
        }
        self.pin_cache.clear();
        warn!("credential store purged");
        self.notify(LockEvent::Purged);
        Ok(())
    }

    /// Zero the key and the PIN cache without touching the record. Used on
    /// every exit path.
    pub fn wipe(&self) {
        self.inner().key.wipe();
        self.pin_cache.clear();
        debug!("key material wiped");
    }

    /// Re-key the store under `new_pin`.
    ///
    /// The replacement record (new hash plus every field re-encrypted) is
    /// built aside and written to disk first; only then are the record and
    /// key swapped in memory. A failed write leaves both disk and memory on
    /// the old key. Fields that no longer decrypt under the old key are
    /// dropped rather than carried over.
    pub fn update_pin(&self, new_pin: &SecretString) -> Result<(), KeyholdError> {
        let device_id = {
            let inner = self.inner();
            inner.ensure_unlocked()?;
            inner.record.device_uuid.clone()
        };

        let new_key = self.kdf.derive(new_pin.expose_secret().as_bytes(), &device_id)?;

        {
            let mut inner = self.inner();
            inner.ensure_unlocked()?;
            if inner.record.device_uuid != device_id {
                return Err(KeyholdError::Internal(
                    "device id changed during pin update".to_string(),
                ));
            }

            let mut next = inner.record.clone();
            next.config_key_hash = crypto::key_hash(&new_key);
            for field in SecretField::iter() {
                let current = field.slot(&inner.record);
                if current.is_empty() {
                    continue;
                }
                *field.slot_mut(&mut next) = match crypto::decrypt_field(inner.key.expose(), current) {
                    Ok(plaintext) => crypto::encrypt_field(&new_key, &plaintext)?,
                    Err(e) => {
                        warn!(field = %field, error = %e, "dropping field that no longer decrypts");
                        String::new()
                    }
                };
            }

            self.persist(&next)?;
            inner.record = next;
            inner.key.replace(&new_key);
        }

        self.pin_cache.store(new_pin.expose_secret());
        info!("pin updated");
        Ok(())
    }

    fn read_field(&self, field: SecretField) -> Result<Option<Zeroizing<Vec<u8>>>, KeyholdError> {
        let inner = self.inner();
        inner.ensure_unlocked()?;
        let ciphertext = field.slot(&inner.record);
        if ciphertext.is_empty() {
            return Ok(None);
        }
        crypto::decrypt_field(inner.key.expose(), ciphertext).map(Some)
    }

    fn write_field(&self, field: SecretField, plaintext: &[u8]) -> Result<(), KeyholdError> {
        let mut inner = self.inner();
        inner.ensure_unlocked()?;
        let mut next = inner.record.clone();
        *field.slot_mut(&mut next) = crypto::encrypt_field(inner.key.expose(), plaintext)?;
        self.persist(&next)?;
        inner.record = next;
        debug!(field = %field, "secret field updated");
        Ok(())
    }

    fn read_string(&self, field: SecretField) -> Result<Option<SecretString>, KeyholdError> {
        match self.read_field(field)? {
            Some(bytes) => {
                let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
                    KeyholdError::Decrypt(format!("{field} is not valid UTF-8"))
                })?;
                Ok(Some(SecretString::from(text)))
            }
            None => Ok(None),
        }
    }

    fn read_bytes(&self, field: SecretField) -> Result<Option<SecretSlice<u8>>, KeyholdError> {
        Ok(self
            .read_field(field)?
            .map(|bytes| SecretSlice::from(bytes.to_vec())))
    }

    /// The session token, if one is stored.
    pub fn token(&self) -> Result<Option<LoginToken>, KeyholdError> {
        let Some(json) = self.read_field(SecretField::Token)? else {
            return Ok(None);
        };
        let token = serde_json::from_slice(&json)
            .map_err(|e| KeyholdError::Decrypt(format!("stored token is not valid JSON: {e}")))?;
        Ok(Some(token))
    }

    pub fn set_token(&self, token: &LoginToken) -> Result<(), KeyholdError> {
        let json = Zeroizing::new(
            serde_json::to_vec(token)
                .map_err(|e| KeyholdError::Internal(format!("failed to serialize token: {e}")))?,
        );
        self.write_field(SecretField::Token, &json)
    }

    pub fn client_id(&self) -> Result<Option<SecretString>, KeyholdError> {
        self.read_string(SecretField::ClientId)
    }

    pub fn set_client_id(&self, client_id: &str) -> Result<(), KeyholdError> {
        self.write_field(SecretField::ClientId, client_id.as_bytes())
    }

    pub fn client_secret(&self) -> Result<Option<SecretString>, KeyholdError> {
        self.read_string(SecretField::ClientSecret)
    }

    pub fn set_client_secret(&self, client_secret: &str) -> Result<(), KeyholdError> {
        self.write_field(SecretField::ClientSecret, client_secret.as_bytes())
    }

    pub fn user_symmetric_key(&self) -> Result<Option<SecretSlice<u8>>, KeyholdError> {
        self.read_bytes(SecretField::UserSymmetricKey)
    }

    pub fn set_user_symmetric_key(&self, key: &[u8]) -> Result<(), KeyholdError> {
        self.write_field(SecretField::UserSymmetricKey, key)
    }

    pub fn master_password_hash(&self) -> Result<Option<SecretSlice<u8>>, KeyholdError> {
        self.read_bytes(SecretField::MasterPasswordHash)
    }

    pub fn set_master_password_hash(&self, hash: &[u8]) -> Result<(), KeyholdError> {
        self.write_field(SecretField::MasterPasswordHash, hash)
    }

    pub fn master_key(&self) -> Result<Option<SecretSlice<u8>>, KeyholdError> {
        self.read_bytes(SecretField::MasterKey)
    }

    pub fn set_master_key(&self, key: &[u8]) -> Result<(), KeyholdError> {
        self.write_field(SecretField::MasterKey, key)
    }
}
