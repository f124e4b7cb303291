// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The persisted config record.
//!
//! One JSON document holding service endpoints, the device identifier, the
//! config-key hash and the encrypted secret fields. Every `Encrypted*` field
//! is either empty or a base64 envelope sealed under the current config key.

use std::io::Write;
use std::path::Path;

use keyhold_core::KeyholdError;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_IDENTITY_URL: &str = "https://identity.bitwarden.com";
pub const DEFAULT_API_URL: &str = "https://api.bitwarden.com";
pub const DEFAULT_NOTIFICATIONS_URL: &str = "https://notifications.bitwarden.com";
pub const DEFAULT_VAULT_URL: &str = "https://vault.bitwarden.com";

/// Flags that only exist in memory. Never serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeFlags {
    /// Keep the record in memory only; writes become no-ops.
    pub do_not_persist: bool,
    /// Pin key buffers in RAM.
    pub hardened_memory: bool,
}

/// The on-disk config record.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigRecord {
    #[serde(default)]
    pub identity_url: String,
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub notifications_url: String,
    #[serde(default)]
    pub vault_url: String,
    #[serde(default, rename = "EncryptedClientID")]
    pub encrypted_client_id: String,
    #[serde(default)]
    pub encrypted_client_secret: String,
    #[serde(default, rename = "DeviceUUID")]
    pub device_uuid: String,
    #[serde(default)]
    pub config_key_hash: String,
    #[serde(default)]
    pub encrypted_token: String,
    #[serde(default)]
    pub encrypted_user_symmetric_key: String,
    #[serde(default)]
    pub encrypted_master_password_hash: String,
    #[serde(default)]
    pub encrypted_master_key: String,
    #[serde(skip)]
    pub runtime: RuntimeFlags,
}

impl std::fmt::Debug for ConfigRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigRecord")
            .field("identity_url", &self.identity_url)
            .field("api_url", &self.api_url)
            .field("notifications_url", &self.notifications_url)
            .field("vault_url", &self.vault_url)
            .field("device_uuid", &self.device_uuid)
            .field("has_pin", &!self.config_key_hash.is_empty())
            .field("has_token", &!self.encrypted_token.is_empty())
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}

impl ConfigRecord {
    /// A first-run record: public endpoints, a new device id, no secrets.
    pub fn fresh() -> Self {
        Self {
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            notifications_url: DEFAULT_NOTIFICATIONS_URL.to_string(),
            vault_url: DEFAULT_VAULT_URL.to_string(),
            device_uuid: uuid::Uuid::new_v4().to_string(),
            ..Self::default()
        }
    }

    /// Give a record without a device id a fresh one. Only done while no
    /// key hash exists, since the id salts the config key.
    ///
    /// Returns `true` when an id was assigned.
    pub fn ensure_device_id(&mut self) -> bool {
        if !self.device_uuid.is_empty() || !self.config_key_hash.is_empty() {
            return false;
        }
        self.device_uuid = uuid::Uuid::new_v4().to_string();
        true
    }

    /// Read a record from `path`. A missing file is `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, KeyholdError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(KeyholdError::storage(e)),
        };
        let record = serde_json::from_slice(&bytes).map_err(|e| {
            KeyholdError::Config(format!("unreadable config record {}: {e}", path.display()))
        })?;
        Ok(Some(record))
    }

    /// Replace the file at `path` with this record.
    ///
    /// The JSON is written to a temporary file in the same directory and
    /// renamed over the target, so readers see either the old or the new
    /// record in full. The parent directory is created with mode 0700 and
    /// the file ends up 0600.
    pub fn write_to(&self, path: &Path) -> Result<(), KeyholdError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| KeyholdError::Internal(format!("failed to serialize config record: {e}")))?;

        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        if !parent.exists() {
            create_private_dir(parent)?;
        }

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(KeyholdError::storage)?;
        tmp.write_all(&json).map_err(KeyholdError::storage)?;
        tmp.as_file().sync_all().map_err(KeyholdError::storage)?;
        tmp.persist(path).map_err(|e| KeyholdError::storage(e.error))?;

        debug!(path = %path.display(), "config record written");
        Ok(())
    }

    /// Empty every encrypted field and the key hash.
    pub fn clear_secrets(&mut self) {
        self.config_key_hash.clear();
        self.encrypted_client_id.clear();
        self.encrypted_client_secret.clear();
        self.encrypted_token.clear();
        self.encrypted_user_symmetric_key.clear();
        self.encrypted_master_password_hash.clear();
        self.encrypted_master_key.clear();
    }
}

#[cfg(unix)]
pub(crate) fn create_private_dir(dir: &Path) -> Result<(), KeyholdError> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
        .map_err(KeyholdError::storage)
}

#[cfg(not(unix))]
pub(crate) fn create_private_dir(dir: &Path) -> Result<(), KeyholdError> {
    std::fs::create_dir_all(dir).map_err(KeyholdError::storage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_record_has_endpoints_and_device_id() {
        let record = ConfigRecord::fresh();
        assert_eq!(record.api_url, DEFAULT_API_URL);
        assert_eq!(record.notifications_url, DEFAULT_NOTIFICATIONS_URL);
        assert!(uuid::Uuid::parse_str(&record.device_uuid).is_ok());
        assert!(record.config_key_hash.is_empty());
        assert_ne!(ConfigRecord::fresh().device_uuid, record.device_uuid);
    }

    #[test]
    fn device_id_is_only_assigned_before_a_pin_exists() {
        let mut record = ConfigRecord::default();
        assert!(record.ensure_device_id());
        assert!(uuid::Uuid::parse_str(&record.device_uuid).is_ok());
        assert!(!record.ensure_device_id());

        let mut keyed = ConfigRecord {
            config_key_hash: "ab".into(),
            ..ConfigRecord::default()
        };
        assert!(!keyed.ensure_device_id());
        assert!(keyed.device_uuid.is_empty());
    }

    #[test]
    fn json_uses_pascal_case_keys() {
        let mut record = ConfigRecord::fresh();
        record.encrypted_client_id = "abc".into();
        record.runtime.do_not_persist = true;
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("DeviceUUID").is_some());
        assert!(json.get("EncryptedClientID").is_some());
        assert!(json.get("ConfigKeyHash").is_some());
        assert!(json.get("EncryptedMasterPasswordHash").is_some());
        assert!(json.get("Runtime").is_none());
    }

    #[test]
    fn write_then_load_preserves_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("keyhold.json");
        let mut record = ConfigRecord::fresh();
        record.encrypted_token = "c2VhbGVk".into();

        record.write_to(&path).unwrap();
        let loaded = ConfigRecord::load(&path).unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[cfg(unix)]
    #[test]
    fn written_file_and_dir_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("keyhold");
        let path = parent.join("keyhold.json");
        ConfigRecord::fresh().write_to(&path).unwrap();

        let file_mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        let dir_mode = std::fs::metadata(&parent).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn rewrite_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyhold.json");
        let mut record = ConfigRecord::fresh();
        record.encrypted_master_key = "x".repeat(4096);
        record.write_to(&path).unwrap();

        record.encrypted_master_key.clear();
        record.write_to(&path).unwrap();
        let loaded = ConfigRecord::load(&path).unwrap().unwrap();
        assert!(loaded.encrypted_master_key.is_empty());
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConfigRecord::load(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn garbage_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyhold.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(
            ConfigRecord::load(&path),
            Err(KeyholdError::Config(_))
        ));
    }

    #[test]
    fn clear_secrets_keeps_endpoints() {
        let mut record = ConfigRecord::fresh();
        record.config_key_hash = "hash".into();
        record.encrypted_token = "tok".into();
        record.clear_secrets();
        assert!(record.config_key_hash.is_empty());
        assert!(record.encrypted_token.is_empty());
        assert_eq!(record.api_url, DEFAULT_API_URL);
    }
}
