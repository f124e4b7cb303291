// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared types: remote wire models, decrypted vault items, push events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// A string that holds secret material.
///
/// Zeroed on drop; `Debug` never prints the contents.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Sensitive(Zeroizing<String>);

impl Sensitive {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Sensitive {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Debug for Sensitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Bearer credentials obtained from the remote identity service.
///
/// Persisted only as an envelope-encrypted JSON blob inside the config record.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub key: String,
}

impl std::fmt::Debug for LoginToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Remote cipher type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum CipherKind {
    Login,
    SecureNote,
    Card,
    Identity,
    SshKey,
    Other(u8),
}

impl From<u8> for CipherKind {
    fn from(code: u8) -> Self {
        match code {
            1 => CipherKind::Login,
            2 => CipherKind::SecureNote,
            3 => CipherKind::Card,
            4 => CipherKind::Identity,
            5 => CipherKind::SshKey,
            other => CipherKind::Other(other),
        }
    }
}

impl From<CipherKind> for u8 {
    fn from(kind: CipherKind) -> Self {
        match kind {
            CipherKind::Login => 1,
            CipherKind::SecureNote => 2,
            CipherKind::Card => 3,
            CipherKind::Identity => 4,
            CipherKind::SshKey => 5,
            CipherKind::Other(code) => code,
        }
    }
}

/// Login payload of a remote cipher. String fields are still protected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherLogin {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub totp: Option<String>,
    #[serde(default)]
    pub uris: Vec<CipherUri>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherUri {
    #[serde(default)]
    pub uri: Option<String>,
}

/// SSH key payload of a remote cipher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherSshKey {
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub key_fingerprint: Option<String>,
}

/// One remote vault item as served by the sync and cipher endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cipher {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CipherKind,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub login: Option<CipherLogin>,
    #[serde(default)]
    pub ssh_key: Option<CipherSshKey>,
    #[serde(default)]
    pub revision_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_date: Option<DateTime<Utc>>,
}

impl Cipher {
    /// A cipher with a deleted timestamp sits in the remote trash.
    pub fn is_deleted(&self) -> bool {
        self.deleted_date.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub organizations: Vec<Organization>,
}

/// The full remote snapshot returned by the sync endpoint.
///
/// Transient. It is never written to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncData {
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub ciphers: Vec<Cipher>,
}

/// A pending passwordless-login request from another device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub id: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub request_device_type: String,
    #[serde(default)]
    pub request_ip_address: String,
    #[serde(default)]
    pub creation_date: Option<DateTime<Utc>>,
}

/// Outcome of the approval phase of an auth request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Denied,
}

impl Decision {
    pub fn is_approved(self) -> bool {
        matches!(self, Decision::Approved)
    }
}

/// Identity and timestamps common to every materialized item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMeta {
    pub id: String,
    pub name: String,
    pub revision_date: Option<DateTime<Utc>>,
    pub deleted_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginItem {
    pub meta: ItemMeta,
    pub username: Option<String>,
    pub password: Option<Sensitive>,
    pub totp: Option<Sensitive>,
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureNoteItem {
    pub meta: ItemMeta,
    pub notes: Option<Sensitive>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKeyItem {
    pub meta: ItemMeta,
    pub public_key: String,
    pub private_key: Sensitive,
    pub fingerprint: String,
}

/// A decrypted vault item, keyed by its remote id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultItem {
    Login(LoginItem),
    SecureNote(SecureNoteItem),
    SshKey(SshKeyItem),
}

impl VaultItem {
    pub fn meta(&self) -> &ItemMeta {
        match self {
            VaultItem::Login(item) => &item.meta,
            VaultItem::SecureNote(item) => &item.meta,
            VaultItem::SshKey(item) => &item.meta,
        }
    }

    pub fn id(&self) -> &str {
        &self.meta().id
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            VaultItem::Login(_) => "login",
            VaultItem::SecureNote(_) => "secure-note",
            VaultItem::SshKey(_) => "ssh-key",
        }
    }
}

/// Push event type codes as sent by the notification hub.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum EventKind {
    CipherUpdate,
    CipherCreate,
    LoginDelete,
    FolderDelete,
    SyncCiphers,
    SyncVault,
    OrgKeys,
    FolderCreate,
    FolderUpdate,
    CipherDelete,
    Settings,
    Logout,
    SendCreate,
    SendUpdate,
    SendDelete,
    AuthRequest,
    AuthRequestResponse,
}

impl EventKind {
    /// Map a wire code to its event kind. Unknown codes yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        let kind = match code {
            0 => EventKind::CipherUpdate,
            1 => EventKind::CipherCreate,
            2 => EventKind::LoginDelete,
            3 => EventKind::FolderDelete,
            4 => EventKind::SyncCiphers,
            5 => EventKind::SyncVault,
            6 => EventKind::OrgKeys,
            7 => EventKind::FolderCreate,
            8 => EventKind::FolderUpdate,
            9 => EventKind::CipherDelete,
            10 => EventKind::Settings,
            11 => EventKind::Logout,
            12 => EventKind::SendCreate,
            13 => EventKind::SendUpdate,
            14 => EventKind::SendDelete,
            15 => EventKind::AuthRequest,
            16 => EventKind::AuthRequestResponse,
            _ => return None,
        };
        Some(kind)
    }

    pub fn code(self) -> i64 {
        match self {
            EventKind::CipherUpdate => 0,
            EventKind::CipherCreate => 1,
            EventKind::LoginDelete => 2,
            EventKind::FolderDelete => 3,
            EventKind::SyncCiphers => 4,
            EventKind::SyncVault => 5,
            EventKind::OrgKeys => 6,
            EventKind::FolderCreate => 7,
            EventKind::FolderUpdate => 8,
            EventKind::CipherDelete => 9,
            EventKind::Settings => 10,
            EventKind::Logout => 11,
            EventKind::SendCreate => 12,
            EventKind::SendUpdate => 13,
            EventKind::SendDelete => 14,
            EventKind::AuthRequest => 15,
            EventKind::AuthRequestResponse => 16,
        }
    }
}

/// One decoded push message: what happened, and to which id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub kind: EventKind,
    /// Affected item (or auth request) id; empty when the frame carried none.
    pub id: String,
}

impl NotificationEvent {
    pub fn new(kind: EventKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn affected_id(&self) -> Option<&str> {
        if self.id.is_empty() {
            None
        } else {
            Some(&self.id)
        }
    }
}
