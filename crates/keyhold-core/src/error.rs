// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the keyhold agent.

use thiserror::Error;

/// The error type shared by every keyhold crate.
///
/// Everything except [`KeyholdError::LoggedOut`] is recoverable locally:
/// bad frames, bad events and failed fetches are logged and dropped by
/// their callers rather than tearing down the agent.
#[derive(Debug, Error)]
pub enum KeyholdError {
    /// A secret field was accessed while the credential store is locked.
    #[error("credential store is locked")]
    ConfigLocked,

    /// The supplied PIN does not derive the stored config key.
    #[error("invalid PIN")]
    InvalidPin,

    /// Authentication tag mismatch or malformed ciphertext.
    #[error("decryption failed: {0}")]
    Decrypt(String),

    /// A push frame could not be decoded into a known event shape.
    #[error("frame decode failed: {0}")]
    Decode(String),

    /// Push socket read/write failure.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A snapshot, item, or auth-request fetch (or post) failed.
    #[error("remote fetch failed: {message}")]
    RemoteFetch {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No session token is stored; remote calls cannot be authenticated.
    #[error("no session token available")]
    NotLoggedIn,

    /// The remote side ended the session. Irrecoverable by design.
    #[error("session logged out by remote")]
    LoggedOut,

    /// Invalid settings or an unreadable config record.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors while persisting or migrating the record.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Key derivation or randomness failures.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KeyholdError {
    /// Whether the caller may continue after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, KeyholdError::LoggedOut)
    }

    /// Wrap an I/O error as a storage failure.
    pub fn storage(err: std::io::Error) -> Self {
        KeyholdError::Storage {
            source: Box::new(err),
        }
    }
}
