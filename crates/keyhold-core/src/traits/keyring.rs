// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account keyring interface.

use crate::error::KeyholdError;
use crate::types::Sensitive;

/// The unlocked account keyring.
///
/// Item fields arrive from the remote service protected under the account
/// key; the keyring opens them one at a time while items are materialized.
pub trait ItemKeyring: Send + Sync + 'static {
    /// Open one protected item field.
    fn open_field(&self, protected: &str) -> Result<Sensitive, KeyholdError>;

    /// Seal the account key to the public key of a requesting device.
    fn seal_account_key_for(&self, request_public_key: &str) -> Result<String, KeyholdError>;
}
