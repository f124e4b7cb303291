// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pass-through item keyring.
//!
//! The account keyring (user key, private key, organization keys) belongs to
//! the login layer, which this agent does not ship. Until one is plugged in,
//! fields are taken as delivered by the server and auth requests cannot be
//! approved.

use keyhold_core::{ItemKeyring, KeyholdError, Sensitive};

#[derive(Debug, Default, Clone, Copy)]
pub struct VerbatimKeyring;

impl ItemKeyring for VerbatimKeyring {
    fn open_field(&self, protected: &str) -> Result<Sensitive, KeyholdError> {
        Ok(Sensitive::new(protected))
    }

    fn seal_account_key_for(&self, _request_public_key: &str) -> Result<String, KeyholdError> {
        Err(KeyholdError::Crypto(
            "no account keyring loaded, cannot seal key for requesting device".to_string(),
        ))
    }
}
