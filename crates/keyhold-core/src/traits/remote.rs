// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote vault service interface.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::KeyholdError;
use crate::types::{AuthRequest, Cipher, SyncData};

/// Body of an auth-request approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(skip)]
    pub request_id: String,
    /// Account key sealed for the requesting device.
    pub key: String,
    pub device_identifier: String,
    pub request_approved: bool,
}

/// Authenticated access to the remote vault service.
///
/// Every failure is reported as [`KeyholdError::RemoteFetch`] so callers can
/// drop the triggering event and leave local state untouched.
#[async_trait]
pub trait VaultApi: Send + Sync + 'static {
    /// Fetch the complete remote snapshot (profile, organizations, items).
    async fn fetch_snapshot(&self, access_token: &str) -> Result<SyncData, KeyholdError>;

    /// Fetch the current state of one item.
    async fn fetch_cipher(&self, access_token: &str, id: &str) -> Result<Cipher, KeyholdError>;

    /// Fetch the details of a pending passwordless-login request.
    async fn fetch_auth_request(
        &self,
        access_token: &str,
        id: &str,
    ) -> Result<AuthRequest, KeyholdError>;

    /// Post an approval for a pending passwordless-login request.
    async fn post_auth_response(
        &self,
        access_token: &str,
        response: &AuthResponse,
    ) -> Result<(), KeyholdError>;
}
