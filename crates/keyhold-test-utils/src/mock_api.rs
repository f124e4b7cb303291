// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory remote vault implementing `VaultApi`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use keyhold_core::traits::AuthResponse;
use keyhold_core::{AuthRequest, Cipher, KeyholdError, SyncData, VaultApi};

#[derive(Default)]
struct State {
    snapshot: SyncData,
    snapshot_fails: bool,
    ciphers: HashMap<String, Cipher>,
    auth_requests: HashMap<String, AuthRequest>,
    posted: Vec<AuthResponse>,
    snapshot_calls: usize,
    cipher_calls: Vec<String>,
    tokens_seen: Vec<String>,
}

/// A remote vault that serves whatever the test put into it.
///
/// Unknown cipher or auth-request ids fail with `RemoteFetch`, like a 404.
#[derive(Clone, Default)]
pub struct MockVaultApi {
    state: Arc<Mutex<State>>,
}

impl MockVaultApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_snapshot(&self, snapshot: SyncData) {
        self.state.lock().await.snapshot = snapshot;
    }

    /// Make every snapshot fetch fail until reset.
    pub async fn fail_snapshots(&self, fail: bool) {
        self.state.lock().await.snapshot_fails = fail;
    }

    pub async fn put_cipher(&self, cipher: Cipher) {
        self.state.lock().await.ciphers.insert(cipher.id.clone(), cipher);
    }

    pub async fn remove_cipher(&self, id: &str) {
        self.state.lock().await.ciphers.remove(id);
    }

    pub async fn put_auth_request(&self, request: AuthRequest) {
        self.state
            .lock()
            .await
            .auth_requests
            .insert(request.id.clone(), request);
    }

    /// Auth responses posted so far.
    pub async fn posted_responses(&self) -> Vec<AuthResponse> {
        self.state.lock().await.posted.clone()
    }

    pub async fn snapshot_calls(&self) -> usize {
        self.state.lock().await.snapshot_calls
    }

    /// Ids passed to `fetch_cipher`, in call order.
    pub async fn cipher_calls(&self) -> Vec<String> {
        self.state.lock().await.cipher_calls.clone()
    }

    /// Access tokens presented on every call, in call order.
    pub async fn tokens_seen(&self) -> Vec<String> {
        self.state.lock().await.tokens_seen.clone()
    }
}

fn not_found(what: &str, id: &str) -> KeyholdError {
    KeyholdError::RemoteFetch {
        message: format!("{what} {id} not found"),
        source: None,
    }
}

#[async_trait]
impl VaultApi for MockVaultApi {
    async fn fetch_snapshot(&self, access_token: &str) -> Result<SyncData, KeyholdError> {
        let mut state = self.state.lock().await;
        state.snapshot_calls += 1;
        state.tokens_seen.push(access_token.to_string());
        if state.snapshot_fails {
            return Err(KeyholdError::RemoteFetch {
                message: "snapshot unavailable".to_string(),
                source: None,
            });
        }
        Ok(state.snapshot.clone())
    }

    async fn fetch_cipher(&self, access_token: &str, id: &str) -> Result<Cipher, KeyholdError> {
        let mut state = self.state.lock().await;
        state.cipher_calls.push(id.to_string());
        state.tokens_seen.push(access_token.to_string());
        state
            .ciphers
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("cipher", id))
    }

    async fn fetch_auth_request(
        &self,
        access_token: &str,
        id: &str,
    ) -> Result<AuthRequest, KeyholdError> {
        let mut state = self.state.lock().await;
        state.tokens_seen.push(access_token.to_string());
        state
            .auth_requests
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("auth request", id))
    }

    async fn post_auth_response(
        &self,
        access_token: &str,
        response: &AuthResponse,
    ) -> Result<(), KeyholdError> {
        let mut state = self.state.lock().await;
        state.tokens_seen.push(access_token.to_string());
        state.posted.push(response.clone());
        Ok(())
    }
}
