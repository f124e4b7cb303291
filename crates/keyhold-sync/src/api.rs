// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the remote vault API.
//!
//! Implements [`VaultApi`] over reqwest with bearer authentication. Non-2xx
//! responses become [`KeyholdError::RemoteFetch`] carrying the status and
//! body so callers can log them and move on.
//!
//! Item ids arrive from the push channel, so they are appended as single
//! escaped path segments and can never address another endpoint.

use std::time::Duration;

use async_trait::async_trait;
use keyhold_core::traits::AuthResponse;
use keyhold_core::{AuthRequest, Cipher, KeyholdError, SyncData, VaultApi};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

/// reqwest-backed [`VaultApi`].
#[derive(Debug, Clone)]
pub struct HttpVaultApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpVaultApi {
    /// Client for the API rooted at `base_url` (the record's API URL).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, KeyholdError> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            KeyholdError::Config(format!("invalid API URL `{base_url}`: {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(KeyholdError::Config(format!(
                "invalid API URL `{base_url}`: not a base URL"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("keyhold/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| KeyholdError::RemoteFetch {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { client, base_url })
    }

    /// `base_url` plus `collection`, plus `id` as one escaped segment.
    fn url(&self, collection: &str, id: Option<&str>) -> Result<Url, KeyholdError> {
        if let Some(id) = id
            && (id.is_empty() || id == "." || id == "..")
        {
            return Err(KeyholdError::RemoteFetch {
                message: format!("refusing to request item id `{id}`"),
                source: None,
            });
        }
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                KeyholdError::Internal("API URL cannot take path segments".to_string())
            })?;
            segments.pop_if_empty().push(collection);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        url: Url,
    ) -> Result<T, KeyholdError> {
        let path = url.path().to_string();
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| request_failed(&path, e))?;
        let response = check_status(&path, response).await?;
        response.json::<T>().await.map_err(|e| KeyholdError::RemoteFetch {
            message: format!("GET {path}: invalid response body: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

fn request_failed(path: &str, e: reqwest::Error) -> KeyholdError {
    KeyholdError::RemoteFetch {
        message: format!("{path}: request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

async fn check_status(path: &str, response: reqwest::Response) -> Result<reqwest::Response, KeyholdError> {
    let status = response.status();
    debug!(path, status = %status, "vault API response");
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(KeyholdError::RemoteFetch {
        message: format!("{path} returned {status}: {body}"),
        source: None,
    })
}

#[async_trait]
impl VaultApi for HttpVaultApi {
    async fn fetch_snapshot(&self, access_token: &str) -> Result<SyncData, KeyholdError> {
        self.get_json(access_token, self.url("sync", None)?).await
    }

    async fn fetch_cipher(&self, access_token: &str, id: &str) -> Result<Cipher, KeyholdError> {
        self.get_json(access_token, self.url("ciphers", Some(id))?).await
    }

    async fn fetch_auth_request(
        &self,
        access_token: &str,
        id: &str,
    ) -> Result<AuthRequest, KeyholdError> {
        self.get_json(access_token, self.url("auth-requests", Some(id))?)
            .await
    }

    async fn post_auth_response(
        &self,
        access_token: &str,
        response: &AuthResponse,
    ) -> Result<(), KeyholdError> {
        let url = self.url("auth-requests", Some(&response.request_id))?;
        let path = url.path().to_string();
        let reply = self
            .client
            .put(url)
            .bearer_auth(access_token)
            .json(response)
            .send()
            .await
            .map_err(|e| request_failed(&path, e))?;
        check_status(&path, reply).await?;
        Ok(())
    }
}
