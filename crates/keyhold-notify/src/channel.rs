// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One push connection to the notification hub.
//!
//! [`NotificationChannel::run_once`] connects, sends the handshake, and
//! reads frames until the socket closes, the session ends, or the agent
//! shuts down. A liveness monitor runs next to the reader and ends the
//! session as soon as the store is locked or logged out, so an
//! authenticated socket never outlives the user's session.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use keyhold_core::KeyholdError;
use keyhold_credentials::CredentialStore;
use keyhold_sync::{EventOutcome, SyncEngine};
use reqwest::Url;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::frame::{self, HANDSHAKE};

/// Lifecycle of a single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Handshaking,
    Streaming,
}

/// Why a connection ended without a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ChannelExit {
    /// The hub closed the socket.
    Closed,
    /// The liveness monitor saw the store locked or logged out.
    SessionEnded,
    /// A logout event arrived. The caller must wipe and exit.
    LoggedOut,
    /// The agent is shutting down.
    Shutdown,
}

/// Build the hub URL for `notifications_url`.
///
/// `https` (and anything else) maps to `wss`; plain `http` maps to `ws`.
/// The hub lives at `<path>/hub` and takes the bearer token as a query
/// parameter.
pub fn push_url(notifications_url: &str, access_token: &str) -> Result<Url, KeyholdError> {
    let mut url = Url::parse(notifications_url).map_err(|e| {
        KeyholdError::Config(format!(
            "invalid notifications url `{notifications_url}`: {e}"
        ))
    })?;
    let scheme = if url.scheme() == "http" { "ws" } else { "wss" };
    url.set_scheme(scheme).map_err(|()| {
        KeyholdError::Config(format!(
            "notifications url `{notifications_url}` cannot be used for a websocket"
        ))
    })?;
    let path = format!("{}/hub", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_fragment(None);
    url.query_pairs_mut()
        .clear()
        .append_pair("access_token", access_token);
    Ok(url)
}

pub struct NotificationChannel {
    engine: Arc<SyncEngine>,
    liveness_interval: Duration,
    state: watch::Sender<ConnectionState>,
}

impl NotificationChannel {
    pub fn new(engine: Arc<SyncEngine>, liveness_interval: Duration) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            engine,
            liveness_interval,
            state,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        self.engine.store()
    }

    fn set_state(&self, next: ConnectionState) {
        self.state.send_replace(next);
        debug!(state = %next, "notification channel state");
    }

    /// Run one connection to completion.
    ///
    /// Transport failures are returned as errors; every other way the
    /// connection can end is a [`ChannelExit`]. The vault's connected flag
    /// is set while streaming and always cleared on return.
    pub async fn run_once(&self, shutdown: &CancellationToken) -> Result<ChannelExit, KeyholdError> {
        let token = match self.store().token()? {
            Some(token) if !token.access_token.is_empty() => token.access_token,
            _ => return Err(KeyholdError::NotLoggedIn),
        };
        let url = push_url(&self.store().notifications_url(), &token)?;

        self.set_state(ConnectionState::Connecting);
        let result = self.connect_and_stream(url, shutdown).await;
        self.engine.vault().set_connected(false);
        self.set_state(ConnectionState::Disconnected);
        result
    }

    async fn connect_and_stream(
        &self,
        url: Url,
        shutdown: &CancellationToken,
    ) -> Result<ChannelExit, KeyholdError> {
        let (socket, _) = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(ChannelExit::Shutdown),
            connected = tokio_tungstenite::connect_async(url.as_str()) => {
                connected.map_err(|e| transport("failed to connect to notification hub", e))?
            }
        };
        let (mut sink, mut reader) = socket.split();

        self.set_state(ConnectionState::Handshaking);
        sink.send(Message::text(HANDSHAKE.to_string()))
            .await
            .map_err(|e| transport("failed to send handshake", e))?;

        info!("connected to notification hub");
        self.engine.vault().set_connected(true);
        self.set_state(ConnectionState::Streaming);

        let session = shutdown.child_token();
        let monitor = tokio::spawn(liveness_monitor(
            self.store().clone(),
            self.liveness_interval,
            session.clone(),
        ));

        let exit = loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break Ok(ChannelExit::Shutdown),
                _ = session.cancelled() => break Ok(ChannelExit::SessionEnded),
                next = reader.next() => next,
            };
            let exit = match next {
                None | Some(Ok(Message::Close(_))) => Some(ChannelExit::Closed),
                Some(Err(e)) => break Err(transport("failed to read from notification hub", e)),
                Some(Ok(Message::Binary(bytes))) => self.dispatch(&bytes).await,
                Some(Ok(Message::Text(text))) => self.dispatch(text.as_bytes()).await,
                Some(Ok(_)) => None,
            };
            if let Some(exit) = exit {
                break Ok(exit);
            }
        };

        session.cancel();
        monitor.abort();
        if let Err(e) = sink.close().await {
            trace!(error = %e, "closing notification socket");
        }
        exit
    }

    /// Decode and apply one message. Returns an exit only for logout.
    async fn dispatch(&self, message: &[u8]) -> Option<ChannelExit> {
        let event = match frame::decode_frame(message) {
            Ok(Some(event)) => event,
            Ok(None) => {
                trace!(len = message.len(), "keep-alive");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                return None;
            }
        };

        match self.engine.apply_event(&event).await {
            Ok(EventOutcome::Logout) => Some(ChannelExit::LoggedOut),
            Ok(outcome) => {
                debug!(kind = %event.kind, ?outcome, "event applied");
                None
            }
            Err(e) => {
                warn!(kind = %event.kind, id = %event.id, error = %e, "event dropped");
                None
            }
        }
    }
}

/// Cancel `session` once the store is locked or no account is logged in.
async fn liveness_monitor(
    store: Arc<CredentialStore>,
    interval: Duration,
    session: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = session.cancelled() => return,
            _ = ticker.tick() => {}
        }
        if store.is_locked() || !store.is_logged_in() {
            info!("store locked or logged out, closing notification channel");
            session.cancel();
            return;
        }
    }
}

fn transport(
    message: &str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> KeyholdError {
    KeyholdError::Transport {
        message: message.to_string(),
        source: Some(Box::new(source)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_maps_to_wss_with_hub_path() {
        let url = push_url("https://notifications.bitwarden.com", "tok").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://notifications.bitwarden.com/hub?access_token=tok"
        );
    }

    #[test]
    fn path_and_port_are_kept() {
        let url = push_url("https://vault.example.org:8443/notifications/", "tok").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://vault.example.org:8443/notifications/hub?access_token=tok"
        );
    }

    #[test]
    fn http_maps_to_ws() {
        let url = push_url("http://127.0.0.1:9000", "tok").unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:9000/hub?access_token=tok");
    }

    #[test]
    fn existing_query_is_replaced() {
        let url = push_url("https://example.org/n?stale=1", "a b").unwrap();
        assert_eq!(url.as_str(), "wss://example.org/n/hub?access_token=a+b");
    }

    #[test]
    fn garbage_url_is_a_config_error() {
        assert!(matches!(
            push_url("not a url", "tok"),
            Err(KeyholdError::Config(_))
        ));
    }

    #[test]
    fn states_display_in_snake_case() {
        assert_eq!(ConnectionState::Streaming.to_string(), "streaming");
        assert_eq!(ChannelExit::SessionEnded.to_string(), "session_ended");
    }
}
