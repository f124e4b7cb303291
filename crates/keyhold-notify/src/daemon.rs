// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconnect driver for the notification channel.

use std::time::Duration;

use keyhold_config::model::SyncConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::channel::{ChannelExit, NotificationChannel};

/// Timing for the reconnect loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonSettings {
    /// Pause after every connection attempt, successful or not.
    pub reconnect_interval: Duration,
    /// Poll interval while the store is locked.
    pub locked_poll_interval: Duration,
}

impl From<&SyncConfig> for DaemonSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            reconnect_interval: config.reconnect_interval(),
            locked_poll_interval: config.locked_poll_interval(),
        }
    }
}

/// How the daemon stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonExit {
    Shutdown,
    /// The remote logged the session out; secrets must be wiped.
    LoggedOut,
}

pub struct NotificationDaemon {
    channel: NotificationChannel,
    settings: DaemonSettings,
}

impl NotificationDaemon {
    pub fn new(channel: NotificationChannel, settings: DaemonSettings) -> Self {
        Self { channel, settings }
    }

    pub fn channel(&self) -> &NotificationChannel {
        &self.channel
    }

    /// Keep a connection up until shutdown or logout.
    ///
    /// While the store is locked nothing connects. Without a session token
    /// the attempt is skipped. After each attempt the daemon waits the
    /// reconnect interval.
    pub async fn run(&self, shutdown: CancellationToken) -> DaemonExit {
        let store = self.channel.store().clone();
        loop {
            if shutdown.is_cancelled() {
                return DaemonExit::Shutdown;
            }
            if store.is_locked() {
                debug!("store locked, not connecting");
                if !pause(&shutdown, self.settings.locked_poll_interval).await {
                    return DaemonExit::Shutdown;
                }
                continue;
            }

            let has_token = matches!(
                store.token(),
                Ok(Some(token)) if !token.access_token.is_empty()
            );
            if has_token {
                match self.channel.run_once(&shutdown).await {
                    Ok(ChannelExit::LoggedOut) => return DaemonExit::LoggedOut,
                    Ok(ChannelExit::Shutdown) => return DaemonExit::Shutdown,
                    Ok(exit) => info!(%exit, "notification channel disconnected"),
                    Err(e) => error!(error = %e, "notification channel failed"),
                }
            } else {
                debug!("no session token, not connecting");
            }

            if !pause(&shutdown, self.settings.reconnect_interval).await {
                return DaemonExit::Shutdown;
            }
        }
    }
}

/// Sleep for `duration`. Returns `false` if shutdown came first.
async fn pause(shutdown: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
