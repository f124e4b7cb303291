// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `keyhold serve` command implementation.
//!
//! Opens and unlocks the credential store, performs an initial full sync,
//! then keeps the vault current through the push channel until a signal
//! arrives or the remote logs the session out.

use std::sync::Arc;

use async_trait::async_trait;
use keyhold_config::KeyholdConfig;
use keyhold_core::{ApprovalPrompt, AuthRequest, Decision, KeyholdError, PresenceCheck};
use keyhold_credentials::LockEvent;
use keyhold_notify::{DaemonExit, DaemonSettings, NotificationChannel, NotificationDaemon};
use keyhold_sync::{Collaborators, HttpVaultApi, SyncEngine, VaultState, VerbatimKeyring};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{shutdown, startup, teardown};

/// Denies every passwordless-login request. The daemon has no approval UI.
struct DenyAllApproval;

#[async_trait]
impl ApprovalPrompt for DenyAllApproval {
    async fn request_approval(&self, request: &AuthRequest) -> Decision {
        warn!(
            ip = %request.request_ip_address,
            device_type = %request.request_device_type,
            "no approval prompt available, denying login request"
        );
        Decision::Denied
    }
}

/// Presence check that never passes.
struct NoPresence;

#[async_trait]
impl PresenceCheck for NoPresence {
    async fn verify_presence(&self) -> bool {
        false
    }
}

/// Runs the `keyhold serve` command.
pub async fn run_serve(config: KeyholdConfig) -> Result<(), KeyholdError> {
    init_tracing(&config.agent.log_level);
    info!("starting keyhold serve");

    let store = startup::open_store(&config)?;
    startup::unlock(&store)?;
    if !store.is_logged_in() {
        warn!("no account is logged in, nothing will be synced");
    }

    let vault = Arc::new(VaultState::new(store.clone()));
    let api = HttpVaultApi::new(&store.api_url(), config.sync.request_timeout())?;
    let engine = Arc::new(SyncEngine::new(
        Collaborators {
            api: Arc::new(api),
            keyring: Arc::new(VerbatimKeyring),
            approval: Arc::new(DenyAllApproval),
            presence: Arc::new(NoPresence),
        },
        store.clone(),
        vault.clone(),
    ));

    let cancel = shutdown::install_signal_handler();
    tokio::spawn(watch_lock_events(
        store.subscribe(),
        engine.clone(),
        cancel.clone(),
    ));

    if store.is_logged_in() {
        match engine.full_sync().await {
            Ok(count) => info!(items = count, "initial sync complete"),
            Err(e) => warn!(error = %e, "initial sync failed, waiting for push events"),
        }
    }

    let exit = if config.sync.websocket_enabled {
        let daemon = NotificationDaemon::new(
            NotificationChannel::new(engine.clone(), config.sync.liveness_interval()),
            DaemonSettings::from(&config.sync),
        );
        daemon.run(cancel.clone()).await
    } else {
        info!("push channel disabled, idling until shutdown");
        cancel.cancelled().await;
        DaemonExit::Shutdown
    };

    match exit {
        DaemonExit::LoggedOut => {
            warn!("logged out by remote, wiping secrets and exiting");
            teardown::secure_exit(&store, &vault, 0).await
        }
        DaemonExit::Shutdown => {
            cancel.cancel();
            teardown::wipe_secrets(&store, &vault).await;
            info!("keyhold serve shutdown complete");
            Ok(())
        }
    }
}

/// Keep the vault consistent with lock state: drop decrypted items when
/// the store locks or is purged, and resync after an unlock.
async fn watch_lock_events(
    mut events: broadcast::Receiver<LockEvent>,
    engine: Arc<SyncEngine>,
    shutdown: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => return,
            event = events.recv() => event,
        };
        match event {
            Ok(LockEvent::Locked | LockEvent::Purged) => {
                engine.vault().clear().await;
                info!("store locked, vault cleared");
            }
            Ok(LockEvent::Unlocked) => {
                if !engine.store().is_logged_in() {
                    continue;
                }
                match engine.full_sync().await {
                    Ok(count) => info!(items = count, "resynced after unlock"),
                    Err(e) => warn!(error = %e, "resync after unlock failed"),
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "lock events lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("keyhold={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use keyhold_core::{Cipher, CipherKind, Profile, SyncData};
    use keyhold_test_utils::{PrefixKeyring, TestHarness};

    fn note(id: &str) -> Cipher {
        Cipher {
            id: id.to_string(),
            kind: CipherKind::SecureNote,
            organization_id: None,
            name: Some(PrefixKeyring::protect(id)),
            notes: Some(PrefixKeyring::protect("body")),
            login: None,
            ssh_key: None,
            revision_date: None,
            deleted_date: None,
        }
    }

    async fn eventually<F, Fut>(mut check: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..100 {
            if check().await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn deny_all_never_approves() {
        assert_eq!(
            DenyAllApproval
                .request_approval(&AuthRequest::default())
                .await,
            Decision::Denied
        );
        assert!(!NoPresence.verify_presence().await);
    }

    #[tokio::test]
    async fn lock_clears_and_unlock_resyncs() {
        let harness = TestHarness::builder().with_pin().build().unwrap();
        harness
            .api
            .set_snapshot(SyncData {
                profile: Profile::default(),
                ciphers: vec![note("n1")],
            })
            .await;
        harness.engine.full_sync().await.unwrap();

        let shutdown = CancellationToken::new();
        tokio::spawn(watch_lock_events(
            harness.store.subscribe(),
            harness.engine.clone(),
            shutdown.clone(),
        ));

        harness.store.lock();
        harness.unlock().unwrap();

        let api = harness.api.clone();
        assert!(eventually(|| {
            let api = api.clone();
            async move { api.snapshot_calls().await == 2 }
        })
        .await);
        let vault = harness.vault.clone();
        assert!(eventually(|| {
            let vault = vault.clone();
            async move { vault.len().await.map(|n| n == 1).unwrap_or(false) }
        })
        .await);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn purge_clears_vault() {
        let harness = TestHarness::builder().build().unwrap();
        harness
            .api
            .set_snapshot(SyncData {
                profile: Profile::default(),
                ciphers: vec![note("n1"), note("n2")],
            })
            .await;
        harness.engine.full_sync().await.unwrap();

        let shutdown = CancellationToken::new();
        tokio::spawn(watch_lock_events(
            harness.store.subscribe(),
            harness.engine.clone(),
            shutdown.clone(),
        ));
        harness.store.purge().unwrap();

        let vault = harness.vault.clone();
        assert!(eventually(|| {
            let vault = vault.clone();
            async move { vault.is_empty().await.unwrap_or(false) }
        })
        .await);
        shutdown.cancel();
    }
}
