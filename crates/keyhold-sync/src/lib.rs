// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault synchronization for the keyhold agent.
//!
//! Holds the in-memory [`VaultState`], the [`SyncEngine`] that keeps it in
//! step with the remote vault, and the HTTP client the engine fetches with.

pub mod api;
pub mod engine;
pub mod keyring;
pub mod vault;

pub use api::HttpVaultApi;
pub use engine::{Collaborators, EventOutcome, SyncEngine};
pub use keyring::VerbatimKeyring;
pub use vault::VaultState;
