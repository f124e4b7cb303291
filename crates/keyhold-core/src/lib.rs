// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the keyhold secrets agent.
//!
//! This crate provides the error taxonomy, the remote wire models, the
//! decoded push-event types, and the traits through which the agent talks
//! to its external collaborators (remote vault API, item keyring, approval
//! prompt, presence check).

pub mod error;
pub mod traits;
pub mod types;

pub use error::KeyholdError;
pub use types::{
    AuthRequest, Cipher, CipherKind, Decision, EventKind, LoginToken, NotificationEvent,
    Organization, Profile, Sensitive, SyncData, VaultItem,
};

pub use traits::{ApprovalPrompt, ItemKeyring, PresenceCheck, VaultApi};
