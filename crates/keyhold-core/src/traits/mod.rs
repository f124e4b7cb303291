// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Traits for the collaborators the core calls but does not implement.
//!
//! Async traits use `#[async_trait]` so they can be held as trait objects.

pub mod approval;
pub mod keyring;
pub mod remote;

pub use approval::{ApprovalPrompt, PresenceCheck};
pub use keyring::ItemKeyring;
pub use remote::{AuthResponse, VaultApi};
