// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User approval and presence gates for passwordless-login requests.

use async_trait::async_trait;

use crate::types::{AuthRequest, Decision};

/// Asks the user whether a pending login request should be allowed.
///
/// May suspend indefinitely awaiting input. Dismissal or any prompt failure
/// must be reported as [`Decision::Denied`].
#[async_trait]
pub trait ApprovalPrompt: Send + Sync + 'static {
    async fn request_approval(&self, request: &AuthRequest) -> Decision;
}

/// Secondary user-presence check (biometric or equivalent).
#[async_trait]
pub trait PresenceCheck: Send + Sync + 'static {
    async fn verify_presence(&self) -> bool;
}
