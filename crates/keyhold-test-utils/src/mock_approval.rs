// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned approval, presence and keyring collaborators.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use keyhold_core::{
    ApprovalPrompt, AuthRequest, Decision, ItemKeyring, KeyholdError, PresenceCheck, Sensitive,
};

/// Returns queued decisions in order, then `Denied` once the queue is empty.
#[derive(Clone, Default)]
pub struct ScriptedApproval {
    decisions: Arc<Mutex<VecDeque<Decision>>>,
    seen: Arc<Mutex<Vec<AuthRequest>>>,
}

impl ScriptedApproval {
    pub fn new(decisions: Vec<Decision>) -> Self {
        Self {
            decisions: Arc::new(Mutex::new(VecDeque::from(decisions))),
            seen: Arc::default(),
        }
    }

    pub async fn push(&self, decision: Decision) {
        self.decisions.lock().await.push_back(decision);
    }

    /// Requests the prompt was shown, in order.
    pub async fn seen(&self) -> Vec<AuthRequest> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl ApprovalPrompt for ScriptedApproval {
    async fn request_approval(&self, request: &AuthRequest) -> Decision {
        self.seen.lock().await.push(request.clone());
        self.decisions
            .lock()
            .await
            .pop_front()
            .unwrap_or(Decision::Denied)
    }
}

/// Presence check with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticPresence(pub bool);

#[async_trait]
impl PresenceCheck for StaticPresence {
    async fn verify_presence(&self) -> bool {
        self.0
    }
}

/// Prefix that marks a field as "encrypted" for [`PrefixKeyring`].
pub const ENC_PREFIX: &str = "enc:";

/// Keyring that opens `enc:<plaintext>` fields and rejects anything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixKeyring;

impl PrefixKeyring {
    /// Protect a plaintext the way this keyring expects.
    pub fn protect(plaintext: &str) -> String {
        format!("{ENC_PREFIX}{plaintext}")
    }
}

impl ItemKeyring for PrefixKeyring {
    fn open_field(&self, protected: &str) -> Result<Sensitive, KeyholdError> {
        protected
            .strip_prefix(ENC_PREFIX)
            .map(Sensitive::new)
            .ok_or_else(|| KeyholdError::Decrypt(format!("unprotected field `{protected}`")))
    }

    fn seal_account_key_for(&self, request_public_key: &str) -> Result<String, KeyholdError> {
        Ok(format!("sealed-for:{request_public_key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_approval_falls_back_to_denied() {
        let approval = ScriptedApproval::new(vec![Decision::Approved]);
        let request = AuthRequest::default();
        assert_eq!(approval.request_approval(&request).await, Decision::Approved);
        assert_eq!(approval.request_approval(&request).await, Decision::Denied);
        assert_eq!(approval.seen().await.len(), 2);
    }

    #[test]
    fn prefix_keyring_opens_only_protected_fields() {
        let opened = PrefixKeyring.open_field(&PrefixKeyring::protect("hello")).unwrap();
        assert_eq!(opened.expose(), "hello");
        assert!(PrefixKeyring.open_field("hello").is_err());
    }
}
