// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for keyhold integration tests.
//!
//! Mock collaborators and a harness that wires a fast-KDF credential store,
//! a vault and a sync engine together, so tests run without a server.
//!
//! # Components
//!
//! - [`MockVaultApi`] - in-memory remote vault with call recording
//! - [`ScriptedApproval`] / [`StaticPresence`] - canned approval decisions
//! - [`PrefixKeyring`] - keyring that opens `enc:`-prefixed fields
//! - [`TestHarness`] - assembled store, vault and engine
//! - [`frames`] - hub message encoder for push channel tests

pub mod frames;
pub mod harness;
pub mod mock_api;
pub mod mock_approval;

pub use harness::{TestHarness, TestHarnessBuilder, TEST_ACCESS_TOKEN, TEST_PIN};
pub use mock_api::MockVaultApi;
pub use mock_approval::{PrefixKeyring, ScriptedApproval, StaticPresence};
