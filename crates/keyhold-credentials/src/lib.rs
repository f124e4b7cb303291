// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PIN-locked credential store for the keyhold agent.
//!
//! Secrets in the config record are sealed with ChaCha20-Poly1305 under a
//! config key derived from the user's PIN with Argon2. The key lives in a
//! [`GuardedBuffer`] only while the store is unlocked.

pub mod crypto;
pub mod guarded;
pub mod kdf;
pub mod migration;
pub mod pin_cache;
pub mod prompt;
pub mod record;
pub mod store;

pub use guarded::GuardedBuffer;
pub use kdf::KdfParams;
pub use migration::{migrate_legacy_record, LegacyMigration};
pub use prompt::{get_new_pin_with_confirm, get_pin};
pub use record::ConfigRecord;
pub use store::{CredentialStore, LockEvent, SecretField, StoreOptions};
