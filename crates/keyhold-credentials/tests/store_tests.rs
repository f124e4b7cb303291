// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk behaviour of the credential store.

use std::path::Path;

use keyhold_core::{KeyholdError, LoginToken};
use keyhold_credentials::{ConfigRecord, CredentialStore, KdfParams, StoreOptions};
use secrecy::{ExposeSecret, SecretString};

const FAST: KdfParams = KdfParams::explicit(1024, 1, 1);

fn options(path: &Path) -> StoreOptions {
    let mut options = StoreOptions::new(path);
    options.hardened_memory = false;
    options.kdf = FAST;
    options
}

fn pin(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

#[test]
fn reopened_store_starts_locked_and_unlocks_with_pin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keyhold").join("keyhold.json");

    {
        let store = CredentialStore::open(options(&path)).unwrap();
        assert!(!store.is_locked());
        store.set_master_password_hash(b"hash").unwrap();
        store.set_client_secret("s3cret").unwrap();
        store.update_pin(&pin("4321")).unwrap();
    }

    let store = CredentialStore::open(options(&path)).unwrap();
    assert!(store.has_pin());
    assert!(store.is_locked());
    assert!(store.is_logged_in());
    assert!(matches!(
        store.client_secret(),
        Err(KeyholdError::ConfigLocked)
    ));

    store.unlock(&pin("4321")).unwrap();
    assert_eq!(
        store.client_secret().unwrap().unwrap().expose_secret(),
        "s3cret"
    );
}

#[test]
fn persisted_fields_are_never_plaintext() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keyhold.json");
    let store = CredentialStore::open(options(&path)).unwrap();
    store.update_pin(&pin("1111")).unwrap();
    store
        .set_token(&LoginToken {
            access_token: "very-secret-access-token".into(),
            ..LoginToken::default()
        })
        .unwrap();
    store.set_client_id("user.client-id-value").unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(!raw.contains("very-secret-access-token"));
    assert!(!raw.contains("client-id-value"));

    let record = ConfigRecord::load(&path).unwrap().unwrap();
    assert!(!record.encrypted_token.is_empty());
    assert_eq!(record.config_key_hash.len(), 64);
}

#[test]
fn pin_change_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keyhold.json");

    let store = CredentialStore::open(options(&path)).unwrap();
    store.update_pin(&pin("1111")).unwrap();
    store.set_master_key(&[9u8; 32]).unwrap();
    store.set_user_symmetric_key(&[7u8; 64]).unwrap();
    store.update_pin(&pin("2222")).unwrap();
    drop(store);

    let store = CredentialStore::open(options(&path)).unwrap();
    assert!(!store.verify_pin(&pin("1111")).unwrap());
    store.unlock(&pin("2222")).unwrap();
    assert_eq!(store.master_key().unwrap().unwrap().expose_secret(), &[9u8; 32]);
    assert_eq!(
        store.user_symmetric_key().unwrap().unwrap().expose_secret(),
        &[7u8; 64][..]
    );
}

#[test]
fn failed_write_changes_nothing_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();
    // The record's parent is a regular file, so every write fails.
    let store = CredentialStore::with_record(
        ConfigRecord::fresh(),
        options(&blocker.join("keyhold.json")),
    );

    assert!(store.set_client_id("never-stored").is_err());
    assert!(store.client_id().unwrap().is_none());

    assert!(store.update_pin(&pin("2222")).is_err());
    assert!(!store.has_pin());
    assert!(!store.is_locked());
}

#[test]
fn purge_is_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keyhold.json");
    let store = CredentialStore::open(options(&path)).unwrap();
    store.set_master_password_hash(b"hash").unwrap();
    store.update_pin(&pin("1111")).unwrap();
    store.purge().unwrap();

    let record = ConfigRecord::load(&path).unwrap().unwrap();
    assert!(record.config_key_hash.is_empty());
    assert!(record.encrypted_master_password_hash.is_empty());
    assert!(!record.device_uuid.is_empty());
}

#[test]
fn record_without_device_id_gets_one_and_accepts_a_pin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keyhold.json");
    std::fs::write(&path, br#"{"ApiUrl":"https://api.example.test"}"#).unwrap();

    let store = CredentialStore::open(options(&path)).unwrap();
    let device_id = store.device_id();
    assert!(!device_id.is_empty());
    assert_eq!(store.api_url(), "https://api.example.test");
    store.update_pin(&pin("1234")).unwrap();
    drop(store);

    let store = CredentialStore::open(options(&path)).unwrap();
    assert_eq!(store.device_id(), device_id);
    assert!(store.is_locked());
    store.unlock(&pin("1234")).unwrap();
}

#[test]
fn unusable_device_id_reads_as_wrong_pin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keyhold.json");
    std::fs::write(
        &path,
        br#"{"DeviceUUID":"abc","ConfigKeyHash":"00"}"#,
    )
    .unwrap();

    let store = CredentialStore::open(options(&path)).unwrap();
    assert_eq!(store.device_id(), "abc");
    assert!(store.is_locked());
    assert!(matches!(
        store.unlock(&pin("1234")),
        Err(KeyholdError::InvalidPin)
    ));
    assert!(!store.verify_pin(&pin("1234")).unwrap());
    assert!(store.is_locked());
}
