// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Envelope encryption of record fields with ChaCha20-Poly1305.
//!
//! A sealed envelope is `nonce (12) || ciphertext || tag (16)`; a field is the
//! envelope encoded as standard base64 so it can sit in the JSON record.
//! Every seal draws a fresh random nonce from the system CSPRNG.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use keyhold_core::KeyholdError;
use ring::aead::{Aad, CHACHA20_POLY1305, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use sha3::{Digest, Sha3_256};
use zeroize::Zeroizing;

use crate::guarded::KEY_LEN;

const TAG_LEN: usize = 16;

fn aead_key(key: &[u8; KEY_LEN]) -> Result<LessSafeKey, KeyholdError> {
    let unbound = UnboundKey::new(&CHACHA20_POLY1305, key)
        .map_err(|_| KeyholdError::Crypto("failed to create ChaCha20-Poly1305 key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` into a self-contained envelope.
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>, KeyholdError> {
    let sealing = aead_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| KeyholdError::Crypto("failed to generate random nonce".to_string()))?;

    let mut in_out = plaintext.to_vec();
    sealing
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| KeyholdError::Crypto("ChaCha20-Poly1305 encryption failed".to_string()))?;

    let mut envelope = Vec::with_capacity(NONCE_LEN + in_out.len());
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&in_out);
    Ok(envelope)
}

/// Decrypt an envelope produced by [`seal`].
///
/// A wrong key, a flipped bit, or a truncated envelope all fail; nothing is
/// ever returned that did not authenticate.
pub fn open(key: &[u8; KEY_LEN], envelope: &[u8]) -> Result<Zeroizing<Vec<u8>>, KeyholdError> {
    if envelope.len() < NONCE_LEN + TAG_LEN {
        return Err(KeyholdError::Decrypt(format!(
            "envelope too short ({} bytes)",
            envelope.len()
        )));
    }
    let (nonce_bytes, sealed) = envelope.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| KeyholdError::Decrypt("malformed nonce".to_string()))?;

    let opening = aead_key(key)?;
    let mut in_out = Zeroizing::new(sealed.to_vec());
    let plaintext_len = opening
        .open_in_place(nonce, Aad::empty(), in_out.as_mut_slice())
        .map_err(|_| KeyholdError::Decrypt("authentication failed, wrong key or corrupted data".to_string()))?
        .len();
    in_out.truncate(plaintext_len);
    Ok(in_out)
}

/// Seal `plaintext` and base64-encode the envelope for the record.
pub fn encrypt_field(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<String, KeyholdError> {
    Ok(STANDARD.encode(seal(key, plaintext)?))
}

/// Inverse of [`encrypt_field`]. Bad base64 is a decryption failure too.
pub fn decrypt_field(key: &[u8; KEY_LEN], field: &str) -> Result<Zeroizing<Vec<u8>>, KeyholdError> {
    let envelope = STANDARD
        .decode(field)
        .map_err(|e| KeyholdError::Decrypt(format!("field is not valid base64: {e}")))?;
    open(key, &envelope)
}

/// Hex SHA3-256 digest of a config key, as stored in the record's key hash.
pub fn key_hash(key: &[u8; KEY_LEN]) -> String {
    hex::encode(Sha3_256::digest(key))
}

/// Length-checked comparison whose running time does not depend on where
/// the inputs first differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key() -> [u8; KEY_LEN] {
        [0x42; KEY_LEN]
    }

    #[test]
    fn envelope_carries_nonce_and_tag() {
        let envelope = seal(&key(), b"hello").unwrap();
        assert_eq!(envelope.len(), NONCE_LEN + 5 + TAG_LEN);
    }

    #[test]
    fn same_plaintext_seals_differently() {
        let k = key();
        assert_ne!(seal(&k, b"same").unwrap(), seal(&k, b"same").unwrap());
    }

    #[test]
    fn wrong_key_fails() {
        let field = encrypt_field(&key(), b"secret").unwrap();
        let err = decrypt_field(&[0x43; KEY_LEN], &field).unwrap_err();
        assert!(matches!(err, KeyholdError::Decrypt(_)));
    }

    #[test]
    fn tampered_envelope_fails() {
        let k = key();
        let mut envelope = seal(&k, b"do not tamper").unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0x01;
        assert!(open(&k, &envelope).is_err());
    }

    #[test]
    fn truncated_envelope_fails() {
        let k = key();
        let envelope = seal(&k, b"").unwrap();
        assert!(matches!(
            open(&k, &envelope[..NONCE_LEN + TAG_LEN - 1]),
            Err(KeyholdError::Decrypt(_))
        ));
    }

    #[test]
    fn bad_base64_is_a_decrypt_error() {
        let err = decrypt_field(&key(), "!!not base64!!").unwrap_err();
        assert!(matches!(err, KeyholdError::Decrypt(_)));
    }

    #[test]
    fn key_hash_is_hex_sha3_256() {
        let hash = key_hash(&[0u8; KEY_LEN]);
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "9e6291970cb44dd94008c79bcaf9d86f18b4b49ba5b2a04781db7199ed3b9e4e"
        );
    }

    #[test]
    fn constant_time_eq_checks_length_and_content() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }

    proptest! {
        #[test]
        fn field_roundtrip_is_identity(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let k = [0x5Au8; KEY_LEN];
            let field = encrypt_field(&k, &data).unwrap();
            let opened = decrypt_field(&k, &field).unwrap();
            prop_assert_eq!(opened.as_slice(), data.as_slice());
        }
    }
}
