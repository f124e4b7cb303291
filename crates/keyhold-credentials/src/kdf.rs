// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PIN to config-key derivation with Argon2.
//!
//! The device identifier is the salt, so one PIN yields a different key on
//! every device. The cost parameters are part of the on-disk contract: a
//! record written with one set can only be unlocked with the same set.

use keyhold_core::KeyholdError;
use zeroize::Zeroizing;

use crate::guarded::KEY_LEN;

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    memory_kib: u32,
    iterations: u32,
    lanes: u32,
}

impl KdfParams {
    /// The parameters every persisted record is keyed with: two passes over
    /// a 2 GiB working set, eight lanes. A derivation takes hundreds of
    /// milliseconds by intent.
    pub const CONTRACT: KdfParams = KdfParams {
        memory_kib: 2 * 1024 * 1024,
        iterations: 2,
        lanes: 8,
    };

    /// Explicit parameters, for tests that cannot afford the contract cost.
    ///
    /// Keys derived this way do not unlock records written by the agent.
    pub const fn explicit(memory_kib: u32, iterations: u32, lanes: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            lanes,
        }
    }

    /// Derive the 32-byte config key for `pin` on the device `device_id`.
    pub fn derive(&self, pin: &[u8], device_id: &str) -> Result<Zeroizing<[u8; KEY_LEN]>, KeyholdError> {
        let params = argon2::Params::new(self.memory_kib, self.iterations, self.lanes, Some(KEY_LEN))
            .map_err(|e| KeyholdError::Crypto(format!("invalid Argon2 parameters: {e}")))?;
        let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2i, argon2::Version::V0x13, params);

        let mut output = Zeroizing::new([0u8; KEY_LEN]);
        argon2
            .hash_password_into(pin, device_id.as_bytes(), output.as_mut())
            .map_err(|e| KeyholdError::Crypto(format!("Argon2 key derivation failed: {e}")))?;
        Ok(output)
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::CONTRACT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: KdfParams = KdfParams::explicit(1024, 1, 1);
    const DEVICE: &str = "0b8e4a3c-6f8e-4d37-9d1c-2a4f7b6c1e55";

    #[test]
    fn derivation_is_deterministic() {
        let a = FAST.derive(b"1234", DEVICE).unwrap();
        let b = FAST.derive(b"1234", DEVICE).unwrap();
        assert_eq!(*a, *b);
    }

    #[test]
    fn different_pins_give_different_keys() {
        let a = FAST.derive(b"1234", DEVICE).unwrap();
        let b = FAST.derive(b"4321", DEVICE).unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn device_id_salts_the_key() {
        let a = FAST.derive(b"1234", DEVICE).unwrap();
        let b = FAST
            .derive(b"1234", "7c1d9e20-3b44-4a8f-8f0e-5d6a2b9c0f11")
            .unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn short_device_id_is_rejected() {
        // Argon2 requires a salt of at least 8 bytes.
        let err = FAST.derive(b"1234", "abc").unwrap_err();
        assert!(matches!(err, KeyholdError::Crypto(_)));
    }

    #[test]
    fn contract_is_the_default() {
        assert_eq!(KdfParams::default(), KdfParams::CONTRACT);
        assert_eq!(KdfParams::CONTRACT.memory_kib, 2 * 1024 * 1024);
        assert_eq!(KdfParams::CONTRACT.iterations, 2);
        assert_eq!(KdfParams::CONTRACT.lanes, 8);
    }
}
