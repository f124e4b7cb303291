// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PIN acquisition via environment variables or a TTY prompt.

use keyhold_core::KeyholdError;
use secrecy::SecretString;

/// Environment variable carrying the PIN for headless runs.
pub const PIN_ENV_VAR: &str = "KEYHOLD_PIN";

/// Environment variable carrying the replacement PIN for a headless
/// `set-pin`. Kept apart from [`PIN_ENV_VAR`], which unlocks the old one.
pub const NEW_PIN_ENV_VAR: &str = "KEYHOLD_NEW_PIN";

fn pin_from_env() -> Option<SecretString> {
    env_pin(PIN_ENV_VAR)
}

fn env_pin(var: &str) -> Option<SecretString> {
    match std::env::var(var) {
        Ok(pin) if !pin.is_empty() => Some(SecretString::from(pin)),
        _ => None,
    }
}

fn read_tty(label: &str) -> Result<String, KeyholdError> {
    eprint!("{label}: ");
    rpassword::read_password()
        .map_err(|e| KeyholdError::Config(format!("failed to read PIN: {e}")))
}

fn not_available(var: &str) -> KeyholdError {
    KeyholdError::Config(format!("no PIN provided. Set {var} or run interactively."))
}

/// Get the unlock PIN: `KEYHOLD_PIN` first, then an interactive prompt.
pub fn get_pin() -> Result<SecretString, KeyholdError> {
    if let Some(pin) = pin_from_env() {
        return Ok(pin);
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        let pin = read_tty("keyhold PIN")?;
        if pin.is_empty() {
            return Err(KeyholdError::Config("empty PIN not allowed".to_string()));
        }
        return Ok(SecretString::from(pin));
    }

    Err(not_available(PIN_ENV_VAR))
}

/// Get a new PIN: `KEYHOLD_NEW_PIN` first, then two TTY prompts.
pub fn get_new_pin_with_confirm() -> Result<SecretString, KeyholdError> {
    if let Some(pin) = env_pin(NEW_PIN_ENV_VAR) {
        return Ok(pin);
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        let first = zeroize::Zeroizing::new(read_tty("New keyhold PIN")?);
        let second = zeroize::Zeroizing::new(read_tty("Confirm PIN")?);
        if *first != *second {
            return Err(KeyholdError::Config("PINs do not match".to_string()));
        }
        if first.is_empty() {
            return Err(KeyholdError::Config("empty PIN not allowed".to_string()));
        }
        return Ok(SecretString::from(first.to_string()));
    }

    Err(not_available(NEW_PIN_ENV_VAR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;

    #[test]
    #[serial]
    fn pin_comes_from_env_var() {
        // SAFETY: env mutation is serialized across tests by #[serial].
        unsafe { std::env::set_var(PIN_ENV_VAR, "8642") };
        let pin = get_pin();
        unsafe { std::env::remove_var(PIN_ENV_VAR) };

        assert_eq!(pin.unwrap().expose_secret(), "8642");
    }

    #[test]
    #[serial]
    fn new_pin_does_not_reuse_the_unlock_pin() {
        // SAFETY: env mutation is serialized across tests by #[serial].
        unsafe {
            std::env::set_var(PIN_ENV_VAR, "8642");
            std::env::set_var(NEW_PIN_ENV_VAR, "1357");
        }
        let old = get_pin();
        let new = get_new_pin_with_confirm();
        unsafe { std::env::remove_var(NEW_PIN_ENV_VAR) };
        let without_new = pin_from_env().is_some() && env_pin(NEW_PIN_ENV_VAR).is_none();
        unsafe { std::env::remove_var(PIN_ENV_VAR) };

        assert_eq!(old.unwrap().expose_secret(), "8642");
        assert_eq!(new.unwrap().expose_secret(), "1357");
        assert!(without_new);
    }

    #[test]
    #[serial]
    fn empty_env_var_is_ignored() {
        unsafe { std::env::set_var(PIN_ENV_VAR, "") };
        let from_env = pin_from_env();
        unsafe { std::env::remove_var(PIN_ENV_VAR) };

        assert!(from_env.is_none());
    }
}
