// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-lived PIN cache for silent re-unlock after an idle lock.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use secrecy::SecretString;
use zeroize::Zeroizing;

struct CachedPin {
    pin: Zeroizing<String>,
    stored_at: Instant,
}

/// Holds the last accepted PIN for `ttl`. A zero TTL disables caching.
pub struct PinCache {
    ttl: Duration,
    slot: Mutex<Option<CachedPin>>,
}

impl std::fmt::Debug for PinCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinCache")
            .field("ttl", &self.ttl)
            .field("pin", &"[REDACTED]")
            .finish()
    }
}

impl PinCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn store(&self, pin: &str) {
        if self.ttl.is_zero() {
            return;
        }
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(CachedPin {
            pin: Zeroizing::new(pin.to_string()),
            stored_at: Instant::now(),
        });
    }

    /// The cached PIN if it has not expired. An expired entry is dropped.
    pub fn get(&self) -> Option<SecretString> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        let fresh = slot
            .as_ref()
            .is_some_and(|cached| cached.stored_at.elapsed() < self.ttl);
        if !fresh {
            *slot = None;
            return None;
        }
        slot.as_ref()
            .map(|cached| SecretString::from(cached.pin.as_str().to_owned()))
    }

    pub fn clear(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn stored_pin_is_returned_within_ttl() {
        let cache = PinCache::new(Duration::from_secs(60));
        cache.store("2468");
        assert_eq!(cache.get().unwrap().expose_secret(), "2468");
    }

    #[test]
    fn expired_pin_is_dropped() {
        let cache = PinCache::new(Duration::from_millis(1));
        cache.store("2468");
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get().is_none());
        assert!(cache.get().is_none());
    }

    #[test]
    fn zero_ttl_disables_cache() {
        let cache = PinCache::new(Duration::ZERO);
        cache.store("2468");
        assert!(cache.get().is_none());
    }

    #[test]
    fn clear_forgets_pin() {
        let cache = PinCache::new(Duration::from_secs(60));
        cache.store("2468");
        cache.clear();
        assert!(cache.get().is_none());
    }
}
