// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-size key buffer that is zeroed on demand and on drop.
//!
//! In hardened mode the heap page holding the key is pinned with `mlock` so
//! it never reaches swap. Pinning is best-effort: when the process lacks the
//! privilege (RLIMIT_MEMLOCK) the buffer still works and logs a warning once.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;
use zeroize::Zeroize;

/// Length of every key held by the agent.
pub const KEY_LEN: usize = 32;

static MLOCK_WARNED: AtomicBool = AtomicBool::new(false);

/// Owned 32-byte key material.
///
/// The bytes live in a `Box` so their address is stable for the lifetime of
/// the buffer, which is what `mlock` requires.
pub struct GuardedBuffer {
    bytes: Box<[u8; KEY_LEN]>,
    pinned: bool,
}

impl std::fmt::Debug for GuardedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedBuffer")
            .field("bytes", &"[REDACTED]")
            .field("pinned", &self.pinned)
            .finish()
    }
}

impl GuardedBuffer {
    /// An all-zero buffer. This is the "no key installed" state.
    pub fn zeroed(hardened: bool) -> Self {
        let mut buffer = Self {
            bytes: Box::new([0u8; KEY_LEN]),
            pinned: false,
        };
        if hardened {
            buffer.pinned = pin_pages(buffer.bytes.as_ptr(), KEY_LEN);
        }
        buffer
    }

    /// Overwrite the held key in place.
    pub fn replace(&mut self, key: &[u8; KEY_LEN]) {
        self.bytes.copy_from_slice(key);
    }

    /// Zero the held key.
    pub fn wipe(&mut self) {
        self.bytes.zeroize();
    }

    /// True when every byte is zero. Runs over the whole buffer regardless
    /// of where the first non-zero byte sits.
    pub fn is_zero(&self) -> bool {
        self.bytes.iter().fold(0u8, |acc, b| acc | b) == 0
    }

    pub fn expose(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Whether the page is pinned in RAM.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }
}

impl Drop for GuardedBuffer {
    fn drop(&mut self) {
        self.bytes.zeroize();
        if self.pinned {
            unpin_pages(self.bytes.as_ptr(), KEY_LEN);
        }
    }
}

#[cfg(unix)]
fn pin_pages(ptr: *const u8, len: usize) -> bool {
    // SAFETY: ptr/len describe a live heap allocation owned by the caller.
    let rc = unsafe { libc::mlock(ptr.cast::<libc::c_void>(), len) };
    if rc != 0 && !MLOCK_WARNED.swap(true, Ordering::Relaxed) {
        warn!(
            error = %std::io::Error::last_os_error(),
            "mlock failed, key buffers may be swapped to disk"
        );
    }
    rc == 0
}

#[cfg(unix)]
fn unpin_pages(ptr: *const u8, len: usize) {
    // SAFETY: the range was previously locked by pin_pages and is still live.
    unsafe {
        libc::munlock(ptr.cast::<libc::c_void>(), len);
    }
}

#[cfg(not(unix))]
fn pin_pages(_ptr: *const u8, _len: usize) -> bool {
    if !MLOCK_WARNED.swap(true, Ordering::Relaxed) {
        warn!("memory pinning is not supported on this platform");
    }
    false
}

#[cfg(not(unix))]
fn unpin_pages(_ptr: *const u8, _len: usize) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(key: &[u8; KEY_LEN], hardened: bool) -> GuardedBuffer {
        let mut buffer = GuardedBuffer::zeroed(hardened);
        buffer.replace(key);
        buffer
    }

    #[test]
    fn zeroed_buffer_is_zero() {
        let buffer = GuardedBuffer::zeroed(false);
        assert!(buffer.is_zero());
        assert!(!buffer.is_pinned());
    }

    #[test]
    fn wipe_clears_installed_key() {
        let mut buffer = holding(&[7u8; KEY_LEN], false);
        assert!(!buffer.is_zero());
        assert_eq!(buffer.expose(), &[7u8; KEY_LEN]);

        buffer.wipe();
        assert!(buffer.is_zero());
    }

    #[test]
    fn single_nonzero_byte_is_not_zero() {
        let mut key = [0u8; KEY_LEN];
        key[KEY_LEN - 1] = 1;
        let buffer = holding(&key, false);
        assert!(!buffer.is_zero());
    }

    #[test]
    fn hardened_buffer_still_holds_key() {
        // Pinning may be refused in CI; the key must be usable either way.
        let buffer = holding(&[3u8; KEY_LEN], true);
        assert_eq!(buffer.expose(), &[3u8; KEY_LEN]);
    }

    #[test]
    fn debug_output_is_redacted() {
        let buffer = holding(&[0xAB; KEY_LEN], false);
        let debug = format!("{buffer:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("171"));
    }
}
