//! Session key schedule: root key, subkey derivation, and the ratchet.
//!
//! # Security Properties
//!
//! - Forward secrecy: each ratchet step overwrites the root with a one-way
//!   derivation of itself, so a later compromise cannot decrypt earlier
//!   traffic
//! - Key separation: MAC and seal subkeys come from distinct HKDF labels
//! - Determinism: two peers holding the same root derive identical subkeys
//!   and identical post-ratchet roots

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

/// Size of the session root key and every derived subkey, in bytes.
pub const KEY_SIZE: usize = 32;

/// Label for the frame-tag subkey.
const MAC_LABEL: &[u8] = b"sealpost tag v1";

/// Label for the payload-sealing subkey.
const SEAL_LABEL: &[u8] = b"sealpost seal v1";

/// Label for the ratchet step.
const RATCHET_LABEL: &[u8] = b"sealpost ratchet v1";

/// The symmetric key shared by the two ends of a session.
///
/// Holds the 32-byte root from which the MAC and seal subkeys are derived.
/// The root is replaced in place by [`ratchet`](Self::ratchet) and by a
/// completed recovery exchange; it only ever moves forward.
#[derive(Clone)]
pub struct SessionKey {
    root: [u8; KEY_SIZE],
}

impl SessionKey {
    /// Wrap an existing 32-byte root (bootstrap or recovery output).
    pub fn from_bytes(root: [u8; KEY_SIZE]) -> Self {
        Self { root }
    }

    /// Subkey for frame authentication tags.
    pub fn mac_key(&self) -> [u8; KEY_SIZE] {
        self.expand(MAC_LABEL)
    }

    /// Subkey for sealing command payloads.
    pub fn seal_key(&self) -> [u8; KEY_SIZE] {
        self.expand(SEAL_LABEL)
    }

    /// Advance the key one ratchet step.
    ///
    /// The new root is HMAC-SHA256(old root, ratchet label): deterministic
    /// and one-way, so the old root cannot be recovered from the new one.
    /// The old root is zeroized before being replaced.
    pub fn ratchet(&mut self) {
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.root) else {
            unreachable!("HMAC-SHA256 accepts any key size");
        };
        mac.update(RATCHET_LABEL);
        let digest = mac.finalize().into_bytes();

        let mut next = [0u8; KEY_SIZE];
        next.copy_from_slice(&digest);

        self.root.zeroize();
        self.root = next;
    }

    /// The raw root bytes.
    ///
    /// Exposed for peers that need to compare or persist key state (tests,
    /// diagnostics); never sent on the wire.
    pub fn root_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.root
    }

    /// HKDF-SHA256 expansion of the root under a label.
    fn expand(&self, label: &[u8]) -> [u8; KEY_SIZE] {
        let hkdf = Hkdf::<Sha256>::new(None, &self.root);
        let mut out = [0u8; KEY_SIZE];
        let Ok(()) = hkdf.expand(label, &mut out) else {
            unreachable!("32 bytes is a valid HKDF-SHA256 output length");
        };
        out
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.root.zeroize();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.write_str("SessionKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> SessionKey {
        let mut root = [0u8; KEY_SIZE];
        for (i, byte) in root.iter_mut().enumerate() {
            *byte = i as u8;
        }
        SessionKey::from_bytes(root)
    }

    #[test]
    fn subkeys_differ_from_root_and_each_other() {
        let key = test_key();
        assert_ne!(&key.mac_key(), key.root_bytes());
        assert_ne!(&key.seal_key(), key.root_bytes());
        assert_ne!(key.mac_key(), key.seal_key());
    }

    #[test]
    fn subkey_derivation_is_deterministic() {
        let a = test_key();
        let b = test_key();
        assert_eq!(a.mac_key(), b.mac_key());
        assert_eq!(a.seal_key(), b.seal_key());
    }

    #[test]
    fn ratchet_replaces_root() {
        let mut key = test_key();
        let before = *key.root_bytes();
        key.ratchet();
        assert_ne!(key.root_bytes(), &before);
    }

    #[test]
    fn ratchet_is_deterministic() {
        let mut a = test_key();
        let mut b = test_key();
        for _ in 0..10 {
            a.ratchet();
            b.ratchet();
            assert_eq!(a.root_bytes(), b.root_bytes());
        }
    }

    #[test]
    fn ratchet_steps_produce_distinct_roots() {
        let mut key = test_key();
        let mut seen = Vec::new();
        for _ in 0..16 {
            key.ratchet();
            let root = *key.root_bytes();
            assert!(!seen.contains(&root), "ratchet produced a repeated root");
            seen.push(root);
        }
    }

    #[test]
    fn subkeys_change_after_ratchet() {
        let mut key = test_key();
        let mac_before = key.mac_key();
        let seal_before = key.seal_key();
        key.ratchet();
        assert_ne!(key.mac_key(), mac_before);
        assert_ne!(key.seal_key(), seal_before);
    }
}
