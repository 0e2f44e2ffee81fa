//! Payload sealing with `XChaCha20-Poly1305`.
//!
//! A sealed payload is a self-contained text token: a version byte, the
//! 24-byte nonce, and the AEAD ciphertext, base64url-encoded. The base64url
//! alphabet contains no `/`, so tokens can sit inside the `/`-separated wire
//! layout without escaping.
//!
//! All functions are pure: random nonce bytes are provided by the caller,
//! which keeps encryption deterministic under test.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};

use crate::{error::CryptoError, session_key::KEY_SIZE};

/// Size of the `XChaCha20` nonce carried in each token.
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size appended to the ciphertext.
const AEAD_TAG_SIZE: usize = 16;

/// Token format version byte.
const TOKEN_VERSION: u8 = 0x01;

/// Seal a plaintext into a text token under `key`.
///
/// The caller MUST supply a fresh random nonce per seal in production;
/// nonce reuse under the same key voids confidentiality.
pub fn seal(key: &[u8; KEY_SIZE], plaintext: &[u8], nonce: &[u8; NONCE_SIZE]) -> String {
    let cipher = XChaCha20Poly1305::new(key.into());
    let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(nonce), plaintext) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    let mut token = Vec::with_capacity(1 + NONCE_SIZE + ciphertext.len());
    token.push(TOKEN_VERSION);
    token.extend_from_slice(nonce);
    token.extend_from_slice(&ciphertext);

    URL_SAFE_NO_PAD.encode(token)
}

/// Open a token under `key`, returning the plaintext.
///
/// # Errors
///
/// Returns [`CryptoError::Decryption`] for every failure: malformed
/// encoding, unknown version, truncation, wrong key, or tampering. The
/// reason is deliberately not distinguishable by the peer.
pub fn open(key: &[u8; KEY_SIZE], token: &str) -> Result<Vec<u8>, CryptoError> {
    let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| CryptoError::Decryption)?;

    if bytes.len() < 1 + NONCE_SIZE + AEAD_TAG_SIZE || bytes[0] != TOKEN_VERSION {
        return Err(CryptoError::Decryption);
    }

    let nonce = XNonce::from_slice(&bytes[1..1 + NONCE_SIZE]);
    let ciphertext = &bytes[1 + NONCE_SIZE..];

    let cipher = XChaCha20Poly1305::new(key.into());
    cipher.decrypt(nonce, ciphertext).map_err(|_| CryptoError::Decryption)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; KEY_SIZE] {
        let mut key = [0u8; KEY_SIZE];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = (i * 7) as u8;
        }
        key
    }

    const NONCE: [u8; NONCE_SIZE] = [0xA5; NONCE_SIZE];

    #[test]
    fn seal_open_round_trip() {
        let key = test_key();
        let token = seal(&key, b"Ol\xc3\xa1 grupo!", &NONCE);
        assert_eq!(open(&key, &token).unwrap(), "Olá grupo!".as_bytes());
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let key = test_key();
        let token = seal(&key, b"", &NONCE);
        assert_eq!(open(&key, &token).unwrap(), b"");
    }

    #[test]
    fn token_stays_inside_wire_alphabet() {
        let key = test_key();
        let token = seal(&key, &[0u8; 300], &NONCE);
        assert!(token.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let token = seal(&test_key(), b"secret", &NONCE);
        let mut wrong = test_key();
        wrong[0] ^= 0x01;
        assert_eq!(open(&wrong, &token), Err(CryptoError::Decryption));
    }

    #[test]
    fn tampered_token_fails_to_open() {
        let key = test_key();
        let token = seal(&key, b"secret", &NONCE);

        let mut bytes = URL_SAFE_NO_PAD.decode(&token).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(bytes);

        assert_eq!(open(&key, &tampered), Err(CryptoError::Decryption));
    }

    #[test]
    fn malformed_tokens_fail_uniformly() {
        let key = test_key();
        assert_eq!(open(&key, ""), Err(CryptoError::Decryption));
        assert_eq!(open(&key, "not/base64url"), Err(CryptoError::Decryption));
        assert_eq!(open(&key, "dG9vc2hvcnQ"), Err(CryptoError::Decryption));
    }

    #[test]
    fn unknown_version_fails_to_open() {
        let key = test_key();
        let token = seal(&key, b"secret", &NONCE);

        let mut bytes = URL_SAFE_NO_PAD.decode(&token).unwrap();
        bytes[0] = 0x02;
        let rewritten = URL_SAFE_NO_PAD.encode(bytes);

        assert_eq!(open(&key, &rewritten), Err(CryptoError::Decryption));
    }

    #[test]
    fn different_nonces_produce_different_tokens() {
        let key = test_key();
        let a = seal(&key, b"same plaintext", &[0x00; NONCE_SIZE]);
        let b = seal(&key, b"same plaintext", &[0xFF; NONCE_SIZE]);
        assert_ne!(a, b);
    }
}
