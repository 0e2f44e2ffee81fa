//! Bootstrap key agreement and session-key derivation.
//!
//! Each peer generates an x25519 key pair, exchanges 32-byte public keys
//! over the transport, and computes the shared secret. The session root key
//! is then derived with PBKDF2-HMAC-SHA256 under fixed parameters, so two
//! independent implementations of this module derive byte-identical keys
//! from the same agreed secret.

use pbkdf2::pbkdf2_hmac;
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::session_key::{KEY_SIZE, SessionKey};

/// PBKDF2 iteration count. Fixed for cross-implementation interoperability.
pub const DERIVE_ITERATIONS: u32 = 10_000;

/// PBKDF2 salt. Empty, matching the derivation contract.
const DERIVE_SALT: &[u8] = b"";

/// One side of an x25519 key agreement.
pub struct KeyAgreement {
    secret: StaticSecret,
}

impl KeyAgreement {
    /// Generate a fresh key pair from a cryptographic RNG.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self { secret: StaticSecret::random_from_rng(rng) }
    }

    /// Rebuild a key pair from fixed secret bytes (deterministic tests).
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        Self { secret: StaticSecret::from(bytes) }
    }

    /// The 32-byte public value to send to the peer.
    pub fn public_bytes(&self) -> [u8; 32] {
        *PublicKey::from(&self.secret).as_bytes()
    }

    /// Complete the agreement with the peer's public value and derive the
    /// session key.
    pub fn agree(self, peer_public: &[u8; 32]) -> SessionKey {
        let shared = self.secret.diffie_hellman(&PublicKey::from(*peer_public));
        derive_session_key(shared.as_bytes())
    }
}

impl std::fmt::Debug for KeyAgreement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyAgreement(..)")
    }
}

/// Derive the session root key from an agreed shared secret.
///
/// PBKDF2-HMAC-SHA256, [`DERIVE_ITERATIONS`] iterations, empty salt,
/// 32-byte output. Both the iteration count and the output length are part
/// of the interoperability contract and must not change.
pub fn derive_session_key(shared_secret: &[u8]) -> SessionKey {
    let mut root = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(shared_secret, DERIVE_SALT, DERIVE_ITERATIONS, &mut root);
    SessionKey::from_bytes(root)
}
