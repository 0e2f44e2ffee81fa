//! iDVV recovery chain.
//!
//! The chain turns provisioned material `(seed, static_key, master_key)`
//! into a sequence of verifiers: `idvv = H(seed || static_key)` initially,
//! then each advance computes `seed' = H(seed || idvv)` and
//! `idvv' = H(seed' || static_key)`. Two peers provisioned with the same
//! material and advancing in lockstep always hold the same verifier, and
//! from it both derive the same recovery key
//! `k_rec = H(master_key || idvv)` without it ever crossing the wire.
//!
//! # Security Properties
//!
//! - Advance-only: `(seed, idvv)` are consumed and replaced together on
//!   every advance; nothing in this module can rewind the chain, including
//!   a failed recovery exchange
//! - The verifier is not secret: it is safe to transmit, because deriving
//!   `k_rec` additionally requires the never-transmitted master key
//! - Determinism: identical inputs yield identical chains

use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::session_key::{KEY_SIZE, SessionKey};

/// Size of a chain verifier in bytes.
pub const VERIFIER_SIZE: usize = 32;

/// A chain output, transmitted hex-encoded in `REC` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verifier([u8; VERIFIER_SIZE]);

impl Verifier {
    /// Hex encoding for the wire (64 lowercase characters).
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Parse a wire verifier field.
    ///
    /// Returns `None` for anything that is not exactly 64 hex characters.
    pub fn from_hex(field: &str) -> Option<Self> {
        let bytes = hex::decode(field).ok()?;
        let bytes: [u8; VERIFIER_SIZE] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Raw verifier bytes.
    pub fn as_bytes(&self) -> &[u8; VERIFIER_SIZE] {
        &self.0
    }
}

/// Provisioned per-client chain inputs.
///
/// Supplied out of band (configuration on the server, credentials on the
/// client); both ends of a session must hold identical material.
#[derive(Clone)]
pub struct RecoveryMaterial {
    /// Initial chain seed
    pub seed: [u8; 32],
    /// Static chain key, mixed into every verifier
    pub static_key: [u8; 32],
    /// Long-lived master key; combines with a verifier into `k_rec`
    pub master_key: [u8; 32],
}

impl std::fmt::Debug for RecoveryMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RecoveryMaterial(..)")
    }
}

/// The evolving chain state for one session.
///
/// Created at session setup from [`RecoveryMaterial`]; advanced once per
/// recovery event; never reset or rewound within the session's lifetime.
pub struct KeyChain {
    seed: [u8; 32],
    static_key: [u8; 32],
    master_key: [u8; 32],
    idvv: [u8; VERIFIER_SIZE],
}

impl KeyChain {
    /// Initialize a chain: `idvv = H(seed || static_key)`.
    pub fn new(material: &RecoveryMaterial) -> Self {
        let idvv = digest_pair(&material.seed, &material.static_key);
        Self {
            seed: material.seed,
            static_key: material.static_key,
            master_key: material.master_key,
            idvv,
        }
    }

    /// The chain's current verifier.
    pub fn current_verifier(&self) -> Verifier {
        Verifier(self.idvv)
    }

    /// Advance the chain one step and return the new verifier.
    ///
    /// `seed` and `idvv` are consumed and replaced together; the previous
    /// values are zeroized and unrecoverable.
    pub fn advance(&mut self) -> Verifier {
        let mut next_seed = digest_pair(&self.seed, &self.idvv);
        let next_idvv = digest_pair(&next_seed, &self.static_key);

        self.seed.zeroize();
        self.seed = next_seed;
        next_seed.zeroize();

        self.idvv = next_idvv;
        Verifier(self.idvv)
    }

    /// Derive the recovery key from the current verifier:
    /// `k_rec = H(master_key || idvv)`.
    pub fn recovery_key(&self) -> SessionKey {
        let root = digest_pair(&self.master_key, &self.idvv);
        SessionKey::from_bytes(root)
    }
}

impl Drop for KeyChain {
    fn drop(&mut self) {
        self.seed.zeroize();
        self.static_key.zeroize();
        self.master_key.zeroize();
        self.idvv.zeroize();
    }
}

impl std::fmt::Debug for KeyChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyChain(..)")
    }
}

/// SHA-256 over the concatenation of two byte strings.
fn digest_pair(a: &[u8], b: &[u8]) -> [u8; KEY_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}
