//! Sealpost Cryptographic Primitives
//!
//! Cryptographic building blocks for the Sealpost protocol. Pure functions
//! with deterministic outputs; callers provide random bytes so every
//! operation can be tested deterministically.
//!
//! # Key Lifecycle
//!
//! ```text
//! x25519 agreement ──► PBKDF2 ──► Session root key
//!                                      │
//!                     ratchet (one-way, after each published message)
//!                                      │
//!                                      ▼
//!                         HKDF ──► MAC subkey / seal subkey
//!
//! (seed, static key) ──► iDVV chain ──► verifier
//!                                      │
//! master key ─────────── H(master || verifier) ──► recovery key
//! ```
//!
//! The session root key evolves forward only: ratchet steps and recovery
//! derivations are one-way, so compromise of the current key does not expose
//! keys used for earlier traffic, and the recovery chain lets both peers
//! reach a fresh shared key without ever transmitting it.
//!
//! # Security
//!
//! - Frame tags: HMAC-SHA256, compared in constant time
//! - Payload sealing: XChaCha20-Poly1305 with caller-supplied 24-byte nonces
//! - Ratchet: HMAC chain step, old root zeroized immediately
//! - Recovery chain: advance-only; a failed recovery never rewinds it

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod authenticator;
pub mod bootstrap;
pub mod cipher_box;
mod error;
pub mod recovery;
mod session_key;

pub use error::CryptoError;
pub use recovery::{KeyChain, RecoveryMaterial, VERIFIER_SIZE, Verifier};
pub use session_key::{KEY_SIZE, SessionKey};
