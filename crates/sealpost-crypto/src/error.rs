//! Crypto error types.

/// Errors from cryptographic operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// A ciphertext token failed to open.
    ///
    /// Malformed token, wrong key, and tampering all collapse into this one
    /// variant: the failure reason is never distinguishable to a peer.
    #[error("ciphertext token failed to open")]
    Decryption,
}
