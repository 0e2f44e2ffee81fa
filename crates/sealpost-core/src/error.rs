//! Engine error taxonomy.
//!
//! Every variant is connection-fatal: the runtime that owns the transport
//! closes the connection when one surfaces. Conditions that are part of the
//! protocol conversation (an unknown group, an empty mailbox) are NOT
//! errors; they travel back to the peer as explicit command outcomes.

use sealpost_crypto::CryptoError;
use sealpost_proto::{Opcode, ProtocolError};

/// Convenience result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Fatal protocol failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A locally built payload exceeds the frame capacity.
    #[error("oversize payload: {0}")]
    Oversize(ProtocolError),

    /// Frame authentication tag did not verify.
    ///
    /// The frame's remaining fields are never parsed or decrypted.
    #[error("frame failed authentication")]
    Authentication,

    /// A ciphertext token failed to open (wrong key or tampering).
    #[error("payload failed to decrypt")]
    Decryption,

    /// The frame does not match the `CMD/nonce/body/tag` shape.
    #[error("malformed frame: {0}")]
    Malformed(ProtocolError),

    /// Received nonce does not match the expected sequence value.
    #[error("nonce out of sequence: expected {expected}, received {received}")]
    Sequence {
        /// The counter's expected value
        expected: u64,
        /// The nonce carried by the frame
        received: u64,
    },

    /// A recovery exchange failed to verify.
    ///
    /// The chain state has already advanced and stays advanced; only the
    /// connection dies.
    #[error("recovery failed: {reason}")]
    Recovery {
        /// What did not verify
        reason: &'static str,
    },

    /// A well-formed command arrived where the state machine does not
    /// allow it (e.g. a server-only command sent to the server).
    #[error("command {opcode} not valid in the current state")]
    UnexpectedCommand {
        /// The out-of-place command
        opcode: Opcode,
    },
}

impl From<ProtocolError> for EngineError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Oversize { .. } => Self::Oversize(err),
            _ => Self::Malformed(err),
        }
    }
}

impl From<CryptoError> for EngineError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Decryption => Self::Decryption,
        }
    }
}
