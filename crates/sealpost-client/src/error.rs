//! Client error types.

use sealpost_core::EngineError;
use sealpost_proto::ProtocolError;
use thiserror::Error;

/// Errors from client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Socket I/O failed (includes the peer closing the connection).
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// A read did not complete within the configured timeout.
    #[error("read timed out after {seconds}s")]
    Timeout {
        /// The configured timeout, in seconds
        seconds: u64,
    },

    /// A setup frame (public key, greeting) had the wrong shape.
    #[error("malformed setup frame: {reason}")]
    Setup {
        /// What was wrong with the frame
        reason: &'static str,
    },

    /// The server declined the identification.
    #[error("server rejected identification: {greeting}")]
    Rejected {
        /// The greeting the server sent instead of a welcome
        greeting: String,
    },

    /// A protocol-level failure; the connection is no longer usable.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A wire-framing failure on a setup frame.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
