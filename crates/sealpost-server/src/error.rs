//! Server error types.

use sealpost_core::EngineError;
use sealpost_proto::ProtocolError;
use thiserror::Error;

/// Errors from server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Socket I/O failed.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// A read did not complete within the configured timeout.
    #[error("read timed out after {seconds}s")]
    Timeout {
        /// The configured timeout, in seconds
        seconds: u64,
    },

    /// A setup frame (public key, identifier) had the wrong shape.
    #[error("malformed setup frame: {reason}")]
    Setup {
        /// What was wrong with the frame
        reason: &'static str,
    },

    /// A client identified with an id the server has no material for.
    #[error("unknown client {client_id:?}")]
    UnknownClient {
        /// The identifier the client announced
        client_id: String,
    },

    /// The connection's engine rejected a frame; the connection is closed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A wire-framing failure on a setup frame.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
