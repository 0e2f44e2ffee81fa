//! Wire-level error taxonomy.

/// Convenience result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding wire frames.
///
/// Everything except [`ProtocolError::Oversize`] is a malformed-frame
/// condition: the bytes on the wire do not match the
/// `CMD/nonce/body/tag` shape. The engine treats all of these as
/// connection-fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Payload does not fit in a frame.
    #[error("payload of {size} bytes exceeds frame capacity of {max}")]
    Oversize {
        /// Encoded payload size in bytes
        size: usize,
        /// Frame capacity
        max: usize,
    },

    /// Frame is not exactly [`crate::FRAME_SIZE`] bytes.
    #[error("frame has {size} bytes, expected exactly {expected}")]
    WrongFrameSize {
        /// Received byte count
        size: usize,
        /// Required byte count
        expected: usize,
    },

    /// Frame bytes are not valid UTF-8.
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    /// Payload does not split into exactly four `/`-separated fields.
    #[error("expected 4 wire fields, found {found}")]
    FieldCount {
        /// Number of fields found
        found: usize,
    },

    /// Command tag is not one of the eight known opcodes.
    #[error("unknown command tag {tag:?}")]
    UnknownCommand {
        /// The offending tag
        tag: String,
    },

    /// Nonce field is not a decimal u64.
    #[error("nonce field {field:?} is not a decimal integer")]
    InvalidNonce {
        /// The offending field
        field: String,
    },

    /// Authentication tag field is not 64 lowercase hex characters.
    #[error("authentication tag field has invalid shape")]
    InvalidTagField,

    /// Body field contains characters outside its expected alphabet.
    #[error("body field contains invalid characters")]
    InvalidBodyCharset,

    /// CBOR serialization of a command body failed.
    #[error("body encoding failed: {0}")]
    BodyEncode(String),

    /// CBOR deserialization of a command body failed.
    #[error("body decoding failed: {0}")]
    BodyDecode(String),
}

impl ProtocolError {
    /// Whether this error is a malformed-frame condition (as opposed to an
    /// oversize payload produced locally).
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Self::Oversize { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversize_is_not_malformed() {
        let err = ProtocolError::Oversize { size: 600, max: 512 };
        assert!(!err.is_malformed());
        assert!(ProtocolError::FieldCount { found: 3 }.is_malformed());
    }

    #[test]
    fn display_includes_context() {
        let err = ProtocolError::UnknownCommand { tag: "XYZ".to_string() };
        assert!(err.to_string().contains("XYZ"));
    }
}
