//! Fixed-size padded frame encode/decode.
//!
//! Every protocol message occupies exactly [`FRAME_SIZE`] bytes on the wire:
//! the UTF-8 payload text, right-padded with ASCII spaces. Fixed-size frames
//! keep the read loop trivial (one `read_exact` per command) and hide the
//! length of short commands from a passive observer.

use crate::errors::{ProtocolError, Result};

/// Total size of a frame on the wire, in bytes.
pub const FRAME_SIZE: usize = 512;

/// One space-padded wire frame.
///
/// # Invariants
///
/// - The buffer is always exactly [`FRAME_SIZE`] bytes.
/// - Bytes after the payload are ASCII spaces (`0x20`).
/// - The payload region is valid UTF-8 (enforced at construction).
///
/// # Known limitation
///
/// Padding and payload share the space character: a payload whose own text
/// ends in spaces cannot be distinguished from padding and will come back
/// shortened by [`Frame::decode`]. The protocol inherits this from its wire
/// format; an explicit length prefix would be the replacement if the frame
/// layout is ever revised. Command payloads produced by this workspace
/// (base64url tokens, hex verifiers, decimal nonces) never end in a space,
/// so the ambiguity is confined to the plain setup frames.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; FRAME_SIZE],
}

impl Frame {
    /// Encode a payload string into a padded frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Oversize`] when the UTF-8 encoding of
    /// `payload` exceeds [`FRAME_SIZE`] bytes.
    pub fn encode(payload: &str) -> Result<Self> {
        let encoded = payload.as_bytes();
        if encoded.len() > FRAME_SIZE {
            return Err(ProtocolError::Oversize { size: encoded.len(), max: FRAME_SIZE });
        }

        let mut bytes = [b' '; FRAME_SIZE];
        bytes[..encoded.len()].copy_from_slice(encoded);
        Ok(Self { bytes })
    }

    /// Decode a received frame back into its payload string.
    ///
    /// Strips trailing ASCII spaces only; interior spaces are preserved.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::WrongFrameSize`] when `bytes` is not exactly
    ///   [`FRAME_SIZE`] bytes
    /// - [`ProtocolError::InvalidUtf8`] when the buffer is not UTF-8
    pub fn decode(bytes: &[u8]) -> Result<String> {
        if bytes.len() != FRAME_SIZE {
            return Err(ProtocolError::WrongFrameSize { size: bytes.len(), expected: FRAME_SIZE });
        }

        let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)?;
        Ok(text.trim_end_matches(' ').to_string())
    }

    /// The full padded wire representation.
    pub fn as_bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.bytes
    }

    /// The payload with padding stripped.
    pub fn payload(&self) -> Result<String> {
        Self::decode(&self.bytes)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Padding is noise; show the payload region only
        match Self::decode(&self.bytes) {
            Ok(payload) => f.debug_struct("Frame").field("payload", &payload).finish(),
            Err(_) => f.debug_struct("Frame").field("payload", &"<invalid>").finish(),
        }
    }
}
