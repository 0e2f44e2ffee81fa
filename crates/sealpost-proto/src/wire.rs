//! Strict field tokenizer for the `CMD/nonce/body/tag` layout.
//!
//! Splitting happens only after the authentication tag has been verified by
//! the caller; this module validates shape, not authenticity. Every field is
//! checked against its expected alphabet so a frame either parses into a
//! [`WireCommand`] or fails with a typed error; there is no partial parse.

use crate::{
    command::Opcode,
    errors::{ProtocolError, Result},
};

/// Length of the hex-encoded authentication tag field.
pub const TAG_LEN: usize = 64;

/// A tokenized wire command, borrowing from the stripped frame payload.
///
/// The `body` field is still opaque at this layer: a base64url ciphertext
/// token for sealed commands, or a hex chain verifier for `REC`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireCommand<'a> {
    /// Command opcode
    pub opcode: Opcode,
    /// Per-direction sequence nonce
    pub nonce: u64,
    /// Opaque body field
    pub body: &'a str,
    /// Authentication tag (64 lowercase hex chars)
    pub tag: &'a str,
}

impl<'a> WireCommand<'a> {
    /// Tokenize a stripped frame payload into its four fields.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::FieldCount`] if the payload does not split into
    ///   exactly four fields
    /// - [`ProtocolError::UnknownCommand`] for an unrecognized opcode tag
    /// - [`ProtocolError::InvalidNonce`] for a non-decimal nonce field
    /// - [`ProtocolError::InvalidTagField`] for a tag that is not 64
    ///   lowercase hex characters
    /// - [`ProtocolError::InvalidBodyCharset`] for a body containing
    ///   characters outside the token/verifier alphabets
    pub fn parse(payload: &'a str) -> Result<Self> {
        let fields: Vec<&str> = payload.split('/').collect();
        let &[cmd, nonce, body, tag] = fields.as_slice() else {
            return Err(ProtocolError::FieldCount { found: fields.len() });
        };

        let opcode = Opcode::from_wire_tag(cmd)?;

        let nonce: u64 = nonce
            .parse()
            .map_err(|_| ProtocolError::InvalidNonce { field: nonce.to_string() })?;

        if tag.len() != TAG_LEN || !tag.bytes().all(is_lower_hex) {
            return Err(ProtocolError::InvalidTagField);
        }

        if !body.bytes().all(is_body_char) {
            return Err(ProtocolError::InvalidBodyCharset);
        }

        Ok(Self { opcode, nonce, body, tag })
    }

    /// The authenticated prefix of a wire payload: everything before the
    /// tag field, including the trailing `/`.
    ///
    /// `render(op, n, body) + tag` reconstructs the full payload, so the
    /// tag covers the opcode, nonce, and body exactly as transmitted.
    pub fn render_authenticated(opcode: Opcode, nonce: u64, body: &str) -> String {
        format!("{}/{nonce}/{body}/", opcode.wire_tag())
    }
}

/// Lowercase hex alphabet (tags and chain verifiers).
fn is_lower_hex(b: u8) -> bool {
    b.is_ascii_digit() || (b'a'..=b'f').contains(&b)
}

/// Union of the base64url and hex alphabets used by body fields.
fn is_body_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'='
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_of(byte: char) -> String {
        std::iter::repeat_n(byte, TAG_LEN).collect()
    }

    #[test]
    fn parses_well_formed_payload() {
        let payload = format!("PUT/7/dG9rZW4=/{}", tag_of('a'));
        let cmd = WireCommand::parse(&payload).unwrap();
        assert_eq!(cmd.opcode, Opcode::Put);
        assert_eq!(cmd.nonce, 7);
        assert_eq!(cmd.body, "dG9rZW4=");
        assert_eq!(cmd.tag, tag_of('a'));
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(
            WireCommand::parse("PUT/7/body").unwrap_err(),
            ProtocolError::FieldCount { found: 3 }
        );
        let five = format!("PUT/7/a/b/{}", tag_of('a'));
        assert_eq!(
            WireCommand::parse(&five).unwrap_err(),
            ProtocolError::FieldCount { found: 5 }
        );
    }

    #[test]
    fn rejects_unknown_command() {
        let payload = format!("ZZZ/0/body/{}", tag_of('a'));
        assert!(matches!(
            WireCommand::parse(&payload),
            Err(ProtocolError::UnknownCommand { tag }) if tag == "ZZZ"
        ));
    }

    #[test]
    fn rejects_non_decimal_nonce() {
        let payload = format!("GET/x1/body/{}", tag_of('a'));
        assert!(matches!(WireCommand::parse(&payload), Err(ProtocolError::InvalidNonce { .. })));

        // Negative numbers are not valid u64 nonces
        let payload = format!("GET/-1/body/{}", tag_of('a'));
        assert!(matches!(WireCommand::parse(&payload), Err(ProtocolError::InvalidNonce { .. })));
    }

    #[test]
    fn rejects_bad_tag_shapes() {
        let short = "PUT/0/body/abcd";
        assert_eq!(WireCommand::parse(short).unwrap_err(), ProtocolError::InvalidTagField);

        // Uppercase hex is not accepted
        let upper = format!("PUT/0/body/{}", tag_of('A'));
        assert_eq!(WireCommand::parse(&upper).unwrap_err(), ProtocolError::InvalidTagField);
    }

    #[test]
    fn rejects_body_outside_alphabet() {
        let payload = format!("PUT/0/bad body!/{}", tag_of('a'));
        assert_eq!(WireCommand::parse(&payload).unwrap_err(), ProtocolError::InvalidBodyCharset);
    }

    #[test]
    fn empty_body_is_structurally_valid() {
        let payload = format!("GET/0//{}", tag_of('b'));
        let cmd = WireCommand::parse(&payload).unwrap();
        assert_eq!(cmd.body, "");
    }

    #[test]
    fn authenticated_prefix_matches_wire_layout() {
        let prefix = WireCommand::render_authenticated(Opcode::Rec, 12, "00ff");
        assert_eq!(prefix, "REC/12/00ff/");

        let payload = format!("{prefix}{}", tag_of('c'));
        let cmd = WireCommand::parse(&payload).unwrap();
        assert_eq!(cmd.opcode, Opcode::Rec);
        assert_eq!(cmd.nonce, 12);
        assert_eq!(cmd.body, "00ff");
    }
}
