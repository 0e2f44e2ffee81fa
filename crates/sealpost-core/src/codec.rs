//! Command ↔ frame codec.
//!
//! Outbound: CBOR-encode the body, seal it into a token, tag the
//! `CMD/nonce/token/` prefix, pad to a frame. Inbound runs the reverse
//! pipeline in the only safe order: authenticate the tag first, then
//! tokenize, then open the ciphertext, then interpret fields. A frame that
//! fails authentication is rejected before anything else in it is parsed.

use sealpost_crypto::{SessionKey, Verifier, authenticator, cipher_box};
use sealpost_proto::{CommandBody, Frame, Opcode, TAG_LEN, WireCommand};

use crate::{
    env::Environment,
    error::{EngineError, Result},
};

/// A decoded inbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A command whose body traveled sealed
    Sealed(CommandBody),
    /// A `REC` command carrying the chain verifier in the clear
    Recover(Verifier),
}

impl Command {
    /// The opcode of this command.
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Sealed(body) => body.opcode(),
            Self::Recover(_) => Opcode::Rec,
        }
    }
}

/// A decoded frame: its nonce and command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Sequence nonce carried by the frame
    pub nonce: u64,
    /// The command itself
    pub command: Command,
}

/// Encode a sealed command into a wire frame.
///
/// The AEAD nonce is drawn from `env`; the frame tag covers the opcode,
/// sequence nonce, and token exactly as transmitted.
pub fn encode_sealed(
    key: &SessionKey,
    nonce: u64,
    body: &CommandBody,
    env: &impl Environment,
) -> Result<Frame> {
    let plaintext = body.encode()?;

    let mut aead_nonce = [0u8; cipher_box::NONCE_SIZE];
    env.random_bytes(&mut aead_nonce);
    let token = cipher_box::seal(&key.seal_key(), &plaintext, &aead_nonce);

    assemble(key, body.opcode(), nonce, &token)
}

/// Encode a `REC` command into a wire frame.
///
/// The verifier travels hex-encoded and unsealed; it is authenticated by
/// the frame tag but is not secret.
pub fn encode_recover(key: &SessionKey, nonce: u64, verifier: Verifier) -> Result<Frame> {
    assemble(key, Opcode::Rec, nonce, &verifier.to_hex())
}

/// Tag the authenticated prefix and pad into a frame.
fn assemble(key: &SessionKey, opcode: Opcode, nonce: u64, body: &str) -> Result<Frame> {
    let prefix = WireCommand::render_authenticated(opcode, nonce, body);
    let tag = authenticator::tag(&key.mac_key(), prefix.as_bytes());
    Ok(Frame::encode(&format!("{prefix}{tag}"))?)
}

/// Decode and authenticate an inbound frame.
///
/// # Errors
///
/// - [`EngineError::Malformed`] for wrong frame size, bad UTF-8, field
///   shape, or an undecodable body
/// - [`EngineError::Authentication`] when the trailing tag does not verify;
///   nothing past the tag check is parsed in that case
/// - [`EngineError::Decryption`] when the sealed token fails to open
pub fn decode(key: &SessionKey, frame_bytes: &[u8]) -> Result<Decoded> {
    let payload = Frame::decode(frame_bytes)?;

    // Authenticate before parsing anything: the trailing TAG_LEN characters
    // are the tag, everything before them is covered by it.
    let bytes = payload.as_bytes();
    if bytes.len() <= TAG_LEN {
        return Err(EngineError::Authentication);
    }
    let (data, tag_bytes) = bytes.split_at(bytes.len() - TAG_LEN);
    let Ok(tag) = std::str::from_utf8(tag_bytes) else {
        return Err(EngineError::Authentication);
    };
    if !authenticator::verify(&key.mac_key(), data, tag) {
        return Err(EngineError::Authentication);
    }

    let wire = WireCommand::parse(&payload)?;

    let command = if wire.opcode.body_is_sealed() {
        let plaintext = cipher_box::open(&key.seal_key(), wire.body)?;
        Command::Sealed(CommandBody::decode(wire.opcode, &plaintext)?)
    } else {
        let verifier = Verifier::from_hex(wire.body)
            .ok_or(EngineError::Malformed(sealpost_proto::ProtocolError::InvalidBodyCharset))?;
        Command::Recover(verifier)
    };

    Ok(Decoded { nonce: wire.nonce, command })
}
