//! Command opcodes and CBOR-encoded command bodies.
//!
//! The frame carries the opcode as a 3-character text tag; the body content
//! travels as CBOR inside the ciphertext token. CBOR was kept from the
//! payload layer this protocol's stack already uses: self-describing, compact,
//! and no code generation.
//!
//! # Invariants
//!
//! - Each body variant maps to exactly one opcode (enforced by match
//!   exhaustiveness in [`CommandBody::opcode`]).
//! - The variant discriminator is NOT serialized: the wire opcode field
//!   already identifies the body type, so an attacker cannot send a
//!   mismatched opcode/body pair that decodes successfully as a different
//!   command.
//! - Round-trip encoding produces an equivalent value.

use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, Result};

/// The eight protocol commands and their 3-character wire tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Publish a message into a group
    Put,
    /// Server acknowledgment of a `PUT`
    PutAck,
    /// Request the oldest pending message in a group
    Get,
    /// Server response to a `GET`
    GetAck,
    /// Server-initiated listing of groups with pending messages
    Notify,
    /// Final confirmation of a completed recovery exchange
    Key,
    /// Initiate a recovery exchange (carries the chain verifier)
    Rec,
    /// Server acknowledgment of a `REC`, sealed under the recovery key
    RecAck,
}

impl Opcode {
    /// The 3-character tag used on the wire.
    pub const fn wire_tag(self) -> &'static str {
        match self {
            Self::Put => "PUT",
            Self::PutAck => "PTA",
            Self::Get => "GET",
            Self::GetAck => "GTA",
            Self::Notify => "NTF",
            Self::Key => "KEY",
            Self::Rec => "REC",
            Self::RecAck => "RCA",
        }
    }

    /// Parse a wire tag back into an opcode.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownCommand`] for anything that is not
    /// one of the eight known tags.
    pub fn from_wire_tag(tag: &str) -> Result<Self> {
        match tag {
            "PUT" => Ok(Self::Put),
            "PTA" => Ok(Self::PutAck),
            "GET" => Ok(Self::Get),
            "GTA" => Ok(Self::GetAck),
            "NTF" => Ok(Self::Notify),
            "KEY" => Ok(Self::Key),
            "REC" => Ok(Self::Rec),
            "RCA" => Ok(Self::RecAck),
            other => Err(ProtocolError::UnknownCommand { tag: other.to_string() }),
        }
    }

    /// Whether this command's body travels as a sealed ciphertext token.
    ///
    /// `REC` is the one exception: its body is the chain verifier, which is
    /// authenticated by the frame tag but not secret.
    pub const fn body_is_sealed(self) -> bool {
        !matches!(self, Self::Rec)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_tag())
    }
}

/// A message held by the server for a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Identifier of the publishing client
    pub sender: String,
    /// The published text
    pub text: String,
}

/// Result of a publish request, carried inside the `PTA` body.
///
/// The reference behavior for an unknown group or a non-member sender was a
/// silent drop; these variants make the rejection explicit and observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PutOutcome {
    /// Message queued for every other group member
    Delivered,
    /// The named group does not exist
    UnknownGroup,
    /// The sender is not a member of the group
    NotAMember,
}

/// Result of a fetch request, carried inside the `GTA` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GetOutcome {
    /// The oldest pending message in the requested group
    Message(StoredMessage),
    /// The group exists but holds nothing for this client
    Empty,
    /// The named group does not exist
    UnknownGroup,
}

/// Decoded command bodies.
///
/// `Rec` carries its verifier directly in the wire body field (hex) rather
/// than as CBOR, so it has no variant here; see
/// [`Opcode::body_is_sealed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandBody {
    /// Publish `message` into `group`
    Put {
        /// Target group identifier
        group: String,
        /// Message text
        message: String,
    },
    /// Acknowledge a publish with its outcome
    PutAck {
        /// What happened to the publish request
        outcome: PutOutcome,
    },
    /// Request the oldest pending message in `group`
    Get {
        /// Group identifier to poll
        group: String,
    },
    /// Answer a fetch with its outcome
    GetAck {
        /// Group the fetch targeted
        group: String,
        /// What the mailbox held
        outcome: GetOutcome,
    },
    /// Groups holding pending messages for the recipient
    Notify {
        /// Distinct group identifiers, oldest-message-first
        groups: Vec<String>,
    },
    /// Prove possession of the recovery key (initiator side)
    Key {
        /// Nonce of the `RCA` frame being acknowledged
        ack_nonce: u64,
    },
    /// Prove possession of the recovery key (responder side)
    RecAck {
        /// Nonce of the `REC` frame being acknowledged
        ack_nonce: u64,
    },
}

impl CommandBody {
    /// The opcode this body belongs to.
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Put { .. } => Opcode::Put,
            Self::PutAck { .. } => Opcode::PutAck,
            Self::Get { .. } => Opcode::Get,
            Self::GetAck { .. } => Opcode::GetAck,
            Self::Notify { .. } => Opcode::Notify,
            Self::Key { .. } => Opcode::Key,
            Self::RecAck { .. } => Opcode::RecAck,
        }
    }

    /// Encode the body content as CBOR (no variant tag).
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::BodyEncode`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let result = match self {
            Self::Put { group, message } => {
                ciborium::ser::into_writer(&(group, message), &mut out)
            },
            Self::PutAck { outcome } => ciborium::ser::into_writer(outcome, &mut out),
            Self::Get { group } => ciborium::ser::into_writer(group, &mut out),
            Self::GetAck { group, outcome } => {
                ciborium::ser::into_writer(&(group, outcome), &mut out)
            },
            Self::Notify { groups } => ciborium::ser::into_writer(groups, &mut out),
            Self::Key { ack_nonce } => ciborium::ser::into_writer(ack_nonce, &mut out),
            Self::RecAck { ack_nonce } => ciborium::ser::into_writer(ack_nonce, &mut out),
        };
        result.map_err(|e| ProtocolError::BodyEncode(e.to_string()))?;
        Ok(out)
    }

    /// Decode a body for the given opcode.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::BodyDecode`] if the CBOR does not match the
    ///   opcode's body shape
    /// - [`ProtocolError::UnknownCommand`] for [`Opcode::Rec`], whose body
    ///   never reaches this decoder
    pub fn decode(opcode: Opcode, bytes: &[u8]) -> Result<Self> {
        fn read<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
            ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::BodyDecode(e.to_string()))
        }

        match opcode {
            Opcode::Put => {
                let (group, message): (String, String) = read(bytes)?;
                Ok(Self::Put { group, message })
            },
            Opcode::PutAck => Ok(Self::PutAck { outcome: read(bytes)? }),
            Opcode::Get => Ok(Self::Get { group: read(bytes)? }),
            Opcode::GetAck => {
                let (group, outcome): (String, GetOutcome) = read(bytes)?;
                Ok(Self::GetAck { group, outcome })
            },
            Opcode::Notify => Ok(Self::Notify { groups: read(bytes)? }),
            Opcode::Key => Ok(Self::Key { ack_nonce: read(bytes)? }),
            Opcode::RecAck => Ok(Self::RecAck { ack_nonce: read(bytes)? }),
            Opcode::Rec => {
                Err(ProtocolError::UnknownCommand { tag: Opcode::Rec.wire_tag().to_string() })
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_tags_round_trip() {
        for opcode in [
            Opcode::Put,
            Opcode::PutAck,
            Opcode::Get,
            Opcode::GetAck,
            Opcode::Notify,
            Opcode::Key,
            Opcode::Rec,
            Opcode::RecAck,
        ] {
            assert_eq!(Opcode::from_wire_tag(opcode.wire_tag()).unwrap(), opcode);
            assert_eq!(opcode.wire_tag().len(), 3);
        }
    }

    #[test]
    fn lowercase_tag_is_unknown() {
        assert!(matches!(
            Opcode::from_wire_tag("put"),
            Err(ProtocolError::UnknownCommand { .. })
        ));
    }

    #[test]
    fn only_rec_is_unsealed() {
        assert!(!Opcode::Rec.body_is_sealed());
        assert!(Opcode::Put.body_is_sealed());
        assert!(Opcode::RecAck.body_is_sealed());
    }

    #[test]
    fn bodies_round_trip() {
        let bodies = vec![
            CommandBody::Put { group: "G1".to_string(), message: "Olá grupo!".to_string() },
            CommandBody::PutAck { outcome: PutOutcome::Delivered },
            CommandBody::PutAck { outcome: PutOutcome::NotAMember },
            CommandBody::Get { group: "G2".to_string() },
            CommandBody::GetAck {
                group: "G1".to_string(),
                outcome: GetOutcome::Message(StoredMessage {
                    sender: "alice".to_string(),
                    text: "hi".to_string(),
                }),
            },
            CommandBody::GetAck { group: "G1".to_string(), outcome: GetOutcome::Empty },
            CommandBody::Notify { groups: vec!["G1".to_string(), "G3".to_string()] },
            CommandBody::Key { ack_nonce: 41 },
            CommandBody::RecAck { ack_nonce: 40 },
        ];

        for body in bodies {
            let bytes = body.encode().unwrap();
            let decoded = CommandBody::decode(body.opcode(), &bytes).unwrap();
            assert_eq!(decoded, body);
        }
    }

    #[test]
    fn body_decode_checks_shape() {
        // A Put body (two strings) does not decode as a Key body (u64)
        let bytes =
            CommandBody::Put { group: "G1".to_string(), message: "m".to_string() }
                .encode()
                .unwrap();
        assert!(matches!(
            CommandBody::decode(Opcode::Key, &bytes),
            Err(ProtocolError::BodyDecode(_))
        ));
    }

    #[test]
    fn rec_body_never_decodes_as_cbor() {
        assert!(CommandBody::decode(Opcode::Rec, &[]).is_err());
    }
}
