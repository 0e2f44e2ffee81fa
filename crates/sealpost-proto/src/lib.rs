//! Sealpost wire protocol.
//!
//! Defines the transport-facing representation of protocol commands:
//!
//! - [`Frame`]: a fixed 512-byte space-padded UTF-8 buffer, one command per
//!   frame
//! - [`Opcode`]: the eight command tags (`PUT`, `PTA`, `GET`, `GTA`, `NTF`,
//!   `KEY`, `REC`, `RCA`)
//! - [`CommandBody`]: CBOR-serialized command payloads (sealed by the crypto
//!   layer before they reach a frame)
//! - [`WireCommand`]: the strict `CMD/nonce/body/tag` field tokenizer
//!
//! The crate is purely structural: it never authenticates, encrypts, or
//! interprets command semantics. Authentication and sealing live in
//! `sealpost-crypto`; sequencing and dispatch live in `sealpost-core`.
//!
//! # Wire layout
//!
//! ```text
//! <CMD>/<nonce>/<body>/<64-hex-tag>          padded with ASCII spaces
//! |____________________|                      to exactly 512 bytes
//!   covered by the tag
//! ```
//!
//! The body field is a base64url ciphertext token for sealed commands, or a
//! 64-hex-char chain verifier for `REC`. Neither alphabet contains `/`, so
//! the field separator is unambiguous.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod command;
mod errors;
mod frame;
mod wire;

pub use command::{CommandBody, GetOutcome, Opcode, PutOutcome, StoredMessage};
pub use errors::{ProtocolError, Result};
pub use frame::{FRAME_SIZE, Frame};
pub use wire::{TAG_LEN, WireCommand};
