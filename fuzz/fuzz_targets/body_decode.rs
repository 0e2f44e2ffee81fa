//! Fuzz target for CBOR command-body deserialization
//!
//! # Strategy
//!
//! - Arbitrary bytes decoded against every opcode's body shape
//! - Type confusion: bytes valid for one opcode fed to another
//!
//! # Invariants
//!
//! - NEVER panic on malformed CBOR
//! - Decoding completes quickly (no unbounded allocation from claimed
//!   lengths)

#![no_main]

use libfuzzer_sys::fuzz_target;
use sealpost_proto::{CommandBody, Opcode};

const OPCODES: [Opcode; 7] = [
    Opcode::Put,
    Opcode::PutAck,
    Opcode::Get,
    Opcode::GetAck,
    Opcode::Notify,
    Opcode::Key,
    Opcode::RecAck,
];

fuzz_target!(|data: &[u8]| {
    for opcode in OPCODES {
        if let Ok(body) = CommandBody::decode(opcode, data) {
            // Anything that decodes must re-encode and decode to the same
            // value
            let bytes = body.encode().expect("decoded body must re-encode");
            let again = CommandBody::decode(opcode, &bytes).expect("re-encoded body must decode");
            assert_eq!(body, again);
        }
    }
});
