//! Fuzz target for frame decoding and field tokenization
//!
//! # Strategy
//!
//! - Raw bytes: arbitrary buffers through `Frame::decode`
//! - Stripped payloads: arbitrary strings through `WireCommand::parse`
//!
//! # Invariants
//!
//! - NEVER panic on arbitrary input
//! - A parse either yields exactly four validated fields or a typed error

#![no_main]

use libfuzzer_sys::fuzz_target;
use sealpost_proto::{Frame, WireCommand};

fuzz_target!(|data: &[u8]| {
    if let Ok(payload) = Frame::decode(data) {
        let _ = WireCommand::parse(&payload);
    }

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = WireCommand::parse(text);

        // Round-trip: anything that encodes must decode to itself when it
        // carries no trailing spaces
        let trimmed = text.trim_end_matches(' ');
        if let Ok(frame) = Frame::encode(trimmed) {
            let decoded = Frame::decode(frame.as_bytes()).expect("encoded frame must decode");
            assert_eq!(decoded, trimmed);
        }
    }
});
