//! Fuzz target for the full inbound frame pipeline
//!
//! # Strategy
//!
//! - Arbitrary bytes through authenticate → tokenize → open → interpret
//! - A server session fed arbitrary frames must reject them all (it never
//!   holds the key the frames would need) without panicking
//!
//! # Invariants
//!
//! - NEVER panic on arbitrary input
//! - No arbitrary frame survives authentication under a fixed key
//! - A rejected frame leaves the mailbox untouched

#![no_main]

use libfuzzer_sys::fuzz_target;
use sealpost_core::{Environment, GroupDirectory, GroupMailbox, ServerSession, codec};
use sealpost_crypto::{RecoveryMaterial, SessionKey};

struct FixedEnv;

impl Environment for FixedEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        buffer.fill(0x5A);
    }
}

fuzz_target!(|data: &[u8]| {
    let key = SessionKey::from_bytes([0x42; 32]);

    // Raw decode must never panic
    let _ = codec::decode(&key, data);

    // A fuzzer without the key cannot produce an accepted frame
    let material = RecoveryMaterial {
        seed: [1; 32],
        static_key: [2; 32],
        master_key: [3; 32],
    };
    let directory = GroupDirectory::new([("G1", vec!["alice", "bob"])]);
    let mut mailbox = GroupMailbox::new();

    let mut session = ServerSession::new("alice", key, &material);
    let env = FixedEnv;
    session
        .notify_pending(&mailbox, &env)
        .expect("notify for an empty mailbox must encode");

    let result = session.handle_frame(data, &directory, &mut mailbox, &env);
    assert!(result.is_err(), "unauthenticated frame must be rejected");
    assert_eq!(mailbox.queue_depth("bob"), 0);
});
