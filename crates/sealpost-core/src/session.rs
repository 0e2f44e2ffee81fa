//! Connection state and per-direction nonce sequencing.

use crate::error::{EngineError, Result};

/// Lifecycle of one protocol connection.
///
/// ```text
/// Connecting ──► Identified ──► Active ──► Closed
/// ```
///
/// - `Connecting → Identified`: key agreement and peer-identifier exchange
///   completed
/// - `Identified → Active`: the initial pending-notification frame has been
///   sent (server) or accepted (client)
/// - any engine error sends the connection to `Closed`; there is no retry
///   at this layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport established, setup exchange in progress
    Connecting,
    /// Peer identifier exchanged, notification pending
    Identified,
    /// Command exchanges allowed
    Active,
    /// Torn down; no further frames in either direction
    Closed,
}

/// Per-direction expected-nonce counters.
///
/// Both counters start at 0 when the session becomes Active and advance by
/// one per accepted command in their direction. The setup exchange
/// (including the initial notification frame) does not touch them.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonceCounters {
    send: u64,
    recv: u64,
}

impl NonceCounters {
    /// Fresh counters, both directions at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next outbound nonce, advancing the send counter.
    pub fn claim_send(&mut self) -> u64 {
        let nonce = self.send;
        self.send += 1;
        nonce
    }

    /// Accept an inbound nonce, advancing the receive counter.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Sequence`] when `received` is not exactly the
    /// expected value; replays and gaps are both fatal.
    pub fn accept_recv(&mut self, received: u64) -> Result<()> {
        if received != self.recv {
            return Err(EngineError::Sequence { expected: self.recv, received });
        }
        self.recv += 1;
        Ok(())
    }

    /// The nonce the next inbound command must carry.
    pub fn expected_recv(&self) -> u64 {
        self.recv
    }
}
