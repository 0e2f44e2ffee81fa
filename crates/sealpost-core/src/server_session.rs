//! Server-side per-connection engine.
//!
//! Pure state machine: frames in, at most one response frame out. The
//! runtime owns the transport and the locks around the shared mailbox; this
//! type owns everything per-connection: the session key, the nonce
//! counters, and the recovery chain.

use sealpost_crypto::{KeyChain, RecoveryMaterial, SessionKey};
use sealpost_proto::{CommandBody, Frame, GetOutcome, Opcode, PutOutcome, StoredMessage};

use crate::{
    codec::{self, Command},
    env::Environment,
    error::{EngineError, Result},
    mailbox::{GroupDirectory, GroupMailbox, PendingMessage},
    session::{ConnectionState, NonceCounters},
};

/// A recovery exchange awaiting the client's final confirmation.
struct PendingRecovery {
    /// Candidate recovery key; becomes the session key on confirmation
    key: SessionKey,
    /// Nonce of the `RCA` frame the confirmation must acknowledge
    rca_nonce: u64,
}

/// One client's connection, as the server sees it.
///
/// Created after the setup exchange (key agreement + identification) has
/// produced a session key and confirmed the client id. Any engine error
/// moves the session to [`ConnectionState::Closed`]; the caller must then
/// drop the transport.
pub struct ServerSession {
    client_id: String,
    state: ConnectionState,
    key: SessionKey,
    counters: NonceCounters,
    chain: KeyChain,
    pending_recovery: Option<PendingRecovery>,
}

impl ServerSession {
    /// Create a session for an identified client.
    pub fn new(client_id: impl Into<String>, key: SessionKey, material: &RecoveryMaterial) -> Self {
        Self {
            client_id: client_id.into(),
            state: ConnectionState::Identified,
            key,
            counters: NonceCounters::new(),
            chain: KeyChain::new(material),
            pending_recovery: None,
        }
    }

    /// The identifier this session belongs to.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Build the initial pending-notification frame and activate the
    /// session.
    ///
    /// The notification is part of connection setup: it carries wire
    /// nonce 0 but does not advance either direction counter. Command
    /// sequencing starts with the first client command after this frame.
    pub fn notify_pending(&mut self, mailbox: &GroupMailbox, env: &impl Environment) -> Result<Frame> {
        if self.state != ConnectionState::Identified {
            self.state = ConnectionState::Closed;
            return Err(EngineError::UnexpectedCommand { opcode: Opcode::Notify });
        }

        let groups = mailbox.pending_groups(&self.client_id);
        tracing::debug!(client = %self.client_id, pending = groups.len(), "notifying client");

        let frame = codec::encode_sealed(&self.key, 0, &CommandBody::Notify { groups }, env)?;
        self.state = ConnectionState::Active;
        Ok(frame)
    }

    /// Process one inbound frame, returning the response frame if the
    /// command produces one.
    ///
    /// On error the session is `Closed` and the caller must tear down the
    /// transport; no response is sent for a rejected frame.
    pub fn handle_frame(
        &mut self,
        frame: &[u8],
        directory: &GroupDirectory,
        mailbox: &mut GroupMailbox,
        env: &impl Environment,
    ) -> Result<Option<Frame>> {
        let result = self.dispatch(frame, directory, mailbox, env);
        if let Err(error) = &result {
            tracing::warn!(client = %self.client_id, %error, "closing session");
            self.state = ConnectionState::Closed;
        }
        result
    }

    fn dispatch(
        &mut self,
        frame: &[u8],
        directory: &GroupDirectory,
        mailbox: &mut GroupMailbox,
        env: &impl Environment,
    ) -> Result<Option<Frame>> {
        // A recovery in flight claims the next frame: it must be the KEY
        // confirmation, sealed under the candidate key.
        if let Some(pending) = self.pending_recovery.take() {
            return self.finish_recovery(pending, frame);
        }

        let decoded = codec::decode(&self.key, frame)?;
        if self.state != ConnectionState::Active {
            return Err(EngineError::UnexpectedCommand { opcode: decoded.command.opcode() });
        }
        self.counters.accept_recv(decoded.nonce)?;

        match decoded.command {
            Command::Sealed(CommandBody::Put { group, message }) => {
                self.handle_put(group, message, directory, mailbox, env).map(Some)
            },
            Command::Sealed(CommandBody::Get { group }) => {
                self.handle_get(group, directory, mailbox, env).map(Some)
            },
            Command::Recover(verifier) => {
                self.handle_recover(verifier, decoded.nonce, env).map(Some)
            },
            other => Err(EngineError::UnexpectedCommand { opcode: other.opcode() }),
        }
    }

    /// `PUT`: queue the message for every other member, answer with the
    /// outcome, and ratchet after a delivered publish.
    fn handle_put(
        &mut self,
        group: String,
        message: String,
        directory: &GroupDirectory,
        mailbox: &mut GroupMailbox,
        env: &impl Environment,
    ) -> Result<Frame> {
        let outcome = if !directory.contains_group(&group) {
            PutOutcome::UnknownGroup
        } else if !directory.is_member(&group, &self.client_id) {
            PutOutcome::NotAMember
        } else {
            if let Some(members) = directory.members(&group) {
                for member in members {
                    if member != &self.client_id {
                        mailbox.enqueue(
                            member,
                            PendingMessage {
                                group: group.clone(),
                                sender: self.client_id.clone(),
                                text: message.clone(),
                            },
                        );
                    }
                }
            }
            PutOutcome::Delivered
        };

        tracing::info!(client = %self.client_id, %group, ?outcome, "publish handled");

        let nonce = self.counters.claim_send();
        let frame = codec::encode_sealed(&self.key, nonce, &CommandBody::PutAck { outcome }, env)?;

        // Both peers advance their key after a delivered publish; the
        // acknowledgment itself still travels under the pre-ratchet key.
        if outcome == PutOutcome::Delivered {
            self.key.ratchet();
        }

        Ok(frame)
    }

    /// `GET`: pop the oldest matching pending message, or answer with an
    /// explicit empty/unknown outcome.
    fn handle_get(
        &mut self,
        group: String,
        directory: &GroupDirectory,
        mailbox: &mut GroupMailbox,
        env: &impl Environment,
    ) -> Result<Frame> {
        let outcome = if directory.contains_group(&group) {
            match mailbox.dequeue_matching(&self.client_id, &group) {
                Some(message) => GetOutcome::Message(StoredMessage {
                    sender: message.sender,
                    text: message.text,
                }),
                None => GetOutcome::Empty,
            }
        } else {
            GetOutcome::UnknownGroup
        };

        tracing::debug!(client = %self.client_id, %group, "fetch handled");

        let nonce = self.counters.claim_send();
        codec::encode_sealed(&self.key, nonce, &CommandBody::GetAck { group, outcome }, env)
    }

    /// `REC`: advance the local chain, require it to match the peer's
    /// verifier, and answer under the candidate recovery key.
    fn handle_recover(
        &mut self,
        verifier: sealpost_crypto::Verifier,
        rec_nonce: u64,
        env: &impl Environment,
    ) -> Result<Frame> {
        // The chain advances before any check and is never rolled back,
        // even if this exchange fails.
        let expected = self.chain.advance();
        if expected != verifier {
            return Err(EngineError::Recovery { reason: "chain verifier mismatch" });
        }

        let candidate = self.chain.recovery_key();
        let nonce = self.counters.claim_send();
        let frame = codec::encode_sealed(
            &candidate,
            nonce,
            &CommandBody::RecAck { ack_nonce: rec_nonce },
            env,
        )?;

        tracing::info!(client = %self.client_id, "recovery initiated");
        self.pending_recovery = Some(PendingRecovery { key: candidate, rca_nonce: nonce });
        Ok(frame)
    }

    /// Final leg of a recovery: the client's `KEY` confirmation, sealed
    /// under the candidate key, proves it derived the same `k_rec`.
    fn finish_recovery(&mut self, pending: PendingRecovery, frame: &[u8]) -> Result<Option<Frame>> {
        let decoded = codec::decode(&pending.key, frame)
            .map_err(|_| EngineError::Recovery { reason: "confirmation failed to verify" })?;
        self.counters.accept_recv(decoded.nonce)?;

        match decoded.command {
            Command::Sealed(CommandBody::Key { ack_nonce }) if ack_nonce == pending.rca_nonce => {
                self.key = pending.key;
                tracing::info!(client = %self.client_id, "recovery complete, session key replaced");
                Ok(None)
            },
            Command::Sealed(CommandBody::Key { .. }) => {
                Err(EngineError::Recovery { reason: "confirmation acknowledged the wrong nonce" })
            },
            other => Err(EngineError::UnexpectedCommand { opcode: other.opcode() }),
        }
    }
}

impl std::fmt::Debug for ServerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSession")
            .field("client_id", &self.client_id)
            .field("state", &self.state)
            .field("recovery_pending", &self.pending_recovery.is_some())
            .finish()
    }
}
