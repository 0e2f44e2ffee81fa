//! Client-side per-connection engine.
//!
//! Mirror image of the server session: the caller sends the frames this
//! type builds and feeds back the responses. One command may be in flight
//! at a time; the pending-operation marker enforces the request/response
//! lockstep the nonce scheme assumes.

use sealpost_crypto::{KeyChain, RecoveryMaterial, SessionKey};
use sealpost_proto::{CommandBody, Frame, GetOutcome, Opcode, PutOutcome};

use crate::{
    codec::{self, Command},
    env::Environment,
    error::{EngineError, Result},
    session::{ConnectionState, NonceCounters},
};

/// The command currently awaiting its response.
enum PendingOp {
    /// A `PUT` awaiting its `PTA`
    Publish,
    /// A `GET` awaiting its `GTA`
    Fetch {
        /// Group the fetch targeted
        group: String,
    },
    /// A `REC` awaiting its `RCA`
    Recover {
        /// Candidate recovery key
        candidate: SessionKey,
        /// Nonce the `REC` frame carried
        rec_nonce: u64,
    },
}

/// One connection to the relay, as the client sees it.
///
/// Constructed after key agreement and identification; activated by
/// accepting the server's initial notification frame.
pub struct ClientSession {
    client_id: String,
    state: ConnectionState,
    key: SessionKey,
    counters: NonceCounters,
    chain: KeyChain,
    pending: Option<PendingOp>,
}

impl ClientSession {
    /// Create a session with the bootstrap session key.
    pub fn new(client_id: impl Into<String>, key: SessionKey, material: &RecoveryMaterial) -> Self {
        Self {
            client_id: client_id.into(),
            state: ConnectionState::Identified,
            key,
            counters: NonceCounters::new(),
            chain: KeyChain::new(material),
            pending: None,
        }
    }

    /// This client's identifier.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Accept the server's initial notification frame and activate the
    /// session. Returns the groups holding pending messages.
    ///
    /// The notification is a setup frame: it must carry wire nonce 0 and
    /// leaves both direction counters untouched.
    pub fn accept_notify(&mut self, frame: &[u8]) -> Result<Vec<String>> {
        let result = self.try_accept_notify(frame);
        self.close_on_error(&result);
        result
    }

    fn try_accept_notify(&mut self, frame: &[u8]) -> Result<Vec<String>> {
        if self.state != ConnectionState::Identified {
            return Err(EngineError::UnexpectedCommand { opcode: Opcode::Notify });
        }

        let decoded = codec::decode(&self.key, frame)?;
        if decoded.nonce != 0 {
            return Err(EngineError::Sequence { expected: 0, received: decoded.nonce });
        }

        match decoded.command {
            Command::Sealed(CommandBody::Notify { groups }) => {
                self.state = ConnectionState::Active;
                Ok(groups)
            },
            other => Err(EngineError::UnexpectedCommand { opcode: other.opcode() }),
        }
    }

    /// Build a `PUT` frame publishing `message` into `group`.
    pub fn publish_frame(
        &mut self,
        group: &str,
        message: &str,
        env: &impl Environment,
    ) -> Result<Frame> {
        let result = self.start_command(Opcode::Put).and_then(|()| {
            let nonce = self.counters.claim_send();
            let body = CommandBody::Put {
                group: group.to_string(),
                message: message.to_string(),
            };
            let frame = codec::encode_sealed(&self.key, nonce, &body, env)?;
            self.pending = Some(PendingOp::Publish);
            Ok(frame)
        });
        self.close_on_error(&result);
        result
    }

    /// Accept the `PTA` answering an outstanding publish.
    ///
    /// A delivered publish ratchets the session key, in lockstep with the
    /// server.
    pub fn accept_put_ack(&mut self, frame: &[u8]) -> Result<PutOutcome> {
        let result = self.try_accept_put_ack(frame);
        self.close_on_error(&result);
        result
    }

    fn try_accept_put_ack(&mut self, frame: &[u8]) -> Result<PutOutcome> {
        match self.take_pending(Opcode::PutAck)? {
            PendingOp::Publish => {},
            _ => return Err(EngineError::UnexpectedCommand { opcode: Opcode::PutAck }),
        }

        let decoded = codec::decode(&self.key, frame)?;
        self.counters.accept_recv(decoded.nonce)?;

        match decoded.command {
            Command::Sealed(CommandBody::PutAck { outcome }) => {
                if outcome == PutOutcome::Delivered {
                    self.key.ratchet();
                }
                Ok(outcome)
            },
            other => Err(EngineError::UnexpectedCommand { opcode: other.opcode() }),
        }
    }

    /// Build a `GET` frame requesting the oldest pending message in
    /// `group`.
    pub fn fetch_frame(&mut self, group: &str, env: &impl Environment) -> Result<Frame> {
        let result = self.start_command(Opcode::Get).and_then(|()| {
            let nonce = self.counters.claim_send();
            let body = CommandBody::Get { group: group.to_string() };
            let frame = codec::encode_sealed(&self.key, nonce, &body, env)?;
            self.pending = Some(PendingOp::Fetch { group: group.to_string() });
            Ok(frame)
        });
        self.close_on_error(&result);
        result
    }

    /// Accept the `GTA` answering an outstanding fetch.
    pub fn accept_get_ack(&mut self, frame: &[u8]) -> Result<GetOutcome> {
        let result = self.try_accept_get_ack(frame);
        self.close_on_error(&result);
        result
    }

    fn try_accept_get_ack(&mut self, frame: &[u8]) -> Result<GetOutcome> {
        let requested = match self.take_pending(Opcode::GetAck)? {
            PendingOp::Fetch { group } => group,
            _ => return Err(EngineError::UnexpectedCommand { opcode: Opcode::GetAck }),
        };

        let decoded = codec::decode(&self.key, frame)?;
        self.counters.accept_recv(decoded.nonce)?;

        match decoded.command {
            Command::Sealed(CommandBody::GetAck { group, outcome }) => {
                if group != requested {
                    // The response must answer the fetch that is in flight
                    return Err(EngineError::UnexpectedCommand { opcode: Opcode::GetAck });
                }
                Ok(outcome)
            },
            other => Err(EngineError::UnexpectedCommand { opcode: other.opcode() }),
        }
    }

    /// Build a `REC` frame initiating a key recovery.
    ///
    /// Advances the local chain (irreversibly) and remembers the candidate
    /// recovery key until the server's acknowledgment arrives.
    pub fn recovery_frame(&mut self) -> Result<Frame> {
        let result = self.start_command(Opcode::Rec).and_then(|()| {
            let verifier = self.chain.advance();
            let candidate = self.chain.recovery_key();
            let nonce = self.counters.claim_send();
            let frame = codec::encode_recover(&self.key, nonce, verifier)?;
            self.pending = Some(PendingOp::Recover { candidate, rec_nonce: nonce });
            Ok(frame)
        });
        self.close_on_error(&result);
        result
    }

    /// Accept the `RCA` answering an outstanding recovery and build the
    /// final `KEY` confirmation.
    ///
    /// Successfully opening the acknowledgment under the candidate key is
    /// the proof that both peers derived the same recovery key; the session
    /// key is replaced before the confirmation frame is returned. A failed
    /// acknowledgment is fatal, but the chain stays advanced.
    pub fn accept_rec_ack(&mut self, frame: &[u8], env: &impl Environment) -> Result<Frame> {
        let result = self.try_accept_rec_ack(frame, env);
        self.close_on_error(&result);
        result
    }

    fn try_accept_rec_ack(&mut self, frame: &[u8], env: &impl Environment) -> Result<Frame> {
        let (candidate, rec_nonce) = match self.take_pending(Opcode::RecAck)? {
            PendingOp::Recover { candidate, rec_nonce } => (candidate, rec_nonce),
            _ => return Err(EngineError::UnexpectedCommand { opcode: Opcode::RecAck }),
        };

        let decoded = codec::decode(&candidate, frame)
            .map_err(|_| EngineError::Recovery { reason: "acknowledgment failed to verify" })?;
        self.counters.accept_recv(decoded.nonce)?;

        match decoded.command {
            Command::Sealed(CommandBody::RecAck { ack_nonce }) if ack_nonce == rec_nonce => {
                let nonce = self.counters.claim_send();
                let confirm = codec::encode_sealed(
                    &candidate,
                    nonce,
                    &CommandBody::Key { ack_nonce: decoded.nonce },
                    env,
                )?;
                self.key = candidate;
                tracing::info!(client = %self.client_id, "recovery complete, session key replaced");
                Ok(confirm)
            },
            Command::Sealed(CommandBody::RecAck { .. }) => {
                Err(EngineError::Recovery { reason: "acknowledgment for the wrong nonce" })
            },
            other => Err(EngineError::UnexpectedCommand { opcode: other.opcode() }),
        }
    }

    /// Check that a new command may start now.
    fn start_command(&self, opcode: Opcode) -> Result<()> {
        if self.state != ConnectionState::Active || self.pending.is_some() {
            return Err(EngineError::UnexpectedCommand { opcode });
        }
        Ok(())
    }

    /// Take the pending operation, failing if none is outstanding.
    fn take_pending(&mut self, opcode: Opcode) -> Result<PendingOp> {
        self.pending.take().ok_or(EngineError::UnexpectedCommand { opcode })
    }

    /// Engine errors are connection-fatal on the client too.
    fn close_on_error<T>(&mut self, result: &Result<T>) {
        if let Err(error) = result {
            tracing::warn!(client = %self.client_id, %error, "closing session");
            self.state = ConnectionState::Closed;
        }
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("client_id", &self.client_id)
            .field("state", &self.state)
            .field("command_pending", &self.pending.is_some())
            .finish()
    }
}
