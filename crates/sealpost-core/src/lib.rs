//! Sealpost protocol engine.
//!
//! The command codec and the two per-connection state machines, plus the
//! group directory and mailbox services the server side consults. Pure
//! logic throughout: no sockets, no clocks, no locks. The runtime crates
//! (`sealpost-server`, `sealpost-client`) own the I/O and feed frames in
//! and out of the engines.
//!
//! # Architecture
//!
//! ```text
//! ClientSession ──frames──►  transport  ──frames──► ServerSession
//!      │                                                 │
//!   codec (seal → tag → pad, and the reverse)            │
//!      │                                                 ▼
//!   sealpost-crypto                          GroupDirectory + GroupMailbox
//! ```
//!
//! Both engines return at most one outbound frame per step, mirroring the
//! protocol's strict request/response lockstep. Every engine error is
//! connection-fatal: the session transitions to `Closed` and the runtime
//! drops the transport.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client_session;
pub mod codec;
pub mod env;
mod error;
pub mod mailbox;
mod server_session;
mod session;

pub use client_session::ClientSession;
pub use codec::{Command, Decoded};
pub use env::{Environment, SystemEnv};
pub use error::{EngineError, Result};
pub use mailbox::{GroupDirectory, GroupMailbox, PendingMessage};
pub use server_session::ServerSession;
pub use session::{ConnectionState, NonceCounters};
