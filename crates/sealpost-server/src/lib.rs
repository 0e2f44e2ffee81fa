//! Sealpost relay server.
//!
//! Production runtime wrapping the Sans-IO engines from [`sealpost_core`]:
//! one tokio task per connection runs the setup exchange and then a
//! sequential command loop, feeding frames through a [`ServerSession`] and
//! executing whatever it returns. The mailbox is the only state shared
//! across connections and sits behind a single async mutex; sessions, keys,
//! and recovery chains are owned by their connection's task.
//!
//! # Components
//!
//! - [`Server`]: accept loop and per-connection tasks
//! - [`Listener`] / [`Connection`]: TCP transport with bounded reads
//! - [`ServerConfig`]: TOML-loaded membership and secret material

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod error;
mod transport;

use std::{collections::HashMap, sync::Arc};

pub use config::ServerConfig;
pub use error::ServerError;
use sealpost_core::{
    ConnectionState, GroupDirectory, GroupMailbox, ServerSession, SystemEnv,
};
use sealpost_crypto::{RecoveryMaterial, bootstrap::KeyAgreement};
use sealpost_proto::Frame;
use tokio::sync::Mutex;
pub use transport::{Connection, Listener};

/// State shared by every connection task.
struct SharedState {
    /// Static group membership
    directory: GroupDirectory,
    /// Per-client recovery material
    clients: HashMap<String, RecoveryMaterial>,
    /// Pending-message queues, the one cross-connection mutable state
    mailbox: Mutex<GroupMailbox>,
}

/// The relay server.
pub struct Server {
    listener: Listener,
    state: Arc<SharedState>,
}

impl Server {
    /// Bind the listener and prepare shared state.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = Listener::bind(&config.bind_address, config.read_timeout).await?;
        let state = Arc::new(SharedState {
            directory: config.directory,
            clients: config.clients,
            mailbox: Mutex::new(GroupMailbox::new()),
        });
        Ok(Self { listener, state })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        self.listener.local_addr()
    }

    /// Accept connections until the process is stopped.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("relay listening on {}", self.local_addr()?);

        loop {
            match self.listener.accept().await {
                Ok(connection) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let peer = connection.peer();
                        if let Err(error) = handle_connection(connection, state).await {
                            tracing::warn!(%peer, %error, "connection ended with error");
                        }
                    });
                },
                Err(error) => {
                    tracing::error!(%error, "accept failed");
                },
            }
        }
    }
}

/// Run one connection: setup exchange, then the sequential command loop.
async fn handle_connection(
    mut connection: Connection,
    state: Arc<SharedState>,
) -> Result<(), ServerError> {
    let env = SystemEnv::new();
    let peer = connection.peer();
    tracing::debug!(%peer, "new connection");

    // Key agreement: read the client's public value, answer with ours
    let Some(frame) = connection.read_frame().await? else {
        return Ok(());
    };
    let client_public = parse_public_key(&Frame::decode(&frame)?)?;

    let agreement = KeyAgreement::generate(&mut rand::rngs::OsRng);
    connection
        .write_frame(&Frame::encode(&hex::encode(agreement.public_bytes()))?)
        .await?;
    let key = agreement.agree(&client_public);

    // Identification: plain id frame; the id must be provisioned
    let Some(frame) = connection.read_frame().await? else {
        return Ok(());
    };
    let client_id = Frame::decode(&frame)?;
    let Some(material) = state.clients.get(&client_id) else {
        connection.write_frame(&Frame::encode("unknown client")?).await?;
        return Err(ServerError::UnknownClient { client_id });
    };
    connection.write_frame(&Frame::encode(&format!("welcome {client_id}"))?).await?;

    // Session setup and the initial pending-message notification
    let mut session = ServerSession::new(&client_id, key, material);
    let notify = {
        let mailbox = state.mailbox.lock().await;
        session.notify_pending(&mailbox, &env)?
    };
    connection.write_frame(&notify).await?;
    tracing::info!(%peer, client = %client_id, "session active");

    // Sequential command loop: one frame in, at most one frame out
    while let Some(frame) = connection.read_frame().await? {
        let response = {
            let mut mailbox = state.mailbox.lock().await;
            session.handle_frame(&frame, &state.directory, &mut mailbox, &env)?
        };
        if let Some(frame) = response {
            connection.write_frame(&frame).await?;
        }
        if session.state() == ConnectionState::Closed {
            break;
        }
    }

    tracing::debug!(%peer, client = %client_id, "connection closed");
    Ok(())
}

/// Parse a client's hex-encoded x25519 public value.
fn parse_public_key(payload: &str) -> Result<[u8; 32], ServerError> {
    let bytes = hex::decode(payload)
        .map_err(|_| ServerError::Setup { reason: "public key is not hex" })?;
    bytes
        .try_into()
        .map_err(|_| ServerError::Setup { reason: "public key has the wrong length" })
}
