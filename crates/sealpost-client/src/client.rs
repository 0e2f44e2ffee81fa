//! Connected client handle.

use std::time::Duration;

use sealpost_core::{ClientSession, SystemEnv};
use sealpost_crypto::{RecoveryMaterial, bootstrap::KeyAgreement};
use sealpost_proto::{FRAME_SIZE, Frame, GetOutcome, PutOutcome};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

use crate::error::ClientError;

/// Default bound on every read from the server.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection parameters for one client identity.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Identifier announced during the setup exchange
    pub client_id: String,
    /// Recovery-chain material; must match the server's provisioning for
    /// this client
    pub recovery: RecoveryMaterial,
    /// Bound applied to every read from the server
    pub read_timeout: Duration,
}

impl ClientConfig {
    /// Config with the default read timeout.
    pub fn new(client_id: impl Into<String>, recovery: RecoveryMaterial) -> Self {
        Self { client_id: client_id.into(), recovery, read_timeout: DEFAULT_READ_TIMEOUT }
    }
}

/// A connected, identified client.
///
/// Created by [`Client::connect`], which runs the whole setup exchange:
/// key agreement, identification, and the server's initial
/// pending-message notification. Any protocol error poisons the
/// connection; drop the client and reconnect.
pub struct Client {
    stream: TcpStream,
    session: ClientSession,
    env: SystemEnv,
    read_timeout: Duration,
    pending_groups: Vec<String>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("client_id", &self.session.client_id())
            .field("state", &self.session.state())
            .field("read_timeout", &self.read_timeout)
            .field("pending_groups", &self.pending_groups)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Connect to a relay and run the setup exchange.
    pub async fn connect(addr: &str, config: ClientConfig) -> Result<Self, ClientError> {
        let mut stream = TcpStream::connect(addr).await?;
        tracing::debug!(%addr, client = %config.client_id, "connected, starting setup");

        // Key agreement: public values cross as plain hex frames
        let agreement = KeyAgreement::generate(&mut rand::rngs::OsRng);
        let public_hex = hex::encode(agreement.public_bytes());
        write_frame(&mut stream, &Frame::encode(&public_hex)?).await?;

        let server_public = read_frame(&mut stream, config.read_timeout).await?;
        let server_public = parse_public_key(&Frame::decode(&server_public)?)?;
        let key = agreement.agree(&server_public);

        // Identification: plain id frame, expect a welcome back
        write_frame(&mut stream, &Frame::encode(&config.client_id)?).await?;
        let greeting = Frame::decode(&read_frame(&mut stream, config.read_timeout).await?)?;
        if greeting != format!("welcome {}", config.client_id) {
            return Err(ClientError::Rejected { greeting });
        }

        // Initial notification activates the session
        let mut session = ClientSession::new(&config.client_id, key, &config.recovery);
        let notify = read_frame(&mut stream, config.read_timeout).await?;
        let pending_groups = session.accept_notify(&notify)?;

        tracing::info!(
            client = %config.client_id,
            pending = pending_groups.len(),
            "session active"
        );

        Ok(Self {
            stream,
            session,
            env: SystemEnv::new(),
            read_timeout: config.read_timeout,
            pending_groups,
        })
    }

    /// Groups that held pending messages when the connection was set up.
    pub fn pending_groups(&self) -> &[String] {
        &self.pending_groups
    }

    /// Publish a message into a group and wait for the acknowledgment.
    pub async fn publish(&mut self, group: &str, message: &str) -> Result<PutOutcome, ClientError> {
        let frame = self.session.publish_frame(group, message, &self.env)?;
        write_frame(&mut self.stream, &frame).await?;

        let response = read_frame(&mut self.stream, self.read_timeout).await?;
        Ok(self.session.accept_put_ack(&response)?)
    }

    /// Request the oldest pending message in a group.
    pub async fn fetch(&mut self, group: &str) -> Result<GetOutcome, ClientError> {
        let frame = self.session.fetch_frame(group, &self.env)?;
        write_frame(&mut self.stream, &frame).await?;

        let response = read_frame(&mut self.stream, self.read_timeout).await?;
        Ok(self.session.accept_get_ack(&response)?)
    }

    /// Run a key-recovery exchange, replacing the session key on success.
    pub async fn recover(&mut self) -> Result<(), ClientError> {
        let rec = self.session.recovery_frame()?;
        write_frame(&mut self.stream, &rec).await?;

        let ack = read_frame(&mut self.stream, self.read_timeout).await?;
        let confirm = self.session.accept_rec_ack(&ack, &self.env)?;
        write_frame(&mut self.stream, &confirm).await?;
        Ok(())
    }

    /// Close the connection.
    pub async fn shutdown(mut self) -> Result<(), ClientError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Read one full frame, bounded by the configured timeout.
async fn read_frame(
    stream: &mut TcpStream,
    read_timeout: Duration,
) -> Result<[u8; FRAME_SIZE], ClientError> {
    let mut buffer = [0u8; FRAME_SIZE];
    match timeout(read_timeout, stream.read_exact(&mut buffer)).await {
        Ok(Ok(_)) => Ok(buffer),
        Ok(Err(error)) => Err(error.into()),
        Err(_) => Err(ClientError::Timeout { seconds: read_timeout.as_secs() }),
    }
}

/// Write one full frame.
async fn write_frame(stream: &mut TcpStream, frame: &Frame) -> Result<(), ClientError> {
    stream.write_all(frame.as_bytes()).await?;
    Ok(())
}

/// Parse the server's hex-encoded x25519 public value.
fn parse_public_key(payload: &str) -> Result<[u8; 32], ClientError> {
    let bytes = hex::decode(payload)
        .map_err(|_| ClientError::Setup { reason: "public key is not hex" })?;
    bytes
        .try_into()
        .map_err(|_| ClientError::Setup { reason: "public key has the wrong length" })
}
