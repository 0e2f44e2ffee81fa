//! TCP transport.
//!
//! Plain TCP: the protocol supplies its own authentication and
//! confidentiality above this layer, so the transport's only jobs are
//! fixed-size frame reads, bounded by a timeout, and ordered writes.

use std::{net::SocketAddr, time::Duration};

use sealpost_proto::{FRAME_SIZE, Frame};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::timeout,
};

use crate::error::ServerError;

/// Listening socket for the relay.
pub struct Listener {
    inner: TcpListener,
    read_timeout: Duration,
}

impl Listener {
    /// Bind to an address.
    pub async fn bind(address: &str, read_timeout: Duration) -> Result<Self, ServerError> {
        let inner = TcpListener::bind(address).await?;
        tracing::info!("TCP transport bound to {}", inner.local_addr()?);
        Ok(Self { inner, read_timeout })
    }

    /// Accept the next connection.
    pub async fn accept(&self) -> Result<Connection, ServerError> {
        let (stream, peer) = self.inner.accept().await?;
        stream.set_nodelay(true)?;
        Ok(Connection { stream, peer, read_timeout: self.read_timeout })
    }

    /// Local address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.inner.local_addr()?)
    }
}

/// One accepted client connection.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    read_timeout: Duration,
}

impl Connection {
    /// Remote peer address.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Read one full frame, or `None` when the peer has closed.
    ///
    /// The read is bounded by the configured timeout; a connection that
    /// stalls mid-frame is torn down rather than pinning a task forever.
    pub async fn read_frame(&mut self) -> Result<Option<[u8; FRAME_SIZE]>, ServerError> {
        let mut buffer = [0u8; FRAME_SIZE];
        match timeout(self.read_timeout, self.stream.read_exact(&mut buffer)).await {
            Ok(Ok(_)) => Ok(Some(buffer)),
            Ok(Err(error)) if error.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Ok(Err(error)) => Err(error.into()),
            Err(_) => Err(ServerError::Timeout { seconds: self.read_timeout.as_secs() }),
        }
    }

    /// Write one full frame.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), ServerError> {
        self.stream.write_all(frame.as_bytes()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listener_binds_to_an_ephemeral_port() {
        let listener = Listener::bind("127.0.0.1:0", Duration::from_secs(1)).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn frames_cross_the_transport_intact() {
        let listener = Listener::bind("127.0.0.1:0", Duration::from_secs(1)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let frame = Frame::encode("a setup frame").unwrap();
            stream.write_all(frame.as_bytes()).await.unwrap();
        });

        let mut connection = listener.accept().await.unwrap();
        let bytes = connection.read_frame().await.unwrap().unwrap();
        assert_eq!(Frame::decode(&bytes).unwrap(), "a setup frame");

        client.await.unwrap();
    }

    #[tokio::test]
    async fn closed_peer_reads_as_none() {
        let listener = Listener::bind("127.0.0.1:0", Duration::from_secs(1)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            drop(stream);
        });

        let mut connection = listener.accept().await.unwrap();
        assert!(connection.read_frame().await.unwrap().is_none());

        client.await.unwrap();
    }

    #[tokio::test]
    async fn stalled_read_times_out() {
        let listener = Listener::bind("127.0.0.1:0", Duration::from_millis(50)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Connect but never send anything
        let stream = TcpStream::connect(addr).await.unwrap();

        let mut connection = listener.accept().await.unwrap();
        let result = connection.read_frame().await;
        assert!(matches!(result, Err(ServerError::Timeout { .. })));

        drop(stream);
    }
}
