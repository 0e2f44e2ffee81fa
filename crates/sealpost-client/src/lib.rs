//! Sealpost TCP client.
//!
//! Thin I/O layer over the Sans-IO [`ClientSession`] engine: this crate
//! owns the socket, the read timeouts, and the setup exchange. All protocol
//! logic (sealing, tagging, sequencing, the key lifecycle) lives in
//! `sealpost-core`.
//!
//! ```no_run
//! use sealpost_client::{Client, ClientConfig};
//! use sealpost_crypto::RecoveryMaterial;
//!
//! # async fn example() -> Result<(), sealpost_client::ClientError> {
//! let config = ClientConfig::new(
//!     "alice",
//!     RecoveryMaterial { seed: [1; 32], static_key: [2; 32], master_key: [3; 32] },
//! );
//! let mut client = Client::connect("127.0.0.1:7733", config).await?;
//! client.publish("G1", "Olá grupo!").await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`ClientSession`]: sealpost_core::ClientSession

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod error;

pub use client::{Client, ClientConfig};
pub use error::ClientError;
