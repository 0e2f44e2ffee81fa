//! Server configuration and secret-material loading.
//!
//! Group membership and per-client recovery material arrive from a TOML
//! file at process start; nothing secret lives in source. Example:
//!
//! ```toml
//! bind = "127.0.0.1:7733"
//! read_timeout_secs = 30
//!
//! [groups]
//! G1 = ["alice", "bob", "carol"]
//!
//! [clients.alice]
//! seed = "0101…"        # 64 hex chars
//! static_key = "0202…"  # 64 hex chars
//! master_key = "0303…"  # 64 hex chars
//! ```

use std::{collections::HashMap, path::Path, time::Duration};

use sealpost_core::GroupDirectory;
use sealpost_crypto::RecoveryMaterial;
use serde::Deserialize;

use crate::error::ServerError;

/// Default bound on every read from a client.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// TOML shape of the config file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    bind: String,
    read_timeout_secs: Option<u64>,
    #[serde(default)]
    groups: HashMap<String, Vec<String>>,
    #[serde(default)]
    clients: HashMap<String, RawMaterial>,
}

/// Hex-encoded recovery material for one client.
#[derive(Debug, Deserialize)]
struct RawMaterial {
    seed: String,
    static_key: String,
    master_key: String,
}

/// Runtime configuration for the relay.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (e.g. "127.0.0.1:7733")
    pub bind_address: String,
    /// Bound applied to every read from a client
    pub read_timeout: Duration,
    /// Static group membership
    pub directory: GroupDirectory,
    /// Per-client recovery-chain material
    pub clients: HashMap<String, RecoveryMaterial>,
}

impl ServerConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    /// Parse a TOML config document.
    pub fn from_toml(text: &str) -> Result<Self, ServerError> {
        let raw: RawConfig =
            toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;

        let mut clients = HashMap::new();
        for (client_id, material) in raw.clients {
            let material = RecoveryMaterial {
                seed: decode_key(&material.seed, &client_id, "seed")?,
                static_key: decode_key(&material.static_key, &client_id, "static_key")?,
                master_key: decode_key(&material.master_key, &client_id, "master_key")?,
            };
            clients.insert(client_id, material);
        }

        Ok(Self {
            bind_address: raw.bind,
            read_timeout: raw
                .read_timeout_secs
                .map_or(DEFAULT_READ_TIMEOUT, Duration::from_secs),
            directory: GroupDirectory::new(raw.groups),
            clients,
        })
    }
}

/// Decode one 32-byte hex field.
fn decode_key(hex_text: &str, client_id: &str, field: &str) -> Result<[u8; 32], ServerError> {
    let bytes = hex::decode(hex_text).map_err(|_| {
        ServerError::Config(format!("client {client_id}: {field} is not valid hex"))
    })?;
    bytes.try_into().map_err(|_| {
        ServerError::Config(format!("client {client_id}: {field} must be 32 bytes"))
    })
}
