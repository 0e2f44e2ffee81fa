//! Sealpost relay server binary.
//!
//! # Usage
//!
//! ```bash
//! sealpost-server --config relay.toml
//! ```
//!
//! The config file supplies the bind address, group membership, and
//! per-client recovery material; see [`ServerConfig`] for the format.
//!
//! [`ServerConfig`]: sealpost_server::ServerConfig

use std::path::PathBuf;

use clap::Parser;
use sealpost_server::{Server, ServerConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Sealpost relay server
#[derive(Parser, Debug)]
#[command(name = "sealpost-server")]
#[command(about = "Sealpost secure group-relay server")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Override the bind address from the config file
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Sealpost server starting");

    let mut config = ServerConfig::load(&args.config)?;
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }

    let server = Server::bind(config).await?;
    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
