//! JAdES service — entry point.
//!
//! Loads the signing certificate chain and private key named in the TOML
//! configuration and serves the sign/present/verify API.

mod api;
mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use jades_core::Alg;
use jades_crypto::{derive_key_id, parse_certificate_chain, SigningKey};

use api::AppState;
use config::JadesConfig;

/// JAdES signing service
#[derive(Parser, Debug)]
#[command(name = "jades-node", version, about = "JAdES signing service")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "jades.toml")]
    config: PathBuf,

    /// Override the API port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    // Handle --init flag
    if args.init {
        let config = JadesConfig::default();
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    // Load configuration
    let mut config = JadesConfig::load(&args.config)?;
    if let Some(port) = args.port {
        config.api.port = port;
    }
    config.logging.level = args.log_level;

    tracing::info!("JAdES service v{}", env!("CARGO_PKG_VERSION"));

    // Load signing material. PEM loading lives here, outside the core.
    let chain_pem = std::fs::read_to_string(&config.signer.certificate_chain)
        .with_context(|| {
            format!(
                "reading certificate chain {}",
                config.signer.certificate_chain.display()
            )
        })?;
    let certs = parse_certificate_chain(&chain_pem)?;
    let key_pem = std::fs::read_to_string(&config.signer.private_key)
        .with_context(|| format!("reading private key {}", config.signer.private_key.display()))?;
    let key = SigningKey::from_pkcs8_pem(&key_pem)?;

    let kid = match config.signer.kid.clone() {
        Some(kid) => kid,
        None => derive_key_id(&certs[0])?,
    };
    let default_alg = Alg::parse(&config.signer.algorithm)?;

    tracing::info!(
        kid = %kid,
        alg = %default_alg,
        chain_len = certs.len(),
        key_family = key.family(),
        "signing material loaded"
    );

    let state = Arc::new(AppState {
        certs,
        key,
        kid,
        default_alg,
    });

    let listen_addr: SocketAddr = format!("{}:{}", config.api.listen_addr, config.api.port)
        .parse()
        .context("invalid API listen address")?;

    tokio::select! {
        result = api::start_api_server(listen_addr, state) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
    }

    tracing::info!("JAdES service exited cleanly");
    Ok(())
}
