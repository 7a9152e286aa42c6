//! Relay binary: configuration, component wiring and the JSON-RPC server.

#![warn(unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]

use clap::Parser;
use relay_cache::LocalCache;
use relay_config::RelayConfig;
use relay_consensus::NoopConsensusClient;
use relay_mirror::HttpMirrorClient;
use relay_rpc::{build_relay, rpc_module};
use std::{net::SocketAddr, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Ethereum-compatible JSON-RPC relay for Hedera networks.
#[derive(Debug, Parser)]
#[command(name = "relay", version)]
struct Cli {
    /// Port to serve JSON-RPC on; overrides `SERVER_PORT`.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut config = RelayConfig::from_env()?;
    if let Some(port) = cli.port {
        config.server_port = port;
    }

    info!(
        chain_id = config.chain_id,
        network = %config.hedera_network,
        mirror = %config.mirror_node_url,
        read_only = config.read_only,
        "starting relay"
    );
    if !config.read_only && config.operator_id.is_none() {
        warn!("no operator account configured; submissions will fail until one is provided");
    }

    let mirror = Arc::new(HttpMirrorClient::new(&config.mirror_node_url)?);
    let cache = Arc::new(LocalCache::default());

    // the SDK-backed consensus client plugs in behind this factory; the
    // bundled client refuses writes, which read-only deployments never issue
    let registry = build_relay(
        config.clone(),
        mirror,
        Box::new(|| Arc::new(NoopConsensusClient)),
        cache,
    )?;

    let addr: SocketAddr = ([0, 0, 0, 0], config.server_port).into();
    let server = jsonrpsee::server::Server::builder().build(addr).await?;
    info!(%addr, "rpc server listening");

    let handle = server.start(rpc_module(Arc::new(registry)));

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    let _ = handle.stop();
    handle.stopped().await;
    Ok(())
}
