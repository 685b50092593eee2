//! Replica process entry point: parse CLI args, build a `Replica`, spawn
//! its tickers, and serve the HTTP API on `host:base_port + node_id`.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ferrium_raft::config::{ClusterConfig, ReplicaConfig};
use ferrium_raft::consensus::Replica;

#[derive(Parser)]
#[command(name = "ferrium-raft")]
#[command(about = "A single replica of a Raft-backed key-value cluster")]
struct Args {
    /// This replica's id, in `0..node_count`.
    node_id: usize,

    /// Total number of replicas in the cluster.
    #[arg(long, default_value_t = ClusterConfig::default().node_count)]
    node_count: usize,

    /// Host all replicas bind to / are reachable on.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Base port; replica `i` listens on `base_port + i`.
    #[arg(long, default_value_t = ClusterConfig::default().base_port)]
    base_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ferrium_raft=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if args.node_id >= args.node_count {
        anyhow::bail!("node_id {} is out of range for a {}-node cluster", args.node_id, args.node_count);
    }

    let config = ReplicaConfig {
        cluster: ClusterConfig {
            node_count: args.node_count,
            host: args.host.clone(),
            base_port: args.base_port,
        },
        ..Default::default()
    };

    tracing::info!(node_id = args.node_id, node_count = args.node_count, "starting replica");

    let replica = Replica::new(args.node_id, config.clone());
    replica.spawn();

    let app = ferrium_raft::server::router(replica);
    let bind_addr = format!("{}:{}", args.host, args.base_port + args.node_id as u16);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;

    tracing::info!(%bind_addr, "listening");

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("shutdown signal received");
    };

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    Ok(())
}
