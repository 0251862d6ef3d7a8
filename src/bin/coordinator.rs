//! Coordinator binary: owns the hash ring and quorum logic, exposes the
//! client-facing HTTP interface from spec.md sec 6.

use clap::Parser;
use std::sync::Arc;
use tracing::info;
use vclock_store::config::ClusterConfig;
use vclock_store::coordinator::Coordinator;
use vclock_store::hash_ring::{default_hash_fn, HashRing};
use vclock_store::http::coordinator_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ClusterConfig::parse();
    config.validate()?;

    let ring: Arc<HashRing<String>> = Arc::new(HashRing::new(
        default_hash_fn(),
        config.virtual_nodes,
        config.total_replicas,
    ));
    let coordinator = Arc::new(Coordinator::new(ring, config.clone())?);

    let app = coordinator_router(coordinator.clone());
    let listener = tokio::net::TcpListener::bind(config.server_address()).await?;
    info!(address = %config.server_address(), "coordinator listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    coordinator.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    info!("shutdown signal received, draining tail replication");
}
