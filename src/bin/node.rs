//! Replica node binary: holds a `LocalStore` shard and registers itself
//! with the coordinator's hash ring on startup (spec.md sec 4.6).

use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use vclock_store::config::NodeConfig;
use vclock_store::http::node_router;
use vclock_store::local_store::LocalStore;
use vclock_store::membership::NodeDescriptor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = NodeConfig::parse();
    let store: Arc<LocalStore<String>> = Arc::new(LocalStore::new(config.node_id.clone()));

    let descriptor = NodeDescriptor {
        id: config.node_id.clone(),
        address: config.advertised_address().to_string(),
        port: config.port,
    };
    register_with_coordinator(&config, &descriptor).await?;

    let app = node_router(store);
    let listener = tokio::net::TcpListener::bind(config.server_address()).await?;
    info!(address = %config.server_address(), node_id = %config.node_id, "node listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    deregister_from_coordinator(&config).await;
    Ok(())
}

async fn register_with_coordinator(
    config: &NodeConfig,
    descriptor: &NodeDescriptor,
) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let url = format!("http://{}/node/register", config.coordinator);
    let resp = client.post(&url).json(descriptor).send().await?;
    if !resp.status().is_success() {
        anyhow::bail!("coordinator rejected registration: {}", resp.status());
    }
    info!(coordinator = %config.coordinator, "registered with coordinator");
    Ok(())
}

async fn deregister_from_coordinator(config: &NodeConfig) {
    let client = reqwest::Client::new();
    let url = format!("http://{}/node/deregister", config.coordinator);
    let descriptor = NodeDescriptor {
        id: config.node_id.clone(),
        address: config.advertised_address().to_string(),
        port: config.port,
    };
    match client.post(&url).json(&descriptor).send().await {
        Ok(resp) if resp.status().is_success() => {
            info!("deregistered from coordinator");
        }
        Ok(resp) => warn!(status = %resp.status(), "deregistration rejected"),
        Err(err) => warn!(error = %err, "failed to reach coordinator for deregistration"),
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    info!("shutdown signal received");
}
