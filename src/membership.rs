//! Node registration/deregistration lifecycle (spec.md sec 4.6).

use crate::error::{AppError, AppResult};
use crate::hash_ring::HashRing;
use crate::node_client::NodeClient;
use crate::replica::Replica;
use crate::vector_clock::NodeId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Membership state machine per node: `Unknown -> Registered ->
/// Deregistered`, with re-registration from `Deregistered` allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipState {
    Unknown,
    Registered,
    Deregistered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub id: NodeId,
    pub address: String,
    pub port: u16,
}

/// Registers a node with the coordinator's hash ring. Idempotent only in
/// the sense that a repeated registration of a live id fails cleanly with
/// `NodeExists` — endpoint info is never silently overwritten.
pub async fn register<V>(ring: &HashRing<V>, descriptor: NodeDescriptor) -> AppResult<()>
where
    V: serde::Serialize + serde::de::DeserializeOwned + Send + Sync + 'static,
{
    let client = NodeClient::new(descriptor.id.clone(), &descriptor.address, descriptor.port);
    let client: Arc<dyn Replica<V>> = Arc::new(client);
    ring.add_node(client).await?;
    info!(node_id = %descriptor.id, "node registered");
    Ok(())
}

pub async fn deregister<V>(ring: &HashRing<V>, node_id: &str) -> AppResult<()>
where
    V: Send + Sync + 'static,
{
    ring.remove_node(node_id).await?;
    info!(node_id, "node deregistered");
    Ok(())
}

pub fn validate_descriptor(descriptor: &NodeDescriptor) -> AppResult<()> {
    if descriptor.id.trim().is_empty() {
        return Err(AppError::BadRequest("node id must not be empty".into()));
    }
    if descriptor.address.trim().is_empty() {
        return Err(AppError::BadRequest("node address must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_ring::default_hash_fn;

    #[tokio::test]
    async fn register_then_deregister_then_reregister() {
        let ring: HashRing<String> = HashRing::new(default_hash_fn(), 3, 2);
        let descriptor = NodeDescriptor {
            id: "A".into(),
            address: "127.0.0.1".into(),
            port: 9001,
        };
        register(&ring, descriptor.clone()).await.unwrap();
        assert!(ring.contains("A").await);

        deregister(&ring, "A").await.unwrap();
        assert!(!ring.contains("A").await);

        // Re-registration from Deregistered is allowed.
        register(&ring, descriptor).await.unwrap();
        assert!(ring.contains("A").await);
    }

    #[tokio::test]
    async fn duplicate_registration_fails() {
        let ring: HashRing<String> = HashRing::new(default_hash_fn(), 3, 2);
        let descriptor = NodeDescriptor {
            id: "A".into(),
            address: "127.0.0.1".into(),
            port: 9001,
        };
        register(&ring, descriptor.clone()).await.unwrap();
        let err = register(&ring, descriptor).await.unwrap_err();
        assert!(matches!(err, AppError::NodeExists(_)));
    }
}
