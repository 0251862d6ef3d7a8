//! Remote-replica proxy used by the Coordinator, speaking the
//! replica-exposed HTTP interface from spec.md sec 6 over `reqwest`.

use crate::replica::{Replica, ReplicaError};
use crate::vector_clock::NodeId;
use crate::versioned::Versioned;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct NodeClient {
    identifier: NodeId,
    base_url: String,
    client: reqwest::Client,
}

impl NodeClient {
    pub fn new(identifier: NodeId, address: &str, port: u16) -> Self {
        Self {
            identifier,
            base_url: format!("http://{}:{}", address, port),
            client: reqwest::Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("reqwest client builds with static config"),
        }
    }

    pub fn address(&self) -> &str {
        &self.base_url
    }
}

impl PartialEq for NodeClient {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}
impl Eq for NodeClient {}

impl std::hash::Hash for NodeClient {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
    }
}

#[async_trait]
impl<V> Replica<V> for NodeClient
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn identifier(&self) -> &NodeId {
        &self.identifier
    }

    async fn get(&self, key: &str) -> Result<Versioned<V>, ReplicaError> {
        let url = format!("{}/{}", self.base_url, key);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ReplicaError::Unreachable(e.to_string()))?;

        match resp.status() {
            reqwest::StatusCode::OK => resp
                .json::<Versioned<V>>()
                .await
                .map_err(|e| ReplicaError::Protocol(e.to_string())),
            reqwest::StatusCode::NOT_FOUND => Err(ReplicaError::NotFound),
            status => Err(ReplicaError::Protocol(format!("unexpected status {}", status))),
        }
    }

    async fn put(&self, key: &str, versioned: Versioned<V>) -> Result<Versioned<V>, ReplicaError> {
        let url = format!("{}/{}", self.base_url, key);
        let resp = self
            .client
            .put(&url)
            .json(&versioned)
            .send()
            .await
            .map_err(|e| ReplicaError::Unreachable(e.to_string()))?;

        match resp.status() {
            reqwest::StatusCode::OK => resp
                .json::<Versioned<V>>()
                .await
                .map_err(|e| ReplicaError::Protocol(e.to_string())),
            status => Err(ReplicaError::Protocol(format!("unexpected status {}", status))),
        }
    }
}
