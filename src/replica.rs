//! Capability trait shared by the in-process `LocalStore` and the remote
//! `NodeClient`, so the hash ring and coordinator can be exercised in tests
//! without a network (Design Notes: "interface polymorphism").

use crate::error::AppError;
use crate::vector_clock::NodeId;
use crate::versioned::Versioned;
use async_trait::async_trait;

/// The remote-replica error kinds from spec.md sec 4.3, reused as a subset
/// of `AppError` so both the HTTP layer and the in-process path speak the
/// same vocabulary.
#[derive(Debug, Clone)]
pub enum ReplicaError {
    NotFound,
    Unreachable(String),
    Protocol(String),
}

impl From<ReplicaError> for AppError {
    fn from(err: ReplicaError) -> Self {
        match err {
            ReplicaError::NotFound => AppError::NotFound("key not present on replica".into()),
            ReplicaError::Unreachable(msg) => AppError::Unreachable(msg),
            ReplicaError::Protocol(msg) => AppError::Protocol(msg),
        }
    }
}

#[async_trait]
pub trait Replica<V>: Send + Sync + std::fmt::Debug {
    fn identifier(&self) -> &NodeId;

    async fn get(&self, key: &str) -> Result<Versioned<V>, ReplicaError>;

    /// The sent payload's clock MUST be the caller-supplied clock; a replica
    /// does not mint clocks on replicate-path writes (non-empty incoming
    /// clock). See LocalStore::put for the origin-write exception.
    async fn put(&self, key: &str, versioned: Versioned<V>) -> Result<Versioned<V>, ReplicaError>;
}
