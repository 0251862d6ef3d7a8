//! Authoritative state for a single replica: key -> (value, vector clock).
//!
//! Uses `dashmap` for per-shard locking instead of a single coarse
//! `RwLock<HashMap>`, per the Design Notes' "per-key locking" redesign
//! flag. The critical section never performs I/O.

use crate::replica::{Replica, ReplicaError};
use crate::vector_clock::{NodeId, VectorClock};
use crate::versioned::Versioned;
use async_trait::async_trait;
use dashmap::DashMap;

pub struct LocalStore<V> {
    node_id: NodeId,
    data: DashMap<String, Versioned<V>>,
}

impl<V> std::fmt::Debug for LocalStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("node_id", &self.node_id)
            .field("len", &self.data.len())
            .finish()
    }
}

impl<V: Clone> LocalStore<V> {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            data: DashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Versioned<V>> {
        self.data.get(key).map(|entry| entry.clone())
    }

    /// Installs or updates `key` under the rules of spec.md sec 4.2:
    ///
    /// - `incoming.clock` empty (origin-write): mint a clock by reading the
    ///   existing entry's clock (or a fresh one) and incrementing this
    ///   node's counter, all within one critical section.
    /// - `incoming.clock` non-empty (replica install): merge with any
    ///   existing clock. The stored clock must dominate or equal the
    ///   pre-existing one; a write that would regress is rejected as a
    ///   no-op, returning the existing entry unchanged.
    pub fn put(&self, key: &str, incoming: Versioned<V>) -> Versioned<V> {
        if incoming.clock.is_empty() {
            let mut result = None;
            self.data
                .entry(key.to_string())
                .and_modify(|existing| {
                    let mut clock = existing.clock.clone();
                    clock.increment(&self.node_id);
                    existing.value = incoming.value.clone();
                    existing.clock = clock;
                    result = Some(existing.clone());
                })
                .or_insert_with(|| {
                    let mut clock = VectorClock::new();
                    clock.increment(&self.node_id);
                    let installed = Versioned::new(incoming.value.clone(), clock);
                    result = Some(installed.clone());
                    installed
                });
            return result.expect("entry API always populates result");
        }

        let mut result = None;
        self.data
            .entry(key.to_string())
            .and_modify(|existing| {
                use crate::vector_clock::Ordering;
                match existing.clock.compare(&incoming.clock) {
                    Ordering::After => {
                        // incoming regresses the stored clock: reject, no-op.
                        result = Some(existing.clone());
                    }
                    _ => {
                        let merged = existing.clock.merge(&incoming.clock);
                        existing.value = incoming.value.clone();
                        existing.clock = merged;
                        result = Some(existing.clone());
                    }
                }
            })
            .or_insert_with(|| {
                result = Some(incoming.clone());
                incoming.clone()
            });
        result.expect("entry API always populates result")
    }
}

#[async_trait]
impl<V: Clone + Send + Sync> Replica<V> for LocalStore<V> {
    fn identifier(&self) -> &NodeId {
        &self.node_id
    }

    async fn get(&self, key: &str) -> Result<Versioned<V>, ReplicaError> {
        LocalStore::get(self, key).ok_or(ReplicaError::NotFound)
    }

    async fn put(&self, key: &str, versioned: Versioned<V>) -> Result<Versioned<V>, ReplicaError> {
        Ok(LocalStore::put(self, key, versioned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_write_mints_and_increments() {
        let store: LocalStore<String> = LocalStore::new("A".into());
        let v1 = store.put("k", Versioned::origin("v1".to_string()));
        assert_eq!(v1.clock.get("A"), 1);

        let v2 = store.put("k", Versioned::origin("v2".to_string()));
        assert_eq!(v2.clock.get("A"), 2);
        assert_eq!(v2.value, "v2");
    }

    #[test]
    fn replica_install_merges_and_rejects_regression() {
        let store: LocalStore<String> = LocalStore::new("B".into());
        let mut clock = VectorClock::new();
        clock.increment("A");
        clock.increment("A");
        let installed = store.put("k", Versioned::new("v2".to_string(), clock.clone()));
        assert_eq!(installed.clock.get("A"), 2);

        // Older clock must not regress the stored entry.
        let mut stale = VectorClock::new();
        stale.increment("A");
        let result = store.put("k", Versioned::new("stale".to_string(), stale));
        assert_eq!(result.value, "v2");
        assert_eq!(result.clock.get("A"), 2);
    }

    #[test]
    fn idempotent_put_is_a_no_op() {
        let store: LocalStore<String> = LocalStore::new("A".into());
        let mut clock = VectorClock::new();
        clock.increment("A");
        let first = store.put("k", Versioned::new("v1".to_string(), clock.clone()));
        let second = store.put("k", Versioned::new("v1".to_string(), clock));
        assert_eq!(first.clock, second.clock);
        assert_eq!(first.value, second.value);
    }

    #[test]
    fn get_on_missing_key_is_none() {
        let store: LocalStore<String> = LocalStore::new("A".into());
        assert!(store.get("missing").is_none());
    }
}
