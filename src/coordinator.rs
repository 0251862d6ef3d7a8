//! Quorum reads/writes, conflict detection, read repair, and async tail
//! replication (spec.md sec 4.5).

use crate::config::ClusterConfig;
use crate::error::{AppError, AppResult};
use crate::hash_ring::HashRing;
use crate::replica::Replica;
use crate::vector_clock::Ordering;
use crate::versioned::Versioned;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

pub struct Coordinator<V> {
    hash_ring: Arc<HashRing<V>>,
    config: ClusterConfig,
    tail_tasks: Mutex<JoinSet<()>>,
}

impl<V> Coordinator<V>
where
    V: Clone + Send + Sync + 'static + AsRef<[u8]>,
{
    pub fn new(hash_ring: Arc<HashRing<V>>, config: ClusterConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            hash_ring,
            config,
            tail_tasks: Mutex::new(JoinSet::new()),
        })
    }

    pub fn hash_ring(&self) -> &Arc<HashRing<V>> {
        &self.hash_ring
    }

    /// Write path (spec.md sec 4.5.1): mint the clock at the primary,
    /// synchronously fill the write quorum, fire-and-forget the rest.
    #[instrument(skip(self, value))]
    pub async fn set(&self, key: &str, value: V) -> AppResult<Versioned<V>> {
        let replicas = self.hash_ring.replicas(key).await?;
        if replicas.is_empty() {
            return Err(AppError::NoNodes);
        }

        let envelope = Versioned::origin(value);
        let mut iter = replicas.iter();

        // Primary write: mints the definitive clock. Fall through
        // successors until one succeeds.
        let mut minted = None;
        let mut successes = 0usize;
        let mut used_up_to = 0usize;
        for node in iter.by_ref() {
            used_up_to += 1;
            match node.put(key, envelope.clone()).await {
                Ok(v) => {
                    minted = Some(v);
                    successes += 1;
                    break;
                }
                Err(err) => {
                    warn!(node = %node.identifier(), error = %err_msg(&err), "primary write failed, trying successor");
                }
            }
        }

        let minted = match minted {
            Some(v) => v,
            None => {
                return Err(AppError::WriteQuorumUnmet {
                    wanted: self.config.write_quorum,
                    got: 0,
                })
            }
        };

        // Fill the rest of the write quorum synchronously with the minted
        // Versioned (replicas do not mint on this path; non-empty clock).
        // Sequential, not concurrent: a failure here must fall through to
        // the next replica in preference order, so the tail that remains
        // afterward is exactly "whatever wasn't needed to reach W".
        for node in iter.by_ref() {
            if successes >= self.config.write_quorum {
                break;
            }
            used_up_to += 1;
            match node.put(key, minted.clone()).await {
                Ok(_) => successes += 1,
                Err(err) => {
                    warn!(node = %node.identifier(), error = %err_msg(&err), "replica write failed");
                }
            }
        }

        if successes < self.config.write_quorum {
            return Err(AppError::WriteQuorumUnmet {
                wanted: self.config.write_quorum,
                got: successes,
            });
        }

        // Remaining tail replicas: fire-and-forget, joined at shutdown.
        let tail: Vec<_> = replicas
            .iter()
            .skip(used_up_to)
            .cloned()
            .collect();
        if !tail.is_empty() {
            let key = key.to_string();
            let minted_for_tail = minted.clone();
            let mut tasks = self.tail_tasks.lock().await;
            for node in tail {
                let key = key.clone();
                let payload = minted_for_tail.clone();
                tasks.spawn(async move {
                    if let Err(err) = node.put(&key, payload).await {
                        warn!(node = %node.identifier(), error = %err_msg(&err), "tail replication failed");
                    } else {
                        debug!(node = %node.identifier(), "tail replication succeeded");
                    }
                });
            }
        }

        Ok(minted)
    }

    /// Read path (spec.md sec 4.5.2/4.5.3): query every preference-list
    /// replica concurrently, require at least R responses to proceed,
    /// resolve conflicts over whatever answered, and read-repair every
    /// stale replica observed (not just the R that satisfied quorum).
    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> AppResult<Versioned<V>> {
        let replicas = self.hash_ring.replicas(key).await?;
        if replicas.is_empty() {
            return Err(AppError::NoNodes);
        }

        // Query every preference-list replica concurrently rather than
        // paying their latencies serially; quorum is then just a count
        // over however many answered.
        let polled = futures::future::join_all(
            replicas
                .iter()
                .map(|node| async move { (node.clone(), node.get(key).await) }),
        )
        .await;

        let mut responses: Vec<(Arc<dyn Replica<V>>, Versioned<V>)> = Vec::new();
        let mut not_found: Vec<Arc<dyn Replica<V>>> = Vec::new();

        for (node, result) in polled {
            match result {
                Ok(v) => responses.push((node, v)),
                Err(crate::replica::ReplicaError::NotFound) => {
                    not_found.push(node);
                }
                Err(err) => {
                    debug!(node = %node.identifier(), error = ?err, "replica unreachable on read");
                }
            }
        }

        if responses.is_empty() {
            // NotFound only counts as a quorum-satisfying response once R
            // replicas have agreed the key is absent; fewer than that is
            // still a read-quorum failure, not a confirmed absence.
            if not_found.len() >= self.config.read_quorum {
                return Err(AppError::NotFound(key.to_string()));
            }
            return Err(AppError::ReadQuorumUnmet {
                wanted: self.config.read_quorum,
                got: not_found.len(),
            });
        }
        if responses.len() < self.config.read_quorum {
            return Err(AppError::ReadQuorumUnmet {
                wanted: self.config.read_quorum,
                got: responses.len(),
            });
        }

        let resolved = resolve_conflicts(responses.iter().map(|(_, v)| v.clone()).collect());

        // Read-repair every replica whose returned clock is strictly Before
        // the resolved clock. A NotFound from a replica that coexists with a
        // value elsewhere is itself evidence of staleness, so it repairs
        // too. Best-effort; failures don't fail the read.
        for (node, v) in &responses {
            if matches!(v.clock.compare(&resolved.clock), Ordering::Before) {
                let node = node.clone();
                let key = key.to_string();
                let payload = resolved.clone();
                if let Err(err) = node.put(&key, payload).await {
                    debug!(node = %node.identifier(), error = ?err, "read repair failed");
                }
            }
        }
        for node in &not_found {
            let node = node.clone();
            let key = key.to_string();
            let payload = resolved.clone();
            if let Err(err) = node.put(&key, payload).await {
                debug!(node = %node.identifier(), error = ?err, "read repair failed");
            }
        }

        Ok(resolved)
    }

    /// Drains and awaits all in-flight tail-replication tasks. Called from
    /// the binary's shutdown handler; client cancellation never triggers
    /// this, only process shutdown does (spec.md sec 5).
    pub async fn shutdown(&self) {
        let mut tasks = self.tail_tasks.lock().await;
        while tasks.join_next().await.is_some() {}
        info!("coordinator tail-replication pool drained");
    }
}

fn err_msg(err: &crate::replica::ReplicaError) -> String {
    match err {
        crate::replica::ReplicaError::NotFound => "not found".to_string(),
        crate::replica::ReplicaError::Unreachable(m) => m.clone(),
        crate::replica::ReplicaError::Protocol(m) => m.clone(),
    }
}

/// Left-fold conflict resolution over R `Versioned` responses
/// (spec.md sec 4.5.3). On `Concurrent`, apply a deterministic
/// Last-Writer-Wins tie-break (greater value wins by byte-lexicographic
/// order) and merge clocks so the outcome causally dominates both inputs.
pub fn resolve_conflicts<V: Clone + AsRef<[u8]>>(responses: Vec<Versioned<V>>) -> Versioned<V> {
    let mut iter = responses.into_iter();
    let mut resolved = iter.next().expect("at least one response required");

    for x in iter {
        match resolved.clock.compare(&x.clock) {
            Ordering::Before => {
                resolved.clock = resolved.clock.merge(&x.clock);
                resolved.value = x.value;
            }
            Ordering::After => {
                // resolved already dominates x; keep it.
            }
            Ordering::Equal => {
                // no-op
            }
            Ordering::Concurrent => {
                let merged = resolved.clock.merge(&x.clock);
                if x.value.as_ref() > resolved.value.as_ref() {
                    resolved.value = x.value;
                }
                resolved.clock = merged;
            }
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_ring::default_hash_fn;
    use crate::local_store::LocalStore;

    fn cfg(r: usize, w: usize, n: usize, v: u32) -> ClusterConfig {
        ClusterConfig {
            read_quorum: r,
            write_quorum: w,
            total_replicas: n,
            virtual_nodes: v,
            address: "127.0.0.1".into(),
            port: 0,
        }
    }

    async fn build_cluster(ids: &[&str], r: usize, w: usize, n: usize) -> Coordinator<String> {
        let ring: Arc<HashRing<String>> = Arc::new(HashRing::new(default_hash_fn(), 3, n));
        for id in ids {
            let node: Arc<dyn Replica<String>> = Arc::new(LocalStore::new(id.to_string()));
            ring.add_node(node).await.unwrap();
        }
        Coordinator::new(ring, cfg(r, w, n, 3)).unwrap()
    }

    #[tokio::test]
    async fn simple_write_then_read() {
        let coord = build_cluster(&["A", "B", "C"], 2, 2, 3).await;
        let written = coord.set("x", "v1".to_string()).await.unwrap();
        let read = coord.get("x").await.unwrap();
        assert_eq!(read.value, written.value);
        assert_eq!(read.clock, written.clock);
    }

    #[tokio::test]
    async fn overwrite_increments_at_origin() {
        let coord = build_cluster(&["A", "B", "C"], 2, 2, 3).await;
        let first = coord.set("x", "v1".to_string()).await.unwrap();
        let second = coord.set("x", "v2".to_string()).await.unwrap();
        assert!(second.clock.get(&first_writer(&first)) > first.clock.get(&first_writer(&first)));
        assert_eq!(second.value, "v2");
    }

    fn first_writer(v: &Versioned<String>) -> String {
        // helper: the single node id present in the freshly-minted clock.
        v.clock.keys().into_iter().next().expect("one writer")
    }

    #[tokio::test]
    async fn read_repair_heals_stale_replica() {
        let ring: Arc<HashRing<String>> = Arc::new(HashRing::new(default_hash_fn(), 3, 3));
        let a: Arc<LocalStore<String>> = Arc::new(LocalStore::new("A".into()));
        let b: Arc<LocalStore<String>> = Arc::new(LocalStore::new("B".into()));
        let c: Arc<LocalStore<String>> = Arc::new(LocalStore::new("C".into()));
        ring.add_node(a.clone() as Arc<dyn Replica<String>>).await.unwrap();
        ring.add_node(b.clone() as Arc<dyn Replica<String>>).await.unwrap();
        ring.add_node(c.clone() as Arc<dyn Replica<String>>).await.unwrap();

        let coord = Coordinator::new(ring.clone(), cfg(2, 2, 3, 3)).unwrap();
        let preference = ring.replicas("k").await.unwrap();
        let primary_id = preference[0].identifier().clone();

        // simulate: A and C got v2, B is stale at v1.
        let mut c1 = crate::vector_clock::VectorClock::new();
        c1.increment(&primary_id);
        let mut c2 = c1.clone();
        c2.increment(&primary_id);

        for node in &preference {
            if node.identifier() == &primary_id {
                node.put("k", Versioned::new("v2".to_string(), c2.clone()))
                    .await
                    .unwrap();
            }
        }
        // One non-primary node is set stale, the other current, matching scenario 3.
        let others: Vec<_> = preference
            .iter()
            .filter(|n| n.identifier() != &primary_id)
            .collect();
        others[0].put("k", Versioned::new("v1".to_string(), c1)).await.unwrap();
        others[1].put("k", Versioned::new("v2".to_string(), c2.clone())).await.unwrap();

        let resolved = coord.get("k").await.unwrap();
        assert_eq!(resolved.value, "v2");

        // Second read: stale replica must now be repaired.
        let second = coord.get("k").await.unwrap();
        assert_eq!(second.value, "v2");
        for node in &preference {
            let v = node.get("k").await.unwrap();
            assert_eq!(v.clock, resolved.clock);
        }
    }

    #[tokio::test]
    async fn concurrent_writes_resolve_deterministically() {
        let mut a = crate::vector_clock::VectorClock::new();
        a.increment("A");
        a.increment("A");
        a.increment("A");
        let mut b = crate::vector_clock::VectorClock::new();
        b.increment("B");

        let responses = vec![
            Versioned::new("p".to_string(), a.clone()),
            Versioned::new("q".to_string(), b.clone()),
        ];
        let resolved = resolve_conflicts(responses);
        assert_eq!(resolved.value, "q"); // "q" > "p" lexicographically
        assert_eq!(resolved.clock.get("A"), 3);
        assert_eq!(resolved.clock.get("B"), 1);
    }

    #[tokio::test]
    async fn read_quorum_unmet_when_too_few_replicas_respond() {
        // Only one node in a 3-way ring; R=2 cannot be satisfied.
        let ring: Arc<HashRing<String>> = Arc::new(HashRing::new(default_hash_fn(), 3, 3));
        let node: Arc<dyn Replica<String>> = Arc::new(LocalStore::new("A".into()));
        ring.add_node(node.clone()).await.unwrap();
        node.put("k", Versioned::origin("v".to_string())).await.unwrap();

        let coord = Coordinator::new(ring, cfg(2, 1, 3, 3)).unwrap();
        let err = coord.get("k").await.unwrap_err();
        assert!(matches!(err, AppError::ReadQuorumUnmet { .. }));
    }

    #[tokio::test]
    async fn no_nodes_fails_cleanly() {
        let ring: Arc<HashRing<String>> = Arc::new(HashRing::new(default_hash_fn(), 3, 3));
        let coord = Coordinator::new(ring, cfg(2, 2, 3, 3)).unwrap();
        assert!(matches!(
            coord.set("k", "v".to_string()).await.unwrap_err(),
            AppError::NoNodes
        ));
        assert!(matches!(coord.get("k").await.unwrap_err(), AppError::NoNodes));
    }
}
