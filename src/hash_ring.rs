//! Consistent hash ring with virtual nodes and N-way replica selection
//! (spec.md sec 4.4). Structural mutation (add/remove) is mutually
//! exclusive with itself; readers see a consistent snapshot and may run
//! concurrently with each other, via `tokio::sync::RwLock`.

use crate::error::AppError;
use crate::replica::Replica;
use crate::vector_clock::NodeId;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A hash-function factory, so the ring's hash function is injected rather
/// than hardcoded (Design Notes: "the HashRing takes a hash-function
/// factory"). Defaults to the standard library's SipHash via
/// `DefaultHasher`.
pub type HashFn = Arc<dyn Fn(&[u8]) -> u64 + Send + Sync>;

pub fn default_hash_fn() -> HashFn {
    Arc::new(|bytes: &[u8]| {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        hasher.finish()
    })
}

struct RingState<V> {
    slots: BTreeMap<u64, NodeId>,
    nodes: HashMap<NodeId, Arc<dyn Replica<V>>>,
}

impl<V> RingState<V> {
    fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
            nodes: HashMap::new(),
        }
    }
}

pub struct HashRing<V> {
    hash_fn: HashFn,
    virtual_nodes: u32,
    replication_factor: usize,
    state: RwLock<RingState<V>>,
}

impl<V: Send + Sync + 'static> HashRing<V> {
    pub fn new(hash_fn: HashFn, virtual_nodes: u32, replication_factor: usize) -> Self {
        Self {
            hash_fn,
            virtual_nodes,
            replication_factor,
            state: RwLock::new(RingState::new()),
        }
    }

    fn hash(&self, bytes: &[u8]) -> u64 {
        (self.hash_fn)(bytes)
    }

    /// Inserts `virtual_nodes` slots for `node`, hashing `"{id}#{i}"`.
    /// Fails `NodeExists` if the physical node is already present, or if a
    /// generated slot hash collides with an existing one.
    pub async fn add_node(&self, node: Arc<dyn Replica<V>>) -> Result<(), AppError> {
        let id = node.identifier().clone();
        let mut state = self.state.write().await;
        if state.nodes.contains_key(&id) {
            return Err(AppError::NodeExists(id));
        }

        let mut new_slots = Vec::with_capacity(self.virtual_nodes as usize);
        for i in 0..self.virtual_nodes {
            let vnode_key = format!("{}#{}", id, i);
            let h = self.hash(vnode_key.as_bytes());
            if state.slots.contains_key(&h) {
                return Err(AppError::NodeExists(id));
            }
            new_slots.push(h);
        }

        for h in new_slots {
            state.slots.insert(h, id.clone());
        }
        state.nodes.insert(id, node);
        Ok(())
    }

    /// Removes every slot owned by `node_id` and drops it from the
    /// physical-node set.
    pub async fn remove_node(&self, node_id: &str) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        if state.nodes.remove(node_id).is_none() {
            return Err(AppError::NodeNotFound(node_id.to_string()));
        }
        state.slots.retain(|_, owner| owner != node_id);
        Ok(())
    }

    /// The node responsible for `key`: hash it, find the least slot hash
    /// >= h, wrapping to the first slot past the end.
    pub async fn primary(&self, key: &str) -> Result<Arc<dyn Replica<V>>, AppError> {
        let state = self.state.read().await;
        if state.slots.is_empty() {
            return Err(AppError::NoNodes);
        }
        let h = self.hash(key.as_bytes());
        let owner = state
            .slots
            .range(h..)
            .next()
            .or_else(|| state.slots.iter().next())
            .map(|(_, id)| id.clone())
            .expect("slots non-empty");
        Ok(state.nodes.get(&owner).expect("slot owner always registered").clone())
    }

    /// Up to N distinct physical replicas for `key`, walking the ring
    /// forward from the primary slot and skipping nodes already yielded.
    pub async fn replicas(&self, key: &str) -> Result<Vec<Arc<dyn Replica<V>>>, AppError> {
        let state = self.state.read().await;
        if state.slots.is_empty() {
            return Err(AppError::NoNodes);
        }
        let h = self.hash(key.as_bytes());

        let total_slots = state.slots.len();
        let start_idx = state.slots.range(h..).next().map(|(hash, _)| *hash);
        let ordered: Vec<(&u64, &NodeId)> = match start_idx {
            Some(start_hash) => {
                let mut v: Vec<(&u64, &NodeId)> = state.slots.range(start_hash..).collect();
                v.extend(state.slots.range(..start_hash));
                v
            }
            None => state.slots.iter().collect(),
        };

        let mut seen = std::collections::HashSet::new();
        let mut result = Vec::with_capacity(self.replication_factor);
        for (_, owner) in ordered.into_iter().take(total_slots) {
            if result.len() >= self.replication_factor {
                break;
            }
            if seen.insert(owner.clone()) {
                if let Some(node) = state.nodes.get(owner) {
                    result.push(node.clone());
                }
            }
        }

        if result.is_empty() {
            return Err(AppError::NoNodes);
        }
        Ok(result)
    }

    pub async fn physical_node_count(&self) -> usize {
        self.state.read().await.nodes.len()
    }

    pub async fn contains(&self, node_id: &str) -> bool {
        self.state.read().await.nodes.contains_key(node_id)
    }
}
