//! Causality algebra on NodeId -> counter maps. All functions here are
//! total; the vector clock surfaces no error kinds (spec.md sec 4.1).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type NodeId = String;

/// A finite mapping NodeId -> non-negative counter. Missing keys are zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VectorClock {
    counters: HashMap<NodeId, u64>,
}

/// Result of comparing two vector clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Before,
    After,
    Equal,
    Concurrent,
}

impl VectorClock {
    pub fn new() -> Self {
        Self {
            counters: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn get(&self, node_id: &str) -> u64 {
        self.counters.get(node_id).copied().unwrap_or(0)
    }

    pub fn keys(&self) -> Vec<NodeId> {
        self.counters.keys().cloned().collect()
    }

    /// Adds 1 to the counter for `node_id`, creating it at 1 if absent.
    /// Used exactly once per origin-write at the writer's own node.
    pub fn increment(&mut self, node_id: &str) {
        *self.counters.entry(node_id.to_string()).or_insert(0) += 1;
    }

    /// Componentwise maximum over the union of keys. Pure: does not mutate
    /// either input. Associative, commutative, idempotent.
    pub fn merge(&self, other: &VectorClock) -> VectorClock {
        let mut merged = self.counters.clone();
        for (node_id, count) in &other.counters {
            let entry = merged.entry(node_id.clone()).or_insert(0);
            if *count > *entry {
                *entry = *count;
            }
        }
        VectorClock { counters: merged }
    }

    /// `less = exists id. self[id] < other[id]`, `greater` symmetrically,
    /// both zero-filled over the union of keys.
    pub fn compare(&self, other: &VectorClock) -> Ordering {
        let mut less = false;
        let mut greater = false;

        let mut all_ids: std::collections::HashSet<&str> =
            self.counters.keys().map(String::as_str).collect();
        all_ids.extend(other.counters.keys().map(String::as_str));

        for id in all_ids {
            let a = self.get(id);
            let b = other.get(id);
            if a < b {
                less = true;
            }
            if a > b {
                greater = true;
            }
        }

        match (less, greater) {
            (true, false) => Ordering::Before,
            (false, true) => Ordering::After,
            (false, false) => Ordering::Equal,
            (true, true) => Ordering::Concurrent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_is_monotone_at_origin() {
        let mut vc = VectorClock::new();
        assert_eq!(vc.get("a"), 0);
        vc.increment("a");
        assert_eq!(vc.get("a"), 1);
        vc.increment("a");
        assert_eq!(vc.get("a"), 2);
    }

    #[test]
    fn compare_is_total_and_correct() {
        let mut a = VectorClock::new();
        a.increment("x");
        let mut b = a.clone();
        b.increment("x");

        assert_eq!(a.compare(&b), Ordering::Before);
        assert_eq!(b.compare(&a), Ordering::After);
        assert_eq!(a.compare(&a), Ordering::Equal);

        let mut c = VectorClock::new();
        c.increment("y");
        assert_eq!(a.compare(&c), Ordering::Concurrent);
    }

    #[test]
    fn merge_is_least_upper_bound() {
        let mut a = VectorClock::new();
        a.increment("x");
        a.increment("x");
        let mut b = VectorClock::new();
        b.increment("y");

        let merged = a.merge(&b);
        assert_eq!(merged.get("x"), 2);
        assert_eq!(merged.get("y"), 1);

        // merge(a, b) dominates both a and b.
        assert!(matches!(
            a.compare(&merged),
            Ordering::Before | Ordering::Equal
        ));
        assert!(matches!(
            b.compare(&merged),
            Ordering::Before | Ordering::Equal
        ));
    }

    #[test]
    fn merge_is_commutative_and_idempotent() {
        let mut a = VectorClock::new();
        a.increment("x");
        let mut b = VectorClock::new();
        b.increment("y");
        b.increment("y");

        assert_eq!(a.merge(&b), b.merge(&a));
        assert_eq!(a.merge(&a), a);
    }
}
