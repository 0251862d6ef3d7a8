//! Replicated key-value store with vector-clock causality tracking and
//! consistent-hash placement. See `SPEC_FULL.md` for the full design.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod hash_ring;
pub mod http;
pub mod local_store;
pub mod membership;
pub mod node_client;
pub mod replica;
pub mod vector_clock;
pub mod versioned;
