//! Axum realizations of the external interfaces in spec.md sec 6. The core
//! (coordinator, hash ring, local store) stays transport-agnostic behind
//! the `Replica` trait; this module is the one concrete transport.

pub mod coordinator_router;
pub mod node_router;

pub use coordinator_router::coordinator_router;
pub use node_router::node_router;
