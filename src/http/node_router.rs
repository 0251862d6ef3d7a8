//! Replica-exposed HTTP interface (spec.md sec 6), consumed by `NodeClient`.

use crate::local_store::LocalStore;
use crate::versioned::Versioned;
use axum::{
    extract::{Path, State},
    http::Method,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub type NodeState = Arc<LocalStore<String>>;

pub fn node_router(store: NodeState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT]);

    Router::new()
        .route("/{key}", get(get_key).put(put_key))
        .route("/health", get(health))
        .layer(cors)
        .with_state(store)
}

async fn health() -> &'static str {
    "ok"
}

async fn get_key(
    State(store): State<NodeState>,
    Path(key): Path<String>,
) -> Result<Json<Versioned<String>>, axum::http::StatusCode> {
    match store.get(&key) {
        Some(v) => Ok(Json(v)),
        None => Err(axum::http::StatusCode::NOT_FOUND),
    }
}

async fn put_key(
    State(store): State<NodeState>,
    Path(key): Path<String>,
    Json(incoming): Json<Versioned<String>>,
) -> Json<Versioned<String>> {
    Json(store.put(&key, incoming))
}
