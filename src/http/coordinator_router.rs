//! Coordinator-exposed HTTP interface (spec.md sec 6): quorum get/put plus
//! the membership register/deregister endpoints.

use crate::coordinator::Coordinator;
use crate::error::AppError;
use crate::membership::{self, NodeDescriptor};
use crate::versioned::Versioned;
use axum::{
    extract::{Path, State},
    http::Method,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub type CoordinatorState = Arc<Coordinator<String>>;

pub fn coordinator_router(coordinator: CoordinatorState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT, Method::POST]);

    Router::new()
        .route("/{key}", get(get_key).put(put_key))
        .route("/node/register", post(register_node))
        .route("/node/deregister", post(deregister_node))
        .route("/health", get(health))
        .layer(cors)
        .with_state(coordinator)
}

async fn health() -> &'static str {
    "ok"
}

async fn get_key(
    State(coord): State<CoordinatorState>,
    Path(key): Path<String>,
) -> Result<Json<Versioned<String>>, AppError> {
    coord.get(&key).await.map(Json)
}

async fn put_key(
    State(coord): State<CoordinatorState>,
    Path(key): Path<String>,
    Json(incoming): Json<Versioned<String>>,
) -> Result<Json<Versioned<String>>, AppError> {
    coord.set(&key, incoming.value).await.map(Json)
}

async fn register_node(
    State(coord): State<CoordinatorState>,
    Json(descriptor): Json<NodeDescriptor>,
) -> Result<(), AppError> {
    membership::validate_descriptor(&descriptor)?;
    membership::register::<String>(coord.hash_ring().as_ref(), descriptor).await
}

async fn deregister_node(
    State(coord): State<CoordinatorState>,
    Json(descriptor): Json<NodeDescriptor>,
) -> Result<(), AppError> {
    membership::deregister::<String>(coord.hash_ring().as_ref(), &descriptor.id).await
}
