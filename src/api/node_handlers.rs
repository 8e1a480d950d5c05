//! Storage Node Handlers
//!
//! Serve one memory node's primitives to remote coordinators.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::backend::{Backend, MemoryBackend};
use crate::error::{CacheError, Result};
use crate::models::node::{
    NodeDeleteResponse, NodeInfoResponse, NodePingResponse, NodeSetIfAbsentRequest,
    NodeSetIfAbsentResponse, NodeSetRequest, NodeValueResponse,
};

/// State of a storage node.
#[derive(Clone)]
pub struct NodeState {
    pub store: MemoryBackend,
}

impl NodeState {
    pub fn new(store: MemoryBackend) -> Self {
        Self { store }
    }
}

/// PUT /node/keys/:key
pub async fn node_set_handler(
    State(state): State<NodeState>,
    Path(key): Path<String>,
    Json(req): Json<NodeSetRequest>,
) -> Result<StatusCode> {
    let expiry = req.expiry();
    state.store.set(&key, req.value, expiry).await?;
    Ok(StatusCode::OK)
}

/// GET /node/keys/:key
pub async fn node_get_handler(
    State(state): State<NodeState>,
    Path(key): Path<String>,
) -> Result<Json<NodeValueResponse>> {
    match state.store.get(&key).await? {
        Some(value) => Ok(Json(NodeValueResponse { value })),
        None => Err(CacheError::NotFound(key)),
    }
}

/// DELETE /node/keys/:key
pub async fn node_delete_handler(
    State(state): State<NodeState>,
    Path(key): Path<String>,
) -> Result<Json<NodeDeleteResponse>> {
    let existed = state.store.delete(&key).await?;
    Ok(Json(NodeDeleteResponse { existed }))
}

/// HEAD /node/keys/:key
pub async fn node_exists_handler(
    State(state): State<NodeState>,
    Path(key): Path<String>,
) -> Result<StatusCode> {
    if state.store.exists(&key).await? {
        Ok(StatusCode::OK)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

/// POST /node/keys/:key/nx
pub async fn node_set_if_absent_handler(
    State(state): State<NodeState>,
    Path(key): Path<String>,
    Json(req): Json<NodeSetIfAbsentRequest>,
) -> Result<Json<NodeSetIfAbsentResponse>> {
    let created = state
        .store
        .set_if_absent(&key, req.value, Duration::from_millis(req.ttl_ms))
        .await?;
    Ok(Json(NodeSetIfAbsentResponse { created }))
}

/// POST /node/flush
pub async fn node_flush_handler(State(state): State<NodeState>) -> Result<StatusCode> {
    state.store.flush_all().await?;
    Ok(StatusCode::OK)
}

/// GET /node/ping
pub async fn node_ping_handler(State(state): State<NodeState>) -> Result<Json<NodePingResponse>> {
    let pong = state.store.ping().await?;
    Ok(Json(NodePingResponse { pong }))
}

/// GET /node/info
pub async fn node_info_handler(State(state): State<NodeState>) -> Result<Json<NodeInfoResponse>> {
    let key_count = state.store.key_count().await?;
    let used_memory = state.store.memory_used().await?;
    Ok(Json(NodeInfoResponse {
        key_count,
        used_memory,
    }))
}
