//! API Handlers
//!
//! HTTP request handlers for the coordinator's `/api/cache` endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::backend::{Backend, MemoryBackend, RemoteBackend};
use crate::cache::{Backoff, DistributedCache, NodeStats, ReplicationReport};
use crate::config::{Config, NodeEndpoint};
use crate::error::{CacheError, Result};
use crate::models::{validate_key, CachePutRequest, CacheResponse, HealthResponse};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The coordinator; immutable after startup
    pub cache: Arc<DistributedCache>,
}

impl AppState {
    /// Creates a new AppState around a coordinator.
    pub fn new(cache: DistributedCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Builds the coordinator described by `config`.
    ///
    /// Also returns the in-process memory nodes, which need a cleanup task.
    pub fn from_config(
        config: &Config,
        backoff: Arc<dyn Backoff>,
    ) -> Result<(Self, Vec<MemoryBackend>)> {
        let timeout = Duration::from_millis(config.backend_timeout_ms);
        let mut memory_nodes = Vec::new();
        let mut nodes: Vec<(String, Arc<dyn Backend>)> = Vec::with_capacity(config.nodes.len());

        for node in &config.nodes {
            let backend: Arc<dyn Backend> = match &node.endpoint {
                NodeEndpoint::Memory => {
                    let memory = MemoryBackend::new(node.id.clone());
                    memory_nodes.push(memory.clone());
                    Arc::new(memory)
                }
                NodeEndpoint::Http(url) => Arc::new(RemoteBackend::new(node.id.clone(), url, timeout)?),
            };
            nodes.push((node.id.clone(), backend));
        }

        let cache = DistributedCache::new(nodes, config.virtual_nodes)?
            .with_backoff(backoff)
            .with_default_ttl(config.default_ttl);

        Ok((Self::new(cache), memory_nodes))
    }
}

fn check_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(()),
    }
}

/// Handler for POST /api/cache/:key
///
/// Stores a value on the key's primary node and replicates it.
pub async fn put_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<CachePutRequest>,
) -> Result<Json<CacheResponse<ReplicationReport>>> {
    if let Some(error_msg) = validate_key(&key).or_else(|| req.validate()) {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl();
    let report = state.cache.put(&key, req.value, ttl).await?;

    Ok(Json(CacheResponse::success_with(
        "Value stored successfully",
        report,
    )))
}

/// Handler for GET /api/cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CacheResponse<Value>>> {
    check_key(&key)?;

    match state.cache.get(&key).await {
        Some(value) => Ok(Json(CacheResponse::success_with("Value found", value))),
        None => Err(CacheError::NotFound(format!("{} (missing or expired)", key))),
    }
}

/// Handler for DELETE /api/cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CacheResponse<bool>>> {
    check_key(&key)?;

    if state.cache.delete(&key).await {
        Ok(Json(CacheResponse::success_with(
            "Key deleted successfully",
            true,
        )))
    } else {
        Err(CacheError::NotFound(key))
    }
}

/// Handler for HEAD /api/cache/:key
///
/// 200 if the key's primary node holds it, 404 otherwise, 400 for an
/// invalid key.
pub async fn exists_handler(State(state): State<AppState>, Path(key): Path<String>) -> StatusCode {
    if check_key(&key).is_err() {
        StatusCode::BAD_REQUEST
    } else if state.cache.exists(&key).await {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Handler for GET /api/cache/stats/:node_id
pub async fn stats_handler(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> Result<Json<CacheResponse<NodeStats>>> {
    let stats = state.cache.node_stats(&node_id).await?;
    Ok(Json(CacheResponse::success_with("Node statistics", stats)))
}

/// Handler for DELETE /api/cache/clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<CacheResponse<()>> {
    state.cache.clear().await;
    Json(CacheResponse::ok("Cache cleared successfully"))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
