//! API Routes
//!
//! Configures the Axum routers of both server roles.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, exists_handler, get_handler, health_handler, put_handler,
    stats_handler, AppState,
};
use super::node_handlers::{
    node_delete_handler, node_exists_handler, node_flush_handler, node_get_handler,
    node_info_handler, node_ping_handler, node_set_handler, node_set_if_absent_handler, NodeState,
};

/// Creates the coordinator router.
///
/// # Endpoints
/// - `POST /api/cache/:key` - Store a value
/// - `GET /api/cache/:key` - Retrieve a value
/// - `DELETE /api/cache/:key` - Delete a key from every node
/// - `HEAD /api/cache/:key` - Check whether the primary node holds a key
/// - `GET /api/cache/stats/:node_id` - Node statistics
/// - `DELETE /api/cache/clear` - Flush every node
/// - `GET /health` - Health check endpoint
///
/// Browsers may call it from any origin; every request is traced.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/cache/clear", delete(clear_handler))
        .route("/api/cache/stats/:node_id", get(stats_handler))
        .route(
            "/api/cache/:key",
            get(get_handler)
                .post(put_handler)
                .delete(delete_handler)
                .head(exists_handler),
        )
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Creates the storage node router, spoken by `RemoteBackend`.
pub fn create_node_router(state: NodeState) -> Router {
    Router::new()
        .route(
            "/node/keys/:key",
            get(node_get_handler)
                .put(node_set_handler)
                .delete(node_delete_handler)
                .head(node_exists_handler),
        )
        .route("/node/keys/:key/nx", post(node_set_if_absent_handler))
        .route("/node/flush", post(node_flush_handler))
        .route("/node/ping", get(node_ping_handler))
        .route("/node/info", get(node_info_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
