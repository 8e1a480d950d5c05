//! API Module
//!
//! HTTP handlers and routing for both server roles.
//!
//! # Coordinator endpoints
//! - `POST /api/cache/:key` - Store a value
//! - `GET /api/cache/:key` - Retrieve a value
//! - `DELETE /api/cache/:key` - Delete a key
//! - `HEAD /api/cache/:key` - Check existence
//! - `GET /api/cache/stats/:node_id` - Node statistics
//! - `DELETE /api/cache/clear` - Flush every node
//! - `GET /health` - Health check endpoint
//!
//! # Storage node endpoints
//! - `/node/keys/:key`, `/node/keys/:key/nx`, `/node/flush`, `/node/ping`, `/node/info`

pub mod handlers;
pub mod node_handlers;
pub mod routes;

pub use handlers::*;
pub use node_handlers::NodeState;
pub use routes::{create_node_router, create_router};
