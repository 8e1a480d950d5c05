//! dist_cache - A distributed cache coordinator
//!
//! Places keys on a set of storage nodes with a consistent-hash ring,
//! serializes writers per key with node-local leases and replicates every
//! write to all nodes on a best-effort basis.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::{AppState, NodeState};
pub use backend::{Backend, MemoryBackend, RemoteBackend};
pub use cache::DistributedCache;
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
