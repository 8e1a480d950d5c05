//! Backend Module
//!
//! The primitive key-value operations the coordinator needs from each node,
//! and the implementations shipped with the crate.

mod memory;
mod remote;
mod store;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use memory::MemoryBackend;
pub use remote::RemoteBackend;
pub use store::NodeStore;

// == Expiry ==
/// Expiry applied by a `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Expire after the given duration
    After(Duration),
    /// Never expire
    Never,
    /// Keep whatever expiry the key already has
    Keep,
}

// == Backend Trait ==
/// Primitive operations of a single key-value node.
///
/// Implementations own their transport; every failure surfaces as
/// `CacheError::BackendUnavailable`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Unconditional overwrite.
    async fn set(&self, key: &str, value: Value, expiry: Expiry) -> Result<()>;

    /// Point read.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Removes the key, returning whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Atomically creates the key if absent. Returns true iff this call created it.
    async fn set_if_absent(&self, key: &str, value: Value, ttl: Duration) -> Result<bool>;

    /// Wipes every key on the node.
    async fn flush_all(&self) -> Result<()>;

    async fn ping(&self) -> Result<bool>;

    /// Approximate number of stored keys.
    async fn key_count(&self) -> Result<u64>;

    /// Best-effort memory usage in bytes.
    async fn memory_used(&self) -> Result<Option<u64>>;
}

/// Node id -> backend handle, fixed at startup.
pub type BackendMap = HashMap<String, Arc<dyn Backend>>;
