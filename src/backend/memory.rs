//! In-memory Backend
//!
//! A node living in the coordinator's process, or served to remote
//! coordinators by a storage node.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Backend, Expiry, NodeStore};
use crate::cache::{Clock, SystemClock};
use crate::error::{CacheError, Result};

// == Memory Backend ==
/// Thread-safe handle to a [`NodeStore`].
///
/// Cloning shares the same store.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    name: String,
    store: Arc<RwLock<NodeStore>>,
    clock: Arc<dyn Clock>,
    online: Arc<AtomicBool>,
}

impl MemoryBackend {
    /// Creates an empty node using the system clock.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_clock(name, Arc::new(SystemClock))
    }

    pub fn with_clock(name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            store: Arc::new(RwLock::new(NodeStore::new())),
            clock,
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Simulates an outage: while offline every primitive fails.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Reclaims expired keys, returning how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        self.store.write().await.cleanup_expired(now)
    }

    fn check_online(&self) -> Result<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::BackendUnavailable(format!(
                "node '{}' is offline",
                self.name
            )))
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn set(&self, key: &str, value: Value, expiry: Expiry) -> Result<()> {
        self.check_online()?;
        let now = self.clock.now();
        self.store.write().await.set(key, value, expiry, now);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.check_online()?;
        let now = self.clock.now();
        // Write lock: reads drop expired keys
        Ok(self.store.write().await.get(key, now))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.check_online()?;
        let now = self.clock.now();
        Ok(self.store.write().await.delete(key, now))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.check_online()?;
        let now = self.clock.now();
        Ok(self.store.write().await.exists(key, now))
    }

    async fn set_if_absent(&self, key: &str, value: Value, ttl: Duration) -> Result<bool> {
        self.check_online()?;
        let now = self.clock.now();
        Ok(self.store.write().await.set_if_absent(key, value, ttl, now))
    }

    async fn flush_all(&self) -> Result<()> {
        self.check_online()?;
        self.store.write().await.flush();
        Ok(())
    }

    async fn ping(&self) -> Result<bool> {
        self.check_online()?;
        Ok(true)
    }

    async fn key_count(&self) -> Result<u64> {
        self.check_online()?;
        Ok(self.store.read().await.len() as u64)
    }

    async fn memory_used(&self) -> Result<Option<u64>> {
        self.check_online()?;
        Ok(Some(self.store.read().await.approximate_bytes()))
    }
}
