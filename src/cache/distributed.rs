//! Distributed Cache Module
//!
//! Orchestrates placement, leases and replication over the configured nodes.
//!
//! Consistency model: the primary copy is written under the key's lease and
//! is authoritative; replicas are written best-effort afterwards and may
//! diverge if a replica write fails. There is no rollback.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::backend::{Backend, BackendMap, Expiry};
use crate::cache::{
    Backoff, CacheEntry, Clock, HashRing, LeaseManager, NodeStats, SleepBackoff, SystemClock,
    MAX_TTL_SECONDS,
};
use crate::error::{CacheError, Result};

/// TTL applied when a put does not specify one (1 hour)
pub const DEFAULT_TTL: u64 = 3600;

// == Replication Report ==
/// Outcome of the replica fan-out of a put.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicationReport {
    pub primary: String,
    /// Replicas that accepted the write
    pub replicated: Vec<String>,
    /// Replicas that did not, with the reason
    pub failed: Vec<ReplicaFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicaFailure {
    pub node: String,
    pub error: String,
}

impl ReplicationReport {
    fn new(primary: &str) -> Self {
        Self {
            primary: primary.to_string(),
            replicated: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// True when every replica accepted the write.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// == Distributed Cache ==
/// Coordinator over a fixed set of nodes.
///
/// Holds no mutable state of its own; share it behind an `Arc`.
pub struct DistributedCache {
    ring: HashRing,
    backends: Arc<BackendMap>,
    leases: LeaseManager,
    clock: Arc<dyn Clock>,
    default_ttl: u64,
}

impl DistributedCache {
    // == Constructor ==
    /// Creates a coordinator over `nodes`, in replication order.
    ///
    /// Fails with `RingEmpty` when no nodes are given and with
    /// `InvalidConfig` on duplicate node ids.
    pub fn new(nodes: Vec<(String, Arc<dyn Backend>)>, virtual_nodes: usize) -> Result<Self> {
        if nodes.is_empty() {
            return Err(CacheError::RingEmpty);
        }

        let mut seen = HashSet::new();
        for (id, _) in &nodes {
            if !seen.insert(id.as_str()) {
                return Err(CacheError::InvalidConfig(format!(
                    "duplicate node id '{}'",
                    id
                )));
            }
        }

        let ring = HashRing::new(nodes.iter().map(|(id, _)| id.clone()), virtual_nodes);
        let backends: Arc<BackendMap> = Arc::new(nodes.into_iter().collect());
        let leases = LeaseManager::new(backends.clone(), Arc::new(SleepBackoff::uncancellable()));

        Ok(Self {
            ring,
            backends,
            leases,
            clock: Arc::new(SystemClock),
            default_ttl: DEFAULT_TTL,
        })
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the wait used between lease attempts.
    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.leases = LeaseManager::new(self.backends.clone(), backoff);
        self
    }

    pub fn with_default_ttl(mut self, ttl_seconds: u64) -> Self {
        self.default_ttl = ttl_seconds;
        self
    }

    pub fn ring(&self) -> &HashRing {
        &self.ring
    }

    pub fn leases(&self) -> &LeaseManager {
        &self.leases
    }

    // == Put ==
    /// Stores `value` on the primary node and replicates it to every other node.
    ///
    /// `ttl_seconds` defaults to the configured TTL and is clamped to
    /// [`MAX_TTL_SECONDS`]; 0 stores an entry that
    /// never expires. Fails with `PutFailed` when the lease cannot be taken or
    /// the primary write fails. Replica failures are only reported.
    pub async fn put(
        &self,
        key: &str,
        value: Value,
        ttl_seconds: Option<u64>,
    ) -> Result<ReplicationReport> {
        let primary = self
            .ring
            .resolve(key)
            .map_err(|e| CacheError::put_failed(key, e))?;
        let ttl = ttl_seconds.unwrap_or(self.default_ttl).min(MAX_TTL_SECONDS);

        let result = self
            .leases
            .with_lease(key, primary, || {
                self.write_replicated(key, value, ttl, primary)
            })
            .await;

        match result {
            Ok(report) => {
                info!(
                    "Key '{}' stored on primary node '{}' with TTL {} ({} replicas, {} failed)",
                    key,
                    primary,
                    ttl,
                    report.replicated.len(),
                    report.failed.len()
                );
                Ok(report)
            }
            Err(e) => {
                error!("Error storing key '{}': {}", key, e);
                Err(CacheError::put_failed(key, e))
            }
        }
    }

    async fn write_replicated(
        &self,
        key: &str,
        value: Value,
        ttl: u64,
        primary: &str,
    ) -> Result<ReplicationReport> {
        let entry = CacheEntry::new(value, ttl, self.clock.now());
        let raw = entry.to_raw()?;
        let expiry = if ttl > 0 {
            Expiry::After(Duration::from_secs(ttl))
        } else {
            Expiry::Never
        };

        self.backend(primary)?
            .set(key, raw.clone(), expiry)
            .await?;

        let mut report = ReplicationReport::new(primary);
        for node in self.ring.all_nodes().iter().filter(|n| n.as_str() != primary) {
            let outcome = match self.backend(node) {
                Ok(backend) => backend.set(key, raw.clone(), expiry).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => report.replicated.push(node.clone()),
                Err(e) => {
                    warn!("Error replicating key '{}' to node '{}': {}", key, node, e);
                    report.failed.push(ReplicaFailure {
                        node: node.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    // == Get ==
    /// Reads a value from the key's primary node.
    ///
    /// Counts the access on the primary copy. An expired entry is deleted
    /// from every node. Any failure is logged and reported as a miss.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let primary = match self.ring.resolve(key) {
            Ok(node) => node,
            Err(e) => {
                error!("Error retrieving key '{}': {}", key, e);
                return None;
            }
        };

        let result = self
            .leases
            .with_lease(key, primary, || self.read_and_touch(key, primary))
            .await;

        match result {
            Ok(value) => value,
            Err(e) => {
                error!("Error retrieving key '{}': {}", key, e);
                None
            }
        }
    }

    async fn read_and_touch(&self, key: &str, primary: &str) -> Result<Option<Value>> {
        let backend = self.backend(primary)?;

        let Some(raw) = backend.get(key).await? else {
            debug!("Cache MISS for key '{}' on node '{}'", key, primary);
            return Ok(None);
        };
        let mut entry = CacheEntry::from_raw(raw)?;

        let now = self.clock.now();
        if entry.is_expired(now) {
            debug!("Key '{}' expired, removing it from every node", key);
            // Already inside this key's lease
            self.delete_everywhere(key).await;
            return Ok(None);
        }

        entry.record_access(now);
        backend.set(key, entry.to_raw()?, Expiry::Keep).await?;

        debug!("Cache HIT for key '{}' on node '{}'", key, primary);
        Ok(Some(entry.value))
    }

    // == Delete ==
    /// Removes the key from every node.
    ///
    /// Returns true if at least one node held it. Failures are logged and
    /// reported as false.
    pub async fn delete(&self, key: &str) -> bool {
        let primary = match self.ring.resolve(key) {
            Ok(node) => node,
            Err(e) => {
                error!("Error deleting key '{}': {}", key, e);
                return false;
            }
        };

        let result = self
            .leases
            .with_lease(key, primary, || async { Ok(self.delete_everywhere(key).await) })
            .await;

        match result {
            Ok(deleted) => deleted,
            Err(e) => {
                error!("Error deleting key '{}': {}", key, e);
                false
            }
        }
    }

    async fn delete_everywhere(&self, key: &str) -> bool {
        let mut deleted = false;

        for node in self.ring.all_nodes() {
            let outcome = match self.backend(node) {
                Ok(backend) => backend.delete(key).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(existed) => deleted |= existed,
                Err(e) => warn!("Error deleting key '{}' from node '{}': {}", key, node, e),
            }
        }

        info!("Key '{}' deleted from the cluster", key);
        deleted
    }

    // == Exists ==
    /// Checks the primary node for the key, without taking the lease.
    pub async fn exists(&self, key: &str) -> bool {
        let result = match self.ring.resolve(key) {
            Ok(primary) => match self.backend(primary) {
                Ok(backend) => backend.exists(key).await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            error!("Error checking existence of key '{}': {}", key, e);
            false
        })
    }

    // == Entry ==
    /// Returns the primary node's entry for `key` without counting an access.
    pub async fn entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let primary = self.ring.resolve(key)?;
        match self.backend(primary)?.get(key).await? {
            Some(raw) => CacheEntry::from_raw(raw).map(Some),
            None => Ok(None),
        }
    }

    // == Node Stats ==
    /// Collects liveness, key count and memory usage of a node.
    ///
    /// Only an unknown node id is an error; metrics that cannot be collected
    /// are noted in the `error` field of the result.
    pub async fn node_stats(&self, node_id: &str) -> Result<NodeStats> {
        let backend = self.backend(node_id)?;
        let mut stats = NodeStats::new(node_id);

        match backend.ping().await {
            Ok(connected) => stats.connected = Some(connected),
            Err(e) => stats.record_error("connected", e),
        }
        match backend.key_count().await {
            Ok(count) => stats.key_count = Some(count),
            Err(e) => stats.record_error("keyCount", e),
        }
        match backend.memory_used().await {
            Ok(used) => stats.used_memory = used,
            Err(e) => stats.record_error("usedMemory", e),
        }

        if let Some(err) = &stats.error {
            error!("Error collecting stats of node '{}': {}", node_id, err);
        }
        Ok(stats)
    }

    // == Clear ==
    /// Flushes every node. Not atomic and takes no lease.
    pub async fn clear(&self) {
        for node in self.ring.all_nodes() {
            let outcome = match self.backend(node) {
                Ok(backend) => backend.flush_all().await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => info!("Node '{}' flushed", node),
                Err(e) => error!("Error flushing node '{}': {}", node, e),
            }
        }
    }

    fn backend(&self, node_id: &str) -> Result<&Arc<dyn Backend>> {
        self.backends
            .get(node_id)
            .ok_or_else(|| CacheError::NodeNotFound(node_id.to_string()))
    }
}
