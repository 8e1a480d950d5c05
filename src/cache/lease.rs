//! Lease Manager Module
//!
//! Per-key mutual exclusion built on a backend's atomic set-if-absent.
//!
//! A lease is the marker key `lock:{key}` on the key's primary node. It
//! carries no holder identity: `release` deletes it whoever set it, and a
//! holder whose marker expired cannot tell that someone else took over.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::backend::BackendMap;
use crate::error::{CacheError, Result};

// == Lease Constants ==
/// Prefix of lease marker keys
pub const LOCK_PREFIX: &str = "lock:";
/// Value stored in every lease marker
pub const LOCK_VALUE: &str = "locked";
/// Lifetime of a lease marker
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
/// Number of set-if-absent attempts per acquisition
pub const MAX_RETRIES: u32 = 3;
/// Base backoff, multiplied by the attempt number
pub const RETRY_DELAY_MS: u64 = 100;

/// Marker key guarding `key`.
pub fn lock_key(key: &str) -> String {
    format!("{}{}", LOCK_PREFIX, key)
}

// == Backoff ==
/// Wait between lease attempts.
#[async_trait]
pub trait Backoff: Send + Sync {
    /// Waits for `delay`. Returns false if the wait was cancelled.
    async fn wait(&self, delay: Duration) -> bool;
}

/// Tokio-timer backoff, cancelled when the shutdown channel flips to true.
#[derive(Debug, Clone)]
pub struct SleepBackoff {
    shutdown: watch::Receiver<bool>,
}

impl SleepBackoff {
    pub fn new(shutdown: watch::Receiver<bool>) -> Self {
        Self { shutdown }
    }

    /// Backoff that is never cancelled.
    pub fn uncancellable() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self::new(rx)
    }
}

#[async_trait]
impl Backoff for SleepBackoff {
    async fn wait(&self, delay: Duration) -> bool {
        let mut shutdown = self.shutdown.clone();
        if *shutdown.borrow() {
            return false;
        }

        let cancelled = async move {
            // A dropped sender can never cancel
            let closed = shutdown.wait_for(|stop| *stop).await.is_err();
            if closed {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = cancelled => false,
        }
    }
}

// == Lease Manager ==
pub struct LeaseManager {
    backends: Arc<BackendMap>,
    backoff: Arc<dyn Backoff>,
}

impl LeaseManager {
    pub fn new(backends: Arc<BackendMap>, backoff: Arc<dyn Backoff>) -> Self {
        Self { backends, backoff }
    }

    // == Acquire ==
    /// Tries to place the lease marker for `key` on `node_id`.
    ///
    /// Makes up to [`MAX_RETRIES`] attempts, waiting 100, 200, 300 ms after
    /// each failed one. A backend error counts as a failed attempt. Returns
    /// false as soon as a wait is cancelled.
    pub async fn acquire(&self, key: &str, node_id: &str) -> bool {
        let Some(backend) = self.backends.get(node_id) else {
            error!("Cannot lock key '{}': unknown node '{}'", key, node_id);
            return false;
        };
        let marker = lock_key(key);

        for attempt in 0..MAX_RETRIES {
            match backend
                .set_if_absent(&marker, Value::from(LOCK_VALUE), LOCK_TIMEOUT)
                .await
            {
                Ok(true) => {
                    debug!("Lock acquired for key '{}' on node '{}'", key, node_id);
                    return true;
                }
                Ok(false) => {
                    debug!(
                        "Lock for key '{}' on node '{}' is held (attempt {})",
                        key,
                        node_id,
                        attempt + 1
                    );
                }
                Err(e) => {
                    warn!(
                        "Lock attempt {} for key '{}' on node '{}' failed: {}",
                        attempt + 1,
                        key,
                        node_id,
                        e
                    );
                }
            }

            let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt + 1));
            if !self.backoff.wait(delay).await {
                warn!("Lock acquisition for key '{}' cancelled", key);
                return false;
            }
        }

        false
    }

    // == Release ==
    /// Deletes the lease marker, regardless of who placed it.
    pub async fn release(&self, key: &str, node_id: &str) {
        release_marker(&self.backends, key, node_id).await;
    }

    // == With Lease ==
    /// Runs `operation` while holding the lease for `(key, node_id)`.
    ///
    /// The lease is released after the operation whether it succeeded or
    /// not. If the returned future is dropped while the lease is held, the
    /// release runs on a spawned task instead. Fails with
    /// `LockAcquisitionFailed` without running the operation when the lease
    /// cannot be taken.
    pub async fn with_lease<T, F, Fut>(&self, key: &str, node_id: &str, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.acquire(key, node_id).await {
            return Err(CacheError::LockAcquisitionFailed(key.to_string()));
        }

        let mut guard = ReleaseOnDrop::new(self.backends.clone(), key, node_id);
        let result = operation().await;
        release_marker(&self.backends, key, node_id).await;
        guard.disarm();
        result
    }
}

async fn release_marker(backends: &BackendMap, key: &str, node_id: &str) {
    let Some(backend) = backends.get(node_id) else {
        error!("Cannot unlock key '{}': unknown node '{}'", key, node_id);
        return;
    };

    match backend.delete(&lock_key(key)).await {
        Ok(_) => debug!("Lock released for key '{}' on node '{}'", key, node_id),
        Err(e) => warn!(
            "Error releasing lock for key '{}' on node '{}': {}",
            key, node_id, e
        ),
    }
}

/// Releases a held lease in the background when its holder is dropped early.
struct ReleaseOnDrop {
    backends: Arc<BackendMap>,
    key: String,
    node_id: String,
    armed: bool,
}

impl ReleaseOnDrop {
    fn new(backends: Arc<BackendMap>, key: &str, node_id: &str) -> Self {
        Self {
            backends,
            key: key.to_string(),
            node_id: node_id.to_string(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                "Lock for key '{}' on node '{}' left to expire: no runtime",
                self.key, self.node_id
            );
            return;
        };

        warn!(
            "Operation on key '{}' cancelled while holding its lock, releasing",
            self.key
        );
        let backends = self.backends.clone();
        let key = std::mem::take(&mut self.key);
        let node_id = std::mem::take(&mut self.node_id);
        runtime.spawn(async move {
            release_marker(&backends, &key, &node_id).await;
        });
    }
}
