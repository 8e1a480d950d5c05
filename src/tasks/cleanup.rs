//! TTL Cleanup Task
//!
//! Background task that reclaims natively expired keys of memory nodes.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::MemoryBackend;

/// Spawns a background task that sweeps expired keys from every given node.
///
/// Expired keys are already invisible to reads; the sweep only frees their
/// memory. Abort the returned handle during graceful shutdown.
pub fn spawn_cleanup_task(nodes: Vec<MemoryBackend>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task for {} node(s) with interval of {} seconds",
            nodes.len(),
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            for node in &nodes {
                let removed = node.cleanup_expired().await;
                if removed > 0 {
                    info!("TTL cleanup: removed {} expired keys from '{}'", removed, node.name());
                } else {
                    debug!("TTL cleanup: no expired keys on '{}'", node.name());
                }
            }
        }
    })
}
