//! Cache Module
//!
//! Placement, leasing and replication of entries across the configured nodes.

mod clock;
mod distributed;
mod entry;
mod lease;
mod ring;
mod stats;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use distributed::{DistributedCache, ReplicaFailure, ReplicationReport, DEFAULT_TTL};
pub use entry::{CacheEntry, MAX_TTL_SECONDS};
pub use lease::{
    lock_key, Backoff, LeaseManager, SleepBackoff, LOCK_PREFIX, LOCK_TIMEOUT, LOCK_VALUE,
    MAX_RETRIES, RETRY_DELAY_MS,
};
pub use ring::{ring_hash, HashRing, DEFAULT_VIRTUAL_NODES};
pub use stats::NodeStats;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
