//! Storage Node Protocol
//!
//! Endpoints and DTOs spoken between a coordinator's `RemoteBackend` and a
//! storage node serving a `MemoryBackend` over HTTP.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::Expiry;

// --- API Endpoints ---

/// Key operations: `PUT`, `GET`, `DELETE`, `HEAD` on `/node/keys/:key`
pub const ENDPOINT_KEYS: &str = "keys";
/// Set-if-absent: `POST /node/keys/:key/nx`
pub const ENDPOINT_SET_IF_ABSENT: &str = "nx";
/// Flush all keys: `POST /node/flush`
pub const ENDPOINT_FLUSH: &str = "flush";
/// Liveness: `GET /node/ping`
pub const ENDPOINT_PING: &str = "ping";
/// Size and memory: `GET /node/info`
pub const ENDPOINT_INFO: &str = "info";
/// Common prefix of every node endpoint
pub const NODE_PREFIX: &str = "node";

/// Milliseconds carried on the wire, saturating at `u64::MAX`.
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// --- Data Transfer Objects ---

/// Body of `PUT /node/keys/:key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSetRequest {
    pub value: Value,
    /// Expiry in milliseconds, absent = no expiry
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    /// Preserve the key's current expiry, takes precedence over `ttl_ms`
    #[serde(default)]
    pub keep_ttl: bool,
}

impl NodeSetRequest {
    pub fn new(value: Value, expiry: Expiry) -> Self {
        let (ttl_ms, keep_ttl) = match expiry {
            Expiry::After(ttl) => (Some(millis(ttl)), false),
            Expiry::Never => (None, false),
            Expiry::Keep => (None, true),
        };
        Self {
            value,
            ttl_ms,
            keep_ttl,
        }
    }

    pub fn expiry(&self) -> Expiry {
        if self.keep_ttl {
            Expiry::Keep
        } else {
            match self.ttl_ms {
                Some(ms) => Expiry::After(Duration::from_millis(ms)),
                None => Expiry::Never,
            }
        }
    }
}

/// Body of `POST /node/keys/:key/nx`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSetIfAbsentRequest {
    pub value: Value,
    pub ttl_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSetIfAbsentResponse {
    pub created: bool,
}

/// Body of a successful `GET /node/keys/:key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeValueResponse {
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDeleteResponse {
    pub existed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePingResponse {
    pub pong: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfoResponse {
    pub key_count: u64,
    #[serde(default)]
    pub used_memory: Option<u64>,
}
