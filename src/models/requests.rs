//! Request DTOs for the cache API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{LOCK_PREFIX, MAX_KEY_LENGTH, MAX_TTL_SECONDS};

/// Request body for `POST /api/cache/:key`
///
/// # Fields
/// - `value`: Any JSON value to store
/// - `ttl_seconds`: Optional TTL in seconds (uses the default if absent)
#[derive(Debug, Clone, Deserialize)]
pub struct CachePutRequest {
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds; negative values and values above
    /// `MAX_TTL_SECONDS` are rejected
    #[serde(default, alias = "ttlSeconds")]
    pub ttl_seconds: Option<i64>,
}

impl CachePutRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        match self.ttl_seconds {
            Some(ttl) if ttl < 0 => Some("TTL cannot be negative".to_string()),
            Some(ttl) if ttl as u64 > MAX_TTL_SECONDS => Some(format!(
                "TTL exceeds maximum of {} seconds",
                MAX_TTL_SECONDS
            )),
            _ => None,
        }
    }

    /// TTL once validated.
    pub fn ttl(&self) -> Option<u64> {
        self.ttl_seconds.and_then(|ttl| u64::try_from(ttl).ok())
    }
}

/// Validates a key taken from the request path.
///
/// Lease marker keys and the `.`/`..` path segments are refused.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    if key == "." || key == ".." {
        return Some(format!("Key '{}' is not allowed", key));
    }
    if key.starts_with(LOCK_PREFIX) {
        return Some(format!("Keys starting with '{}' are reserved", LOCK_PREFIX));
    }
    None
}
