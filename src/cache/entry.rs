//! Cache Entry Module
//!
//! Defines the record stored on every node for a key, with TTL and access
//! bookkeeping.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

/// Longest accepted TTL (100 years); longer TTLs are clamped to it
pub const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// Stored on backends as a camelCase JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The stored payload
    pub value: Value,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Expiration timestamp, None = never expires
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Number of successful reads, starting at 1 on creation
    pub access_count: u64,
    /// Timestamp of the last successful read
    pub last_accessed: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `value` - The payload to store
    /// * `ttl_seconds` - TTL in seconds, 0 means the entry never expires,
    ///   clamped to [`MAX_TTL_SECONDS`]
    /// * `now` - Creation time
    pub fn new(value: Value, ttl_seconds: u64, now: DateTime<Utc>) -> Self {
        let expires_at = if ttl_seconds > 0 {
            chrono::Duration::from_std(Duration::from_secs(ttl_seconds.min(MAX_TTL_SECONDS)))
                .ok()
                .and_then(|ttl| now.checked_add_signed(ttl))
        } else {
            None
        };

        Self {
            value,
            created_at: now,
            expires_at,
            access_count: 1,
            last_accessed: now,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired only once `now` is strictly past `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => now > expires,
            None => false,
        }
    }

    // == Record Access ==
    /// Increments the access counter and stamps the access time.
    pub fn record_access(&mut self, now: DateTime<Utc>) {
        self.access_count += 1;
        self.last_accessed = now;
    }

    // == Raw Conversion ==
    /// Encodes the entry in the shape written to backends.
    pub fn to_raw(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| CacheError::ConversionError(e.to_string()))
    }

    /// Normalizes a raw backend value into an entry.
    ///
    /// Accepts the structured JSON object written by [`CacheEntry::to_raw`] as
    /// well as the same object carried as a JSON-encoded string.
    pub fn from_raw(raw: Value) -> Result<Self> {
        match raw {
            Value::String(text) => serde_json::from_str(&text)
                .map_err(|e| CacheError::ConversionError(e.to_string())),
            other => serde_json::from_value(other)
                .map_err(|e| CacheError::ConversionError(e.to_string())),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_creation_with_ttl() {
        let now = Utc::now();
        let entry = CacheEntry::new(json!("alice"), 60, now);

        assert_eq!(entry.value, json!("alice"));
        assert_eq!(entry.access_count, 1);
        assert_eq!(entry.created_at, now);
        assert_eq!(entry.last_accessed, now);
        assert_eq!(entry.expires_at, Some(now + chrono::Duration::seconds(60)));
    }

    #[test]
    fn test_entry_creation_zero_ttl_never_expires() {
        let now = Utc::now();
        let entry = CacheEntry::new(json!(1), 0, now);

        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired(now + chrono::Duration::days(3650)));
    }

    #[test]
    fn test_entry_creation_clamps_huge_ttl() {
        let now = Utc::now();
        let cap = now + chrono::Duration::seconds(MAX_TTL_SECONDS as i64);

        for ttl in [MAX_TTL_SECONDS + 1, 18_446_744_073_709_552, u64::MAX] {
            let entry = CacheEntry::new(json!("v"), ttl, now);
            assert_eq!(entry.expires_at, Some(cap));
        }
    }

    #[test]
    fn test_expiration_boundary_is_strict() {
        let now = Utc::now();
        let entry = CacheEntry::new(json!("v"), 10, now);
        let expires = entry.expires_at.unwrap();

        assert!(!entry.is_expired(expires));
        assert!(entry.is_expired(expires + chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn test_record_access() {
        let now = Utc::now();
        let later = now + chrono::Duration::seconds(5);
        let mut entry = CacheEntry::new(json!("v"), 10, now);

        entry.record_access(later);
        entry.record_access(later);

        assert_eq!(entry.access_count, 3);
        assert_eq!(entry.last_accessed, later);
        assert_eq!(entry.expires_at, Some(now + chrono::Duration::seconds(10)));
    }

    #[test]
    fn test_raw_shape_is_camel_case() {
        let entry = CacheEntry::new(json!({"name": "alice"}), 60, Utc::now());
        let raw = entry.to_raw().unwrap();

        assert!(raw.get("createdAt").is_some());
        assert!(raw.get("expiresAt").is_some());
        assert_eq!(raw["accessCount"], json!(1));
        assert_eq!(CacheEntry::from_raw(raw).unwrap(), entry);
    }

    #[test]
    fn test_from_raw_accepts_encoded_string() {
        let entry = CacheEntry::new(json!([1, 2, 3]), 0, Utc::now());
        let text = serde_json::to_string(&entry).unwrap();

        let decoded = CacheEntry::from_raw(Value::String(text)).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_from_raw_ignores_unknown_fields() {
        let raw = json!({
            "@class": "CacheEntry",
            "value": "x",
            "createdAt": "2024-01-01T10:00:00Z",
            "accessCount": 4,
            "lastAccessed": "2024-01-01T10:05:00Z"
        });

        let entry = CacheEntry::from_raw(raw).unwrap();
        assert_eq!(entry.access_count, 4);
        assert!(entry.expires_at.is_none());
    }

    #[test]
    fn test_from_raw_rejects_foreign_values() {
        assert!(matches!(
            CacheEntry::from_raw(json!("plain text")),
            Err(CacheError::ConversionError(_))
        ));
        assert!(matches!(
            CacheEntry::from_raw(json!({"value": 1})),
            Err(CacheError::ConversionError(_))
        ));
        assert!(matches!(
            CacheEntry::from_raw(json!(42)),
            Err(CacheError::ConversionError(_))
        ));
    }
}
