//! Node Store Module
//!
//! Key-value storage of a single memory node, with native TTL expiration.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::Expiry;

// == Stored Value ==
#[derive(Debug, Clone)]
struct StoredValue {
    value: Value,
    /// None = no expiration
    expires_at: Option<DateTime<Utc>>,
}

impl StoredValue {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }
}

// == Node Store ==
/// Storage of one node.
///
/// Expired keys behave as absent for every operation and are physically
/// removed either when touched or by [`NodeStore::cleanup_expired`].
#[derive(Debug, Default)]
pub struct NodeStore {
    entries: HashMap<String, StoredValue>,
}

impl NodeStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Set ==
    /// Stores a value, overwriting any previous one.
    ///
    /// `Expiry::Keep` preserves the remaining TTL of a live key; on an absent
    /// key it behaves like `Expiry::Never`.
    pub fn set(&mut self, key: &str, value: Value, expiry: Expiry, now: DateTime<Utc>) {
        let expires_at = match expiry {
            Expiry::After(ttl) => Some(deadline(now, ttl)),
            Expiry::Never => None,
            Expiry::Keep => self.live(key, now).and_then(|stored| stored.expires_at),
        };

        self.entries
            .insert(key.to_string(), StoredValue { value, expires_at });
    }

    // == Set If Absent ==
    /// Stores the value only if no live key exists.
    pub fn set_if_absent(
        &mut self,
        key: &str,
        value: Value,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> bool {
        if self.live(key, now).is_some() {
            return false;
        }

        self.entries.insert(
            key.to_string(),
            StoredValue {
                value,
                expires_at: Some(deadline(now, ttl)),
            },
        );
        true
    }

    // == Get ==
    /// Retrieves a live value by key.
    pub fn get(&mut self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        self.live(key, now).map(|stored| stored.value.clone())
    }

    // == Delete ==
    /// Removes a key. Returns true if a live key was removed.
    pub fn delete(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        match self.entries.remove(key) {
            Some(stored) => !stored.is_expired(now),
            None => false,
        }
    }

    pub fn exists(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        self.live(key, now).is_some()
    }

    /// Removes everything.
    pub fn flush(&mut self) {
        self.entries.clear();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, stored| !stored.is_expired(now));
        before - self.entries.len()
    }

    // == Length ==
    /// Number of physically stored keys, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Approximate footprint: key bytes plus serialized value bytes.
    pub fn approximate_bytes(&self) -> u64 {
        self.entries
            .iter()
            .map(|(key, stored)| (key.len() + stored.value.to_string().len()) as u64)
            .sum()
    }

    /// Returns the stored value if it is live, dropping it if expired.
    fn live(&mut self, key: &str, now: DateTime<Utc>) -> Option<&StoredValue> {
        if self.entries.get(key).is_some_and(|stored| stored.is_expired(now)) {
            self.entries.remove(key);
        }
        self.entries.get(key)
    }
}

fn deadline(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
