//! Placement Ring Module
//!
//! Consistent hashing with virtual nodes, mapping keys to a primary node.

use std::collections::BTreeMap;

use sha1::{Digest, Sha1};

use crate::error::{CacheError, Result};

/// Virtual ring positions per physical node
pub const DEFAULT_VIRTUAL_NODES: usize = 150;

// == Hash Ring ==
/// Immutable consistent-hash ring.
///
/// Built once from a fixed node list; lookups never mutate it, so a shared
/// reference can be read from any number of tasks.
#[derive(Debug, Clone)]
pub struct HashRing {
    /// Ring position -> physical node
    ring: BTreeMap<u32, String>,
    /// Physical nodes in configured order
    nodes: Vec<String>,
}

impl HashRing {
    // == Constructor ==
    /// Builds the ring with `virtual_nodes` positions per physical node.
    ///
    /// Each position is the hash of `"{node}_virtual_{i}"`. When two
    /// positions collide the later node wins the slot.
    pub fn new<I, S>(nodes: I, virtual_nodes: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let nodes: Vec<String> = nodes.into_iter().map(Into::into).collect();
        let mut ring = BTreeMap::new();

        for node in &nodes {
            for i in 0..virtual_nodes {
                let virtual_node = format!("{}_virtual_{}", node, i);
                ring.insert(ring_hash(&virtual_node), node.clone());
            }
        }

        Self { ring, nodes }
    }

    // == Resolve ==
    /// Returns the primary node for a key.
    ///
    /// Picks the first ring position at or after the key's hash, wrapping
    /// to the lowest position when the hash is past the end of the ring.
    pub fn resolve(&self, key: &str) -> Result<&str> {
        let hash = ring_hash(key);

        self.ring
            .range(hash..)
            .next()
            .or_else(|| self.ring.iter().next())
            .map(|(_, node)| node.as_str())
            .ok_or(CacheError::RingEmpty)
    }

    /// All physical nodes, in replication order.
    pub fn all_nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Number of occupied ring positions.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

// == Hash Function ==
/// First four bytes of the SHA-1 digest, big-endian.
pub fn ring_hash(key: &str) -> u32 {
    let digest = Sha1::digest(key.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}
