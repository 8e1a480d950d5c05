//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::collections::HashSet;
use std::env;

use crate::cache::{DEFAULT_TTL, DEFAULT_VIRTUAL_NODES};
use crate::error::{CacheError, Result};

/// Which surface the binary serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Public `/api/cache` façade over the configured nodes
    Coordinator,
    /// A single memory node exposed under `/node`
    Storage,
}

impl Role {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "coordinator" => Ok(Role::Coordinator),
            "storage" => Ok(Role::Storage),
            other => Err(CacheError::InvalidConfig(format!("unknown role '{}'", other))),
        }
    }
}

/// Where a node's data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEndpoint {
    /// In-process memory node
    Memory,
    /// Storage node reached over HTTP
    Http(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub id: String,
    pub endpoint: NodeEndpoint,
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub role: Role,
    /// HTTP server port
    pub server_port: u16,
    /// Ordered node set; order fixes the ring's tie-breaking
    pub nodes: Vec<NodeConfig>,
    /// Virtual nodes per physical node
    pub virtual_nodes: usize,
    /// Default TTL in seconds for puts without explicit TTL
    pub default_ttl: u64,
    /// Interval in seconds between native-TTL sweeps of memory nodes
    pub cleanup_interval: u64,
    /// Per-request timeout of remote backends
    pub backend_timeout_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ROLE` - `coordinator` or `storage` (default: coordinator)
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `CACHE_NODES` - `id=endpoint` list (default: node1=memory,node2=memory)
    /// - `VIRTUAL_NODES` - Ring virtual nodes per node (default: 150)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `BACKEND_TIMEOUT_MS` - Remote backend timeout (default: 2000)
    ///
    /// Numeric values that fail to parse fall back to their default; a bad
    /// role or node list is an error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let role = match env::var("CACHE_ROLE") {
            Ok(raw) => Role::parse(&raw)?,
            Err(_) => defaults.role,
        };
        let nodes = match env::var("CACHE_NODES") {
            Ok(raw) => parse_nodes(&raw)?,
            Err(_) => defaults.nodes,
        };

        Ok(Self {
            role,
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            nodes,
            virtual_nodes: env::var("VIRTUAL_NODES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.virtual_nodes),
            default_ttl: env::var("DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.cleanup_interval),
            backend_timeout_ms: env::var("BACKEND_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.backend_timeout_ms),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            role: Role::Coordinator,
            server_port: 8080,
            nodes: vec![
                NodeConfig {
                    id: "node1".to_string(),
                    endpoint: NodeEndpoint::Memory,
                },
                NodeConfig {
                    id: "node2".to_string(),
                    endpoint: NodeEndpoint::Memory,
                },
            ],
            virtual_nodes: DEFAULT_VIRTUAL_NODES,
            default_ttl: DEFAULT_TTL,
            cleanup_interval: 1,
            backend_timeout_ms: 2000,
        }
    }
}

/// Parses a comma separated `id=endpoint` list.
///
/// `endpoint` is `memory` or an `http://` / `https://` base URL.
pub fn parse_nodes(raw: &str) -> Result<Vec<NodeConfig>> {
    let mut nodes = Vec::new();
    let mut seen = HashSet::new();

    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (id, endpoint) = item.split_once('=').ok_or_else(|| {
            CacheError::InvalidConfig(format!("expected id=endpoint, got '{}'", item))
        })?;
        let id = id.trim();
        let endpoint = endpoint.trim();

        if id.is_empty() {
            return Err(CacheError::InvalidConfig(format!("empty node id in '{}'", item)));
        }
        if !seen.insert(id.to_string()) {
            return Err(CacheError::InvalidConfig(format!("duplicate node id '{}'", id)));
        }

        let endpoint = if endpoint.eq_ignore_ascii_case("memory") {
            NodeEndpoint::Memory
        } else if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            NodeEndpoint::Http(endpoint.to_string())
        } else {
            return Err(CacheError::InvalidConfig(format!(
                "unsupported endpoint '{}' for node '{}'",
                endpoint, id
            )));
        };

        nodes.push(NodeConfig {
            id: id.to_string(),
            endpoint,
        });
    }

    if nodes.is_empty() {
        return Err(CacheError::InvalidConfig("node list is empty".to_string()));
    }
    Ok(nodes)
}
