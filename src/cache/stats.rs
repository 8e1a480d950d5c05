//! Node Statistics Module
//!
//! Health and size metrics reported for a single node.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

// == Node Stats ==
/// Metrics of one node.
///
/// A metric that could not be collected is left empty and its failure is
/// appended to `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStats {
    pub node_id: String,
    /// Result of the liveness probe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
    /// Number of keys stored on the node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_count: Option<u64>,
    /// Memory used in bytes, when the node reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NodeStats {
    // == Constructor ==
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Self::default()
        }
    }

    // == Record Error ==
    /// Notes that `metric` could not be collected.
    pub fn record_error(&mut self, metric: &str, err: impl Display) {
        let message = format!("{}: {}", metric, err);
        self.error = Some(match self.error.take() {
            Some(existing) => format!("{}; {}", existing, message),
            None => message,
        });
    }

    /// True when the node answered the probe and every metric was collected.
    pub fn is_healthy(&self) -> bool {
        self.connected == Some(true) && self.error.is_none()
    }
}
