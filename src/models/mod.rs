//! Request and Response models
//!
//! DTOs used for serializing/deserializing HTTP bodies, both on the public
//! cache API and between coordinators and storage nodes.

pub mod node;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{validate_key, CachePutRequest};
pub use responses::{CacheResponse, HealthResponse};
