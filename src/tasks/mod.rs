//! Background Tasks Module
//!
//! # Tasks
//! - TTL Cleanup: Reclaims natively expired keys of memory nodes

mod cleanup;

pub use cleanup::spawn_cleanup_task;
