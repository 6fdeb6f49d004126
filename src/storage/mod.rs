//! Storage Node Module
//!
//! Durable, versioned, checksummed storage of append-only partition logs.
//!
//! ## Core Concepts
//! - **Versioning**: each partition's versions start at 1 and grow by exactly one per
//!   accepted write, assigned under a partition-scoped lock.
//! - **Lamport Clock**: a node-wide logical clock; a write's clock is
//!   `max(node clock, caller hint) + 1`.
//! - **Integrity**: messages are stored with their SHA-256 and verified on every read.
//! - **Persistence**: `LogBackend` is the only thing the node needs from a store.

pub mod backend;
pub mod checksum;
pub mod handlers;
pub mod node;
pub mod protocol;
pub mod types;
