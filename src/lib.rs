//! Replicated Log Library
//!
//! A replicated, versioned log store that tolerates replica divergence through
//! Lamport-clock-based read-repair instead of synchronous consensus.
//!
//! ## Architecture Modules
//! - **`storage`**: The storage node. Owns append-only partition logs, assigns
//!   versions and Lamport clocks under a per-partition lock, and checksums every
//!   message.
//! - **`directory`**: The static list of storage node addresses a coordinator reads from.
//! - **`repair`**: The read-repair coordinator. Fans reads out to every replica, picks the
//!   entry with the highest Lamport clock and heals lagging replicas in the background.
//! - **`merkle`**: Hash trees over version segments for comparing two replicas' logs.
//! - **`config`**: Command line and environment configuration of both roles.
//! - **`error`**: The error taxonomy shared by all of the above.

pub mod config;
pub mod directory;
pub mod error;
pub mod merkle;
pub mod repair;
pub mod storage;
