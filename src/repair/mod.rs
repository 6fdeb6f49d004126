//! Read-Repair Module
//!
//! The coordinator side of anti-entropy: every read is compared across all
//! replicas, and replicas that lag behind the newest Lamport clock are healed in
//! the background.
//!
//! ## Submodules
//! - **`coordinator`**: scatter/gather read, canonical selection, stale detection.
//! - **`dispatcher`**: background workers that perform repair writes.
//! - **`client`**: transport to storage nodes (`ReplicaClient`, HTTP implementation).
//! - **`metrics`**: triggered/completed/failed repair counters.
//! - **`reconciler`**: periodic pairwise Merkle comparison and its job ledger.
//! - **`protocol`** / **`handlers`**: the coordinator's HTTP contract.

pub mod client;
pub mod coordinator;
pub mod dispatcher;
pub mod handlers;
pub mod metrics;
pub mod protocol;
pub mod reconciler;
pub mod types;
