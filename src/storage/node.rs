//! Storage Node
//!
//! Owns the versioned, checksummed logs of every partition written to this node.
//!
//! ## Write Path
//! 1. Validate input (nothing is touched on failure).
//! 2. Take the partition's mutex. All writers of one partition serialize here,
//!    writers of different partitions do not contend.
//! 3. Assign `version = max_known_version + 1` and reserve the next Lamport clock.
//! 4. Persist through the `LogBackend`. Only a successful append advances the
//!    cached version; a failed append hands the reserved clock back.

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use super::backend::LogBackend;
use super::checksum;
use super::types::{LogEntry, NodeHealth, STATUS_UP, now_ms};
use crate::error::{LogError, Result};

/// Mutable per-partition state, only touched while holding the partition lock.
#[derive(Debug, Default)]
struct PartitionState {
    /// `None` until the partition is first written on this process.
    max_version: Option<u64>,
}

pub struct StorageNode {
    node_id: String,
    backend: Arc<dyn LogBackend>,
    partitions: DashMap<String, Arc<Mutex<PartitionState>>>,
    node_clock: AtomicU64,
}

impl StorageNode {
    /// Creates a node on top of `backend`, recovering the node clock from what the
    /// backend already holds for `node_id`.
    pub fn new(node_id: impl Into<String>, backend: Arc<dyn LogBackend>) -> Result<Arc<Self>> {
        let node_id = node_id.into();
        if node_id.trim().is_empty() {
            return Err(LogError::validation("node id must not be empty"));
        }

        let recovered_clock = backend.max_clock(&node_id)?.unwrap_or(0);
        tracing::info!(
            "Storage node {} starting with lamport clock {}",
            node_id,
            recovered_clock
        );

        Ok(Arc::new(Self {
            node_id,
            backend,
            partitions: DashMap::new(),
            node_clock: AtomicU64::new(recovered_clock),
        }))
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Highest Lamport clock this node has handed out.
    pub fn current_clock(&self) -> u64 {
        self.node_clock.load(Ordering::SeqCst)
    }

    pub async fn write(
        &self,
        partition_id: &str,
        message: &str,
        lamport_hint: Option<u64>,
    ) -> Result<LogEntry> {
        if partition_id.trim().is_empty() {
            return Err(LogError::validation("partitionId is required"));
        }
        if message.is_empty() {
            return Err(LogError::validation("message is required"));
        }

        let lock = self.partition_lock(partition_id);
        let mut state = lock.lock().await;

        let max_version = match state.max_version {
            Some(v) => v,
            None => self.backend.max_version(partition_id)?.unwrap_or(0),
        };
        let version = max_version + 1;
        let (previous_clock, lamport_clock) = self.reserve_clock(lamport_hint.unwrap_or(0))?;

        let entry = LogEntry {
            partition_id: partition_id.to_string(),
            version,
            lamport_clock,
            message: message.to_string(),
            timestamp: now_ms(),
            node_id: self.node_id.clone(),
            checksum: checksum::compute(message),
        };

        if let Err(e) = self.backend.append(entry.clone()) {
            // Give the clock back unless another partition already moved past it.
            let _ = self.node_clock.compare_exchange(
                lamport_clock,
                previous_clock,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
            tracing::error!(
                "Write to partition {} failed at version {}: {}",
                partition_id,
                version,
                e
            );
            return Err(match e {
                LogError::Io { .. } => e,
                other => LogError::io(other.to_string()),
            });
        }

        state.max_version = Some(version);
        tracing::debug!(
            "Wrote {}/{} clock={} on {}",
            partition_id,
            version,
            lamport_clock,
            self.node_id
        );
        Ok(entry)
    }

    pub fn read(&self, partition_id: &str, version: u64) -> Result<LogEntry> {
        let entry = self
            .backend
            .get(partition_id, version)?
            .ok_or_else(|| LogError::NotFound {
                partition_id: partition_id.to_string(),
                version,
            })?;
        self.checked(entry)
    }

    pub fn read_latest(&self, partition_id: &str) -> Result<LogEntry> {
        let version =
            self.backend
                .max_version(partition_id)?
                .ok_or_else(|| LogError::PartitionEmpty {
                    partition_id: partition_id.to_string(),
                })?;
        self.read(partition_id, version)
    }

    /// Snapshot of `start..=end`, ascending by version.
    pub fn read_range(&self, partition_id: &str, start: u64, end: u64) -> Result<Vec<LogEntry>> {
        self.backend
            .range(partition_id, start, end)?
            .into_iter()
            .map(|entry| self.checked(entry))
            .collect()
    }

    pub fn health(&self) -> NodeHealth {
        NodeHealth {
            node_id: self.node_id.clone(),
            status: STATUS_UP.to_string(),
            timestamp: now_ms(),
        }
    }

    fn checked(&self, entry: LogEntry) -> Result<LogEntry> {
        if let Err(e) = checksum::verify(&entry) {
            tracing::error!("Integrity check failed on {}: {}", self.node_id, e);
            return Err(e);
        }
        Ok(entry)
    }

    fn partition_lock(&self, partition_id: &str) -> Arc<Mutex<PartitionState>> {
        self.partitions
            .entry(partition_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Atomically advances the node clock to `max(current, hint) + 1`.
    /// Returns `(previous, assigned)`. A clock that would pass `u64::MAX` is refused
    /// and leaves the node clock untouched.
    fn reserve_clock(&self, hint: u64) -> Result<(u64, u64)> {
        let mut current = self.node_clock.load(Ordering::SeqCst);
        loop {
            let next = current.max(hint).checked_add(1).ok_or_else(|| {
                LogError::validation(format!(
                    "lamport clock exhausted (node clock {}, hint {})",
                    current, hint
                ))
            })?;
            match self.node_clock.compare_exchange(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok((current, next)),
                Err(observed) => current = observed,
            }
        }
    }
}
