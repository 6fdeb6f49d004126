//! Persistence Abstraction
//!
//! The storage node only needs an ordered key-value store keyed by
//! `(partition_id, version)` plus two aggregate queries: the highest version of a
//! partition and the highest Lamport clock a node has produced.
//!
//! `MemoryBackend` keeps one `BTreeMap` per partition so range scans come out
//! ordered by version without sorting.

use dashmap::DashMap;
use std::collections::BTreeMap;

use super::types::LogEntry;
use crate::error::{LogError, Result};

pub trait LogBackend: Send + Sync {
    /// Persists a new entry. Fails if `(partition_id, version)` already exists.
    fn append(&self, entry: LogEntry) -> Result<()>;

    fn get(&self, partition_id: &str, version: u64) -> Result<Option<LogEntry>>;

    /// Entries with `start <= version <= end`, ascending.
    fn range(&self, partition_id: &str, start: u64, end: u64) -> Result<Vec<LogEntry>>;

    fn max_version(&self, partition_id: &str) -> Result<Option<u64>>;

    fn max_clock(&self, node_id: &str) -> Result<Option<u64>>;
}

#[derive(Default)]
pub struct MemoryBackend {
    partitions: DashMap<String, BTreeMap<u64, LogEntry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        self.partitions.iter().map(|p| p.value().len()).sum()
    }

    /// Rewrites a stored message in place without touching its checksum.
    #[cfg(test)]
    pub(crate) fn corrupt_message(&self, partition_id: &str, version: u64, message: &str) {
        if let Some(mut partition) = self.partitions.get_mut(partition_id)
            && let Some(entry) = partition.get_mut(&version)
        {
            entry.message = message.to_string();
        }
    }
}

impl LogBackend for MemoryBackend {
    fn append(&self, entry: LogEntry) -> Result<()> {
        let mut partition = self
            .partitions
            .entry(entry.partition_id.clone())
            .or_default();

        if partition.contains_key(&entry.version) {
            return Err(LogError::io(format!(
                "entry {}/{} already exists",
                entry.partition_id, entry.version
            )));
        }
        partition.insert(entry.version, entry);
        Ok(())
    }

    fn get(&self, partition_id: &str, version: u64) -> Result<Option<LogEntry>> {
        Ok(self
            .partitions
            .get(partition_id)
            .and_then(|partition| partition.get(&version).cloned()))
    }

    fn range(&self, partition_id: &str, start: u64, end: u64) -> Result<Vec<LogEntry>> {
        if start > end {
            return Ok(Vec::new());
        }
        Ok(self
            .partitions
            .get(partition_id)
            .map(|partition| partition.range(start..=end).map(|(_, e)| e.clone()).collect())
            .unwrap_or_default())
    }

    fn max_version(&self, partition_id: &str) -> Result<Option<u64>> {
        Ok(self
            .partitions
            .get(partition_id)
            .and_then(|partition| partition.keys().next_back().copied()))
    }

    fn max_clock(&self, node_id: &str) -> Result<Option<u64>> {
        Ok(self
            .partitions
            .iter()
            .flat_map(|partition| {
                partition
                    .value()
                    .values()
                    .filter(|e| e.node_id == node_id)
                    .map(|e| e.lamport_clock)
                    .max()
            })
            .max())
    }
}
