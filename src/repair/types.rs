use serde::{Deserialize, Serialize};

use crate::directory::types::ReplicaAddress;
use crate::merkle::tree::InconsistentSegment;
use crate::storage::types::LogEntry;

/// One replica's answer to a scatter read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaVote {
    pub replica: ReplicaAddress,
    pub entry: LogEntry,
}

/// Outcome of `read_with_repair`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalResult {
    pub entry: LogEntry,
    /// Replica whose answer was chosen.
    pub source_replica: ReplicaAddress,
    /// Replicas that answered before the aggregation point.
    pub responded: Vec<ReplicaAddress>,
    /// Responding replicas whose clock is strictly below the canonical one.
    pub stale_replicas: Vec<ReplicaAddress>,
    pub repair_dispatched: bool,
}

/// Result of comparing two replicas' Merkle trees for one partition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MerkleComparison {
    pub partition_id: String,
    pub left: ReplicaAddress,
    pub right: ReplicaAddress,
    pub left_root: String,
    pub right_root: String,
    pub inconsistent_segments: Vec<InconsistentSegment>,
}

impl MerkleComparison {
    pub fn is_consistent(&self) -> bool {
        self.left_root == self.right_root
    }
}

/// Reachability of one directory entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaStatus {
    pub replica: ReplicaAddress,
    pub node_id: Option<String>,
    pub status: String,
}
