//! Coordinator Network Protocol
//!
//! Endpoints and response bodies of the read-repair coordinator.

use serde::{Deserialize, Serialize};

use super::reconciler::{ReconciliationJob, ReconciliationStats};
use super::types::{CanonicalResult, ReplicaStatus};
use crate::storage::types::LogEntry;

/// Read with repair; followed by `/{partition}/{version}`.
pub const ENDPOINT_READ_WITH_REPAIR: &str = "/api/repair/read";
/// Repair counters.
pub const ENDPOINT_REPAIR_STATS: &str = "/api/repair/stats";
/// Health of every configured replica.
pub const ENDPOINT_REPLICAS: &str = "/api/repair/replicas";
/// Merkle comparison of two replicas; followed by `/{partition}?left=&right=`.
pub const ENDPOINT_MERKLE_COMPARE: &str = "/api/merkle/compare";
pub const ENDPOINT_COORDINATOR_HEALTH: &str = "/health";
/// Reconciliation counters and job table.
pub const ENDPOINT_RECONCILIATION_JOBS: &str = "/api/reconciliation/jobs";
/// Runs one reconciliation pass immediately.
pub const ENDPOINT_RECONCILIATION_RUN: &str = "/api/reconciliation/run";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadWithRepairResponse {
    pub status: String,
    pub entry: LogEntry,
    pub source_replica: String,
    pub responded_replicas: usize,
    pub stale_replica_count: usize,
    pub stale_replicas: Vec<String>,
    pub repair_dispatched: bool,
}

impl From<CanonicalResult> for ReadWithRepairResponse {
    fn from(result: CanonicalResult) -> Self {
        Self {
            status: crate::storage::protocol::STATUS_SUCCESS.to_string(),
            entry: result.entry,
            source_replica: result.source_replica.to_string(),
            responded_replicas: result.responded.len(),
            stale_replica_count: result.stale_replicas.len(),
            stale_replicas: result
                .stale_replicas
                .iter()
                .map(|replica| replica.to_string())
                .collect(),
            repair_dispatched: result.repair_dispatched,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareParams {
    #[serde(default)]
    pub left: Option<usize>,
    #[serde(default)]
    pub right: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicasResponse {
    pub replicas: Vec<ReplicaStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorHealth {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationResponse {
    pub stats: ReconciliationStats,
    pub jobs: Vec<ReconciliationJob>,
}
