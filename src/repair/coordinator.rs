//! Read-Repair Coordinator
//!
//! A stateless fan-out/fan-in service over the replica directory.
//!
//! ## Read Path
//! `SCATTER -> TIMEOUT_WAIT -> SELECT_CANONICAL -> [REPAIR_DISPATCH] -> RETURN`
//! 1. **Scatter**: read `(partition, version)` from every replica concurrently, each
//!    call bounded by `read_timeout`. Failures, misses and timeouts drop that
//!    replica's vote; they never make it stale.
//! 2. **Select**: the canonical entry has the highest Lamport clock. Ties go to the
//!    smallest `node_id`, then the smallest replica address.
//! 3. **Repair**: replicas with a strictly lower clock get the canonical message
//!    re-written through the normal write path, on the dispatcher's workers.
//!    The caller is answered without waiting for any of it.
//!
//! ## Reconciliation
//! With `reconcile_partitions` configured, a `ReconciliationSweep` periodically
//! compares every replica pair's Merkle trees for those partitions and records
//! each comparison as a job in the `ReconciliationLedger`.

use std::sync::{Arc, Weak};
use std::time::Duration;

use super::client::ReplicaClient;
use super::dispatcher::{RepairDispatcher, RepairJob};
use super::metrics::{RepairMetrics, RepairStats};
use super::reconciler::{
    ReconciliationJob, ReconciliationLedger, ReconciliationStats, ReconciliationSweep,
};
use super::types::{CanonicalResult, MerkleComparison, ReplicaStatus, ReplicaVote};
use crate::directory::types::{ReplicaAddress, ReplicaDirectory};
use crate::error::{LogError, Result};
use crate::merkle::tree::{DEFAULT_SEGMENT_SIZE, MerkleTree};
use crate::storage::checksum;
use crate::storage::types::{LogEntry, STATUS_UP};

/// Tunables of the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Budget of each scatter read.
    pub read_timeout: Duration,
    /// Budget of each background repair write.
    pub repair_timeout: Duration,
    pub repair_workers: usize,
    pub merkle_segment_size: usize,
    /// Highest version fetched when building Merkle trees.
    pub merkle_range_limit: u64,
    /// Partitions swept by periodic reconciliation. Empty disables the sweep.
    pub reconcile_partitions: Vec<String>,
    pub reconcile_interval: Duration,
    /// Comparisons run per reconciliation pass.
    pub reconcile_batch: usize,
    /// Finished reconciliation jobs kept for inspection.
    pub reconcile_history: usize,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(2000),
            repair_timeout: Duration::from_millis(5000),
            repair_workers: 4,
            merkle_segment_size: DEFAULT_SEGMENT_SIZE,
            merkle_range_limit: 10_000,
            reconcile_partitions: Vec::new(),
            reconcile_interval: Duration::from_secs(60),
            reconcile_batch: 3,
            reconcile_history: 1000,
        }
    }
}

pub struct ReadRepairCoordinator {
    directory: ReplicaDirectory,
    client: Arc<dyn ReplicaClient>,
    metrics: Arc<dyn RepairMetrics>,
    dispatcher: Arc<RepairDispatcher>,
    reconciliation: ReconciliationLedger,
    sweep: Option<ReconciliationSweep>,
    settings: CoordinatorSettings,
}

impl ReadRepairCoordinator {
    /// Builds the coordinator and starts its repair workers and, when partitions
    /// are configured, the reconciliation sweep.
    pub fn new(
        directory: ReplicaDirectory,
        client: Arc<dyn ReplicaClient>,
        metrics: Arc<dyn RepairMetrics>,
        settings: CoordinatorSettings,
    ) -> Arc<Self> {
        let dispatcher = RepairDispatcher::start(
            client.clone(),
            metrics.clone(),
            settings.repair_workers,
            settings.repair_timeout,
        );

        tracing::info!(
            "Read-repair coordinator over {} replicas (read timeout {:?})",
            directory.len(),
            settings.read_timeout
        );

        Arc::new_cyclic(|coordinator: &Weak<Self>| {
            let sweep_enabled = !settings.reconcile_partitions.is_empty()
                && !settings.reconcile_interval.is_zero();
            let sweep = sweep_enabled.then(|| {
                ReconciliationSweep::spawn(coordinator.clone(), settings.reconcile_interval)
            });

            Self {
                directory,
                client,
                metrics,
                dispatcher,
                reconciliation: ReconciliationLedger::new(settings.reconcile_history),
                sweep,
                settings,
            }
        })
    }

    pub fn stats(&self) -> RepairStats {
        self.metrics.snapshot()
    }

    pub async fn read_with_repair(
        &self,
        partition_id: &str,
        version: u64,
    ) -> Result<CanonicalResult> {
        if partition_id.trim().is_empty() {
            return Err(LogError::validation("partitionId is required"));
        }
        if version == 0 {
            return Err(LogError::validation("version must be at least 1"));
        }

        let votes = self.scatter_read(partition_id, version).await;

        let Some(canonical) = select_canonical(&votes).cloned() else {
            tracing::warn!(
                "No replica answered for {}/{} ({} configured)",
                partition_id,
                version,
                self.directory.len()
            );
            return Err(LogError::NoReplicasAvailable);
        };
        let stale = stale_replicas(&votes, &canonical);

        let mut repair_dispatched = false;
        if !stale.is_empty() {
            tracing::info!(
                "{}/{}: {} stale replica(s) behind clock {} from {}",
                partition_id,
                version,
                stale.len(),
                canonical.entry.lamport_clock,
                canonical.replica
            );
            self.metrics.repairs_triggered(stale.len() as u64);

            let job = RepairJob::new(version, canonical.entry.clone(), stale.clone());
            match self.dispatcher.dispatch(job).await {
                Ok(()) => repair_dispatched = true,
                Err(e) => {
                    for _ in &stale {
                        self.metrics.repair_failed();
                    }
                    tracing::warn!("Could not queue repair for {}/{}: {}", partition_id, version, e);
                }
            }
        }

        Ok(CanonicalResult {
            entry: canonical.entry,
            source_replica: canonical.replica,
            responded: votes.into_iter().map(|vote| vote.replica).collect(),
            stale_replicas: stale,
            repair_dispatched,
        })
    }

    /// Reads from every replica at once and keeps the answers that arrived in time.
    async fn scatter_read(&self, partition_id: &str, version: u64) -> Vec<ReplicaVote> {
        let timeout = self.settings.read_timeout;
        let reads = self.directory.replicas().iter().map(|replica| async move {
            let outcome =
                tokio::time::timeout(timeout, self.client.read(replica, partition_id, version))
                    .await
                    .unwrap_or_else(|_| {
                        Err(LogError::unavailable(
                            replica.as_str(),
                            format!("timed out after {:?}", timeout),
                        ))
                    })
                    .and_then(|entry| checksum::verify(&entry).map(|_| entry));
            (replica, outcome)
        });

        let mut votes = Vec::new();
        for (replica, outcome) in futures::future::join_all(reads).await {
            match outcome {
                Ok(entry) => votes.push(ReplicaVote {
                    replica: replica.clone(),
                    entry,
                }),
                Err(e) if e.is_not_found() => {
                    tracing::debug!("{} has no {}/{}", replica, partition_id, version);
                }
                Err(e) => {
                    tracing::warn!("Excluding {} from {}/{}: {}", replica, partition_id, version, e);
                }
            }
        }
        votes
    }

    /// Diffs the Merkle trees of two directory entries (by index) for one partition.
    pub async fn compare_replicas(
        &self,
        partition_id: &str,
        left: usize,
        right: usize,
    ) -> Result<MerkleComparison> {
        if partition_id.trim().is_empty() {
            return Err(LogError::validation("partitionId is required"));
        }
        let left_replica = self.replica_at(left)?;
        let right_replica = self.replica_at(right)?;
        self.compare_pair(partition_id, left_replica, right_replica).await
    }

    async fn compare_pair(
        &self,
        partition_id: &str,
        left_replica: &ReplicaAddress,
        right_replica: &ReplicaAddress,
    ) -> Result<MerkleComparison> {
        let (left_entries, right_entries) = tokio::join!(
            self.fetch_range(left_replica, partition_id),
            self.fetch_range(right_replica, partition_id)
        );

        let segment_size = self.settings.merkle_segment_size;
        let left_tree = MerkleTree::build(partition_id, &left_entries?, segment_size);
        let right_tree = MerkleTree::build(partition_id, &right_entries?, segment_size);
        let inconsistent_segments = left_tree.diff(&right_tree);

        tracing::info!(
            "Merkle compare {} between {} and {}: {} inconsistent segment(s)",
            partition_id,
            left_replica,
            right_replica,
            inconsistent_segments.len()
        );

        Ok(MerkleComparison {
            partition_id: partition_id.to_string(),
            left: left_replica.clone(),
            right: right_replica.clone(),
            left_root: left_tree.root_hash().to_string(),
            right_root: right_tree.root_hash().to_string(),
            inconsistent_segments,
        })
    }

    /// Probes every replica's health endpoint concurrently.
    pub async fn replica_status(&self) -> Vec<ReplicaStatus> {
        let timeout = self.settings.read_timeout;
        let probes = self.directory.replicas().iter().map(|replica| async move {
            let probe = tokio::time::timeout(timeout, self.client.health(replica)).await;
            match probe {
                Ok(Ok(health)) => ReplicaStatus {
                    replica: replica.clone(),
                    node_id: Some(health.node_id),
                    status: health.status,
                },
                failed => {
                    if let Ok(Err(e)) = failed {
                        tracing::debug!("Health probe of {} failed: {}", replica, e);
                    }
                    ReplicaStatus {
                        replica: replica.clone(),
                        node_id: None,
                        status: "DOWN".to_string(),
                    }
                }
            }
        });
        futures::future::join_all(probes).await
    }

    pub fn health_status(&self) -> &'static str {
        STATUS_UP
    }

    /// One reconciliation pass: schedule every replica pair of every configured
    /// partition, then run a batch of pending comparisons.
    pub async fn reconcile(&self) -> ReconciliationStats {
        self.schedule_reconciliation().await;
        self.process_reconciliation_jobs().await;
        self.reconciliation.stats()
    }

    /// Returns how many new jobs were queued.
    pub async fn schedule_reconciliation(&self) -> usize {
        let replicas = self.directory.replicas();
        let mut scheduled = 0;
        for partition_id in &self.settings.reconcile_partitions {
            for (i, left) in replicas.iter().enumerate() {
                for right in &replicas[i + 1..] {
                    if self.reconciliation.schedule(partition_id, left, right).await {
                        scheduled += 1;
                    }
                }
            }
        }
        if scheduled > 0 {
            tracing::info!("Scheduled {} reconciliation job(s)", scheduled);
        }
        scheduled
    }

    /// Runs up to `reconcile_batch` pending jobs concurrently. Returns how many ran.
    pub async fn process_reconciliation_jobs(&self) -> usize {
        let jobs = self.reconciliation.claim(self.settings.reconcile_batch).await;
        let runs = jobs.iter().map(|job| async move {
            let outcome = self
                .compare_pair(&job.partition_id, &job.left, &job.right)
                .await;
            (job, outcome)
        });

        let results = futures::future::join_all(runs).await;
        let ran = results.len();
        for (job, outcome) in results {
            let outcome = match outcome {
                Ok(comparison) => {
                    if !comparison.is_consistent() {
                        tracing::warn!(
                            "Reconciliation {}: {} and {} diverge on {} segment(s) of {}",
                            job.id,
                            job.left,
                            job.right,
                            comparison.inconsistent_segments.len(),
                            job.partition_id
                        );
                    }
                    Ok(comparison.inconsistent_segments.len())
                }
                Err(e) => {
                    tracing::warn!("Reconciliation {} failed: {}", job.id, e);
                    Err(e.to_string())
                }
            };
            self.reconciliation.finish(&job.id, outcome).await;
        }
        ran
    }

    pub fn reconciliation_stats(&self) -> ReconciliationStats {
        self.reconciliation.stats()
    }

    pub async fn reconciliation_jobs(&self) -> Vec<ReconciliationJob> {
        self.reconciliation.jobs().await
    }

    /// Stops the reconciliation sweep, then stops accepting repairs and waits for
    /// queued ones to finish.
    pub async fn shutdown(&self) {
        if let Some(sweep) = &self.sweep {
            sweep.stop().await;
        }
        self.dispatcher.shutdown().await;
    }

    fn replica_at(&self, index: usize) -> Result<&ReplicaAddress> {
        self.directory.get(index).ok_or_else(|| {
            LogError::validation(format!(
                "replica index {} out of range (directory has {})",
                index,
                self.directory.len()
            ))
        })
    }

    async fn fetch_range(
        &self,
        replica: &ReplicaAddress,
        partition_id: &str,
    ) -> Result<Vec<LogEntry>> {
        let timeout = self.settings.read_timeout;
        tokio::time::timeout(
            timeout,
            self.client
                .read_range(replica, partition_id, 1, self.settings.merkle_range_limit),
        )
        .await
        .unwrap_or_else(|_| {
            Err(LogError::unavailable(
                replica.as_str(),
                format!("timed out after {:?}", timeout),
            ))
        })
    }
}

/// Highest Lamport clock wins; ties go to the smallest `node_id`, then the smallest
/// replica address.
pub fn select_canonical(votes: &[ReplicaVote]) -> Option<&ReplicaVote> {
    votes.iter().min_by(|a, b| {
        b.entry
            .lamport_clock
            .cmp(&a.entry.lamport_clock)
            .then_with(|| a.entry.node_id.cmp(&b.entry.node_id))
            .then_with(|| a.replica.cmp(&b.replica))
    })
}

/// Replicas whose clock is strictly below the canonical one.
pub fn stale_replicas(votes: &[ReplicaVote], canonical: &ReplicaVote) -> Vec<ReplicaAddress> {
    votes
        .iter()
        .filter(|vote| vote.entry.lamport_clock < canonical.entry.lamport_clock)
        .map(|vote| vote.replica.clone())
        .collect()
}
