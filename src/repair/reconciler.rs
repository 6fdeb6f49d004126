//! Periodic Anti-Entropy Reconciliation
//!
//! Read repair only heals entries somebody reads. The reconciliation sweep covers
//! the rest: on every tick the coordinator schedules one Merkle comparison per
//! replica pair and configured partition, then runs a bounded batch of the
//! pending comparisons.
//!
//! ## Job Lifecycle
//! `PENDING -> RUNNING -> COMPLETED | FAILED`
//! - A pair that already has a pending or running job for a partition is not
//!   scheduled again.
//! - Finished jobs are kept for inspection up to `retain_finished`, oldest first
//!   out.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Weak;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use super::coordinator::ReadRepairCoordinator;
use crate::directory::types::ReplicaAddress;
use crate::storage::types::now_ms;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One Merkle comparison of a partition between two replicas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationJob {
    pub id: String,
    pub partition_id: String,
    pub left: ReplicaAddress,
    pub right: ReplicaAddress,
    pub status: JobStatus,
    /// Number of inconsistent segments, once completed.
    pub inconsistencies_found: Option<usize>,
    pub error: Option<String>,
    pub scheduled_at: u64,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
}

impl ReconciliationJob {
    fn covers(&self, partition_id: &str, a: &ReplicaAddress, b: &ReplicaAddress) -> bool {
        self.partition_id == partition_id
            && ((&self.left == a && &self.right == b) || (&self.left == b && &self.right == a))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationStats {
    pub scheduled: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Job table of the reconciliation sweep, in scheduling order.
pub struct ReconciliationLedger {
    jobs: Mutex<VecDeque<ReconciliationJob>>,
    retain_finished: usize,
    scheduled: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl ReconciliationLedger {
    pub fn new(retain_finished: usize) -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
            retain_finished,
            scheduled: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Queues a comparison unless the same pair is already pending or running.
    /// Returns whether a job was added.
    pub async fn schedule(
        &self,
        partition_id: &str,
        left: &ReplicaAddress,
        right: &ReplicaAddress,
    ) -> bool {
        let mut jobs = self.jobs.lock().await;
        let duplicate = jobs
            .iter()
            .any(|job| !job.status.is_finished() && job.covers(partition_id, left, right));
        if duplicate {
            tracing::debug!(
                "Reconciliation of {} between {} and {} already queued",
                partition_id,
                left,
                right
            );
            return false;
        }

        jobs.push_back(ReconciliationJob {
            id: uuid::Uuid::new_v4().to_string(),
            partition_id: partition_id.to_string(),
            left: left.clone(),
            right: right.clone(),
            status: JobStatus::Pending,
            inconsistencies_found: None,
            error: None,
            scheduled_at: now_ms(),
            started_at: None,
            completed_at: None,
        });
        self.scheduled.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Marks up to `limit` of the oldest pending jobs as running and returns them.
    pub async fn claim(&self, limit: usize) -> Vec<ReconciliationJob> {
        let mut jobs = self.jobs.lock().await;
        let started_at = now_ms();
        jobs.iter_mut()
            .filter(|job| job.status == JobStatus::Pending)
            .take(limit)
            .map(|job| {
                job.status = JobStatus::Running;
                job.started_at = Some(started_at);
                job.clone()
            })
            .collect()
    }

    /// Records the outcome of a claimed job: the inconsistency count or an error.
    pub async fn finish(&self, job_id: &str, outcome: std::result::Result<usize, String>) {
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs.iter_mut().find(|job| job.id == job_id) else {
            tracing::warn!("Finished reconciliation job {} is not in the ledger", job_id);
            return;
        };

        job.completed_at = Some(now_ms());
        match outcome {
            Ok(found) => {
                job.status = JobStatus::Completed;
                job.inconsistencies_found = Some(found);
                self.completed.fetch_add(1, Ordering::SeqCst);
            }
            Err(reason) => {
                job.status = JobStatus::Failed;
                job.error = Some(reason);
                self.failed.fetch_add(1, Ordering::SeqCst);
            }
        }

        let finished = jobs.iter().filter(|job| job.status.is_finished()).count();
        let mut excess = finished.saturating_sub(self.retain_finished);
        jobs.retain(|job| {
            if excess > 0 && job.status.is_finished() {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }

    pub async fn jobs(&self) -> Vec<ReconciliationJob> {
        self.jobs.lock().await.iter().cloned().collect()
    }

    pub fn stats(&self) -> ReconciliationStats {
        ReconciliationStats {
            scheduled: self.scheduled.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// Background task that runs `ReadRepairCoordinator::reconcile` on a fixed period.
pub struct ReconciliationSweep {
    stop: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReconciliationSweep {
    /// The first pass runs one full `period` after spawning. The task ends on
    /// `stop()` or once the coordinator is dropped.
    pub fn spawn(coordinator: Weak<ReadRepairCoordinator>, period: Duration) -> Self {
        let (stop, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = stopped.changed() => break,
                }
                let Some(coordinator) = coordinator.upgrade() else {
                    break;
                };
                coordinator.reconcile().await;
            }
            tracing::debug!("Reconciliation sweep stopped");
        });

        tracing::info!("Reconciliation sweep every {:?}", period);
        Self {
            stop,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Stops the timer and waits for a pass in progress to finish.
    pub async fn stop(&self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.lock().await.take()
            && let Err(e) = handle.await
        {
            tracing::warn!("Reconciliation sweep exited abnormally: {}", e);
        }
    }
}
