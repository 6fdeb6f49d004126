//! Background Repair Dispatcher
//!
//! Repair writes never run on the read path. The coordinator hands a `RepairJob`
//! to this dispatcher and returns immediately; a small pool of workers drains the
//! queue and pushes the canonical value to every stale replica.
//!
//! ## Responsibilities
//! - **Decoupling**: the caller's timeout budget never covers repair writes.
//! - **Accounting**: one `completed` or `failed` tick per target replica.
//! - **Shutdown**: `shutdown()` stops accepting jobs, drains the queue and waits
//!   for every worker to exit.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use super::client::ReplicaClient;
use super::metrics::RepairMetrics;
use crate::directory::types::ReplicaAddress;
use crate::error::{LogError, Result};
use crate::storage::protocol::WriteRequest;
use crate::storage::types::LogEntry;

/// Push `canonical` to every replica in `targets`.
#[derive(Debug, Clone)]
pub struct RepairJob {
    pub id: String,
    /// Version the triggering read asked for. Repair writes append a new version.
    pub read_version: u64,
    pub canonical: LogEntry,
    pub targets: Vec<ReplicaAddress>,
}

impl RepairJob {
    pub fn new(read_version: u64, canonical: LogEntry, targets: Vec<ReplicaAddress>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            read_version,
            canonical,
            targets,
        }
    }

    fn write_request(&self) -> WriteRequest {
        WriteRequest {
            partition_id: self.canonical.partition_id.clone(),
            message: self.canonical.message.clone(),
            lamport_clock: Some(self.canonical.lamport_clock),
        }
    }
}

pub struct RepairDispatcher {
    sender: Mutex<Option<mpsc::UnboundedSender<RepairJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl RepairDispatcher {
    /// Spawns `worker_count` workers (at least one) and returns immediately.
    pub fn start(
        client: Arc<dyn ReplicaClient>,
        metrics: Arc<dyn RepairMetrics>,
        worker_count: usize,
        write_timeout: Duration,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::unbounded_channel::<RepairJob>();
        let receiver = Arc::new(Mutex::new(receiver));
        let worker_count = worker_count.max(1);

        let workers = (0..worker_count)
            .map(|worker_id| {
                let receiver = receiver.clone();
                let client = client.clone();
                let metrics = metrics.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, receiver, client, metrics, write_timeout).await;
                })
            })
            .collect();

        tracing::info!("Repair dispatcher started with {} workers", worker_count);

        Arc::new(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Queues a job without waiting for it to run.
    pub async fn dispatch(&self, job: RepairJob) -> Result<()> {
        let guard = self.sender.lock().await;
        let Some(sender) = guard.as_ref() else {
            return Err(LogError::RepairDispatch {
                replica: describe_targets(&job.targets),
                reason: "repair dispatcher is shut down".to_string(),
            });
        };

        sender.send(job).map_err(|rejected| LogError::RepairDispatch {
            replica: describe_targets(&rejected.0.targets),
            reason: "repair queue closed".to_string(),
        })
    }

    /// Closes the queue, lets workers finish what is already queued and joins them.
    pub async fn shutdown(&self) {
        self.sender.lock().await.take();

        let workers = std::mem::take(&mut *self.workers.lock().await);
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::warn!("Repair worker exited abnormally: {}", e);
            }
        }
        tracing::info!("Repair dispatcher stopped");
    }
}

fn describe_targets(targets: &[ReplicaAddress]) -> String {
    targets
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<RepairJob>>>,
    client: Arc<dyn ReplicaClient>,
    metrics: Arc<dyn RepairMetrics>,
    write_timeout: Duration,
) {
    tracing::debug!("Repair worker {} started", worker_id);

    loop {
        // Hold the receiver only while waiting, never while repairing.
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        run_job(worker_id, &job, client.as_ref(), metrics.as_ref(), write_timeout).await;
    }

    tracing::debug!("Repair worker {} stopped", worker_id);
}

async fn run_job(
    worker_id: usize,
    job: &RepairJob,
    client: &dyn ReplicaClient,
    metrics: &dyn RepairMetrics,
    write_timeout: Duration,
) {
    let request = job.write_request();

    let writes = job.targets.iter().map(|target| {
        let request = &request;
        async move {
            let outcome = match tokio::time::timeout(write_timeout, client.write(target, request))
                .await
            {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(e)) => Err(LogError::RepairDispatch {
                    replica: target.to_string(),
                    reason: e.to_string(),
                }),
                Err(_) => Err(LogError::RepairDispatch {
                    replica: target.to_string(),
                    reason: format!("timed out after {:?}", write_timeout),
                }),
            };
            (target, outcome)
        }
    });

    for (target, outcome) in futures::future::join_all(writes).await {
        match outcome {
            Ok(response) => {
                metrics.repair_completed();
                tracing::info!(
                    "Repair {} (worker {}): {} now holds {}/{} clock={} (read version {})",
                    job.id,
                    worker_id,
                    target,
                    request.partition_id,
                    response.version,
                    response.lamport_clock,
                    job.read_version
                );
            }
            Err(e) => {
                metrics.repair_failed();
                tracing::warn!("Repair {} (worker {}): {}", job.id, worker_id, e);
            }
        }
    }
}
