//! Repair Counters
//!
//! `RepairMetrics` is the boundary to whatever metrics sink the deployment uses.
//! `RepairCounters` is the in-process implementation the coordinator ships with.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

pub trait RepairMetrics: Send + Sync {
    /// Called before dispatch, once per stale replica.
    fn repairs_triggered(&self, count: u64);
    fn repair_completed(&self);
    fn repair_failed(&self);
    fn snapshot(&self) -> RepairStats;
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RepairStats {
    pub triggered: u64,
    pub completed: u64,
    pub failed: u64,
}

impl RepairStats {
    /// Repairs that were triggered but have not finished either way.
    pub fn in_flight(&self) -> u64 {
        self.triggered
            .saturating_sub(self.completed)
            .saturating_sub(self.failed)
    }
}

#[derive(Debug, Default)]
pub struct RepairCounters {
    triggered: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl RepairCounters {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepairMetrics for RepairCounters {
    fn repairs_triggered(&self, count: u64) {
        self.triggered.fetch_add(count, Ordering::SeqCst);
    }

    fn repair_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn repair_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> RepairStats {
        RepairStats {
            triggered: self.triggered.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}
