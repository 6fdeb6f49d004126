//! Error Taxonomy
//!
//! Every failure the storage node and the read-repair coordinator can report.
//!
//! ## Propagation
//! - **Synchronous**: `Validation`, `NotFound`, `Integrity`, `Io` and
//!   `NoReplicasAvailable` reach the caller that issued the operation.
//! - **Absorbed**: `Unavailable` and `RepairDispatch` are produced internally by the
//!   coordinator, logged and counted, and never returned from `read_with_repair`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    /// A required field was missing or empty. Raised before any state changes.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// The requested `(partition, version)` is absent on this node.
    #[error("entry not found: partition={partition_id} version={version}")]
    NotFound { partition_id: String, version: u64 },

    /// The partition has no entries at all.
    #[error("partition {partition_id} is empty")]
    PartitionEmpty { partition_id: String },

    /// Stored checksum does not match the stored message.
    #[error(
        "checksum mismatch for partition={partition_id} version={version}: expected {expected}, computed {actual}"
    )]
    Integrity {
        partition_id: String,
        version: u64,
        expected: String,
        actual: String,
    },

    /// A replica could not be reached or did not answer in time.
    #[error("replica {replica} unavailable: {reason}")]
    Unavailable { replica: String, reason: String },

    /// Not a single replica answered a scatter read.
    #[error("No replicas available")]
    NoReplicasAvailable,

    /// A background repair write failed.
    #[error("repair write to {replica} failed: {reason}")]
    RepairDispatch { replica: String, reason: String },

    /// The persistence layer rejected an operation.
    #[error("io failure: {message}")]
    Io { message: String },
}

impl LogError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn unavailable(replica: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unavailable {
            replica: replica.into(),
            reason: reason.to_string(),
        }
    }

    /// True for the "this replica simply has nothing" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::PartitionEmpty { .. })
    }
}

pub type Result<T> = std::result::Result<T, LogError>;
