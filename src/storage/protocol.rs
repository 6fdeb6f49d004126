//! Storage Network Protocol
//!
//! API endpoints and DTOs of the storage node's HTTP contract. Field names are
//! camelCase on the wire.

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Append a message to a partition.
pub const ENDPOINT_WRITE: &str = "/api/storage/write";
/// Read one `(partition, version)`; followed by `/{partition}/{version}`.
pub const ENDPOINT_READ: &str = "/api/storage/read";
/// Read the highest version of a partition; followed by `/{partition}`.
pub const ENDPOINT_READ_LATEST: &str = "/api/storage/latest";
/// Inclusive range scan; followed by `/{partition}?startVersion=&endVersion=`.
pub const ENDPOINT_READ_RANGE: &str = "/api/storage/range";
/// Liveness probe.
pub const ENDPOINT_HEALTH: &str = "/api/storage/health";

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

// --- Data Transfer Objects ---

/// Client (or repair) write.
///
/// `lamport_clock` is only a hint: the node assigns `max(node clock, hint) + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteRequest {
    pub partition_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lamport_clock: Option<u64>,
}

/// What the node actually assigned to an accepted write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WriteResponse {
    pub status: String,
    pub version: u64,
    pub lamport_clock: u64,
    pub node_id: String,
    pub checksum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeParams {
    pub start_version: u64,
    pub end_version: u64,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl ToString) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            message: message.to_string(),
        }
    }
}
