use serde::{Deserialize, Serialize};

/// A single immutable record of a partition's log.
///
/// `version` and `lamport_clock` are assigned by the node that accepted the write,
/// never by the caller. `checksum` is the hex SHA-256 of `message` and is verified
/// every time the entry is read back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub partition_id: String,
    pub version: u64,
    pub lamport_clock: u64,
    pub message: String,
    /// Wall-clock capture time in milliseconds. Advisory only.
    pub timestamp: u64,
    pub node_id: String,
    pub checksum: String,
}

/// Liveness report of a storage node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeHealth {
    pub node_id: String,
    pub status: String,
    pub timestamp: u64,
}

pub const STATUS_UP: &str = "UP";

/// Current system time in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
