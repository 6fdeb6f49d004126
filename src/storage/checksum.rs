//! Integrity digests for log messages.

use sha2::{Digest, Sha256};

use super::types::LogEntry;
use crate::error::{LogError, Result};

/// Lowercase hex SHA-256 of the UTF-8 bytes of `message`.
pub fn compute(message: &str) -> String {
    hex::encode(Sha256::digest(message.as_bytes()))
}

/// Recomputes the digest of `entry.message` and compares it with the stored one.
pub fn verify(entry: &LogEntry) -> Result<()> {
    let actual = compute(&entry.message);
    if actual != entry.checksum {
        return Err(LogError::Integrity {
            partition_id: entry.partition_id.clone(),
            version: entry.version,
            expected: entry.checksum.clone(),
            actual,
        });
    }
    Ok(())
}
