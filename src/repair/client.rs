//! Replica Client
//!
//! How the coordinator talks to storage nodes. The trait keeps the coordinator
//! independent of the transport so tests can plug in in-process replicas.

use async_trait::async_trait;
use std::time::Duration;

use crate::directory::types::ReplicaAddress;
use crate::error::{LogError, Result};
use crate::storage::protocol::{
    ENDPOINT_HEALTH, ENDPOINT_READ, ENDPOINT_READ_RANGE, ENDPOINT_WRITE, ErrorResponse,
    WriteRequest, WriteResponse,
};
use crate::storage::types::{LogEntry, NodeHealth};

#[async_trait]
pub trait ReplicaClient: Send + Sync {
    async fn read(
        &self,
        replica: &ReplicaAddress,
        partition_id: &str,
        version: u64,
    ) -> Result<LogEntry>;

    async fn write(&self, replica: &ReplicaAddress, request: &WriteRequest)
    -> Result<WriteResponse>;

    async fn read_range(
        &self,
        replica: &ReplicaAddress,
        partition_id: &str,
        start_version: u64,
        end_version: u64,
    ) -> Result<Vec<LogEntry>>;

    async fn health(&self, replica: &ReplicaAddress) -> Result<NodeHealth>;
}

/// `ReplicaClient` over the storage node's JSON/HTTP contract.
pub struct HttpReplicaClient {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpReplicaClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            timeout,
        }
    }

    /// `endpoint` under the replica's base URL, followed by `segments`, each
    /// percent-encoded as a single path segment.
    fn endpoint_url(
        replica: &ReplicaAddress,
        endpoint: &str,
        segments: &[&str],
    ) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&replica.url(endpoint))
            .map_err(|e| LogError::unavailable(replica.as_str(), e))?;
        url.path_segments_mut()
            .map_err(|_| LogError::unavailable(replica.as_str(), "address cannot carry a path"))?
            .extend(segments);
        Ok(url)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        replica: &ReplicaAddress,
        request: reqwest::RequestBuilder,
        not_found: impl FnOnce() -> LogError,
    ) -> Result<T> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| LogError::unavailable(replica.as_str(), e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(not_found());
        }
        if !status.is_success() {
            let reason = match response.json::<ErrorResponse>().await {
                Ok(body) => format!("{}: {}", status, body.message),
                Err(_) => status.to_string(),
            };
            return Err(LogError::unavailable(replica.as_str(), reason));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| LogError::unavailable(replica.as_str(), e))
    }
}

#[async_trait]
impl ReplicaClient for HttpReplicaClient {
    async fn read(
        &self,
        replica: &ReplicaAddress,
        partition_id: &str,
        version: u64,
    ) -> Result<LogEntry> {
        let version_segment = version.to_string();
        let url = Self::endpoint_url(replica, ENDPOINT_READ, &[partition_id, &version_segment])?;
        self.fetch(replica, self.http_client.get(url), || LogError::NotFound {
            partition_id: partition_id.to_string(),
            version,
        })
        .await
    }

    async fn write(
        &self,
        replica: &ReplicaAddress,
        request: &WriteRequest,
    ) -> Result<WriteResponse> {
        let url = Self::endpoint_url(replica, ENDPOINT_WRITE, &[])?;
        self.fetch(replica, self.http_client.post(url).json(request), || {
            LogError::unavailable(replica.as_str(), "write endpoint not found")
        })
        .await
    }

    async fn read_range(
        &self,
        replica: &ReplicaAddress,
        partition_id: &str,
        start_version: u64,
        end_version: u64,
    ) -> Result<Vec<LogEntry>> {
        let url = Self::endpoint_url(replica, ENDPOINT_READ_RANGE, &[partition_id])?;
        let request = self.http_client.get(url).query(&[
            ("startVersion", start_version),
            ("endVersion", end_version),
        ]);
        self.fetch(replica, request, || {
            LogError::unavailable(replica.as_str(), "range endpoint not found")
        })
        .await
    }

    async fn health(&self, replica: &ReplicaAddress) -> Result<NodeHealth> {
        let url = Self::endpoint_url(replica, ENDPOINT_HEALTH, &[])?;
        self.fetch(replica, self.http_client.get(url), || {
            LogError::unavailable(replica.as_str(), "health endpoint not found")
        })
        .await
    }
}
