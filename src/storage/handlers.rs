use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;

use super::node::StorageNode;
use super::protocol::*;
use crate::error::LogError;

/// Routes of the storage node's HTTP contract.
pub fn router(node: Arc<StorageNode>) -> Router {
    Router::new()
        .route(ENDPOINT_WRITE, post(handle_write))
        .route(
            &format!("{}/:partition_id/:version", ENDPOINT_READ),
            get(handle_read),
        )
        .route(
            &format!("{}/:partition_id", ENDPOINT_READ_LATEST),
            get(handle_read_latest),
        )
        .route(
            &format!("{}/:partition_id", ENDPOINT_READ_RANGE),
            get(handle_read_range),
        )
        .route(ENDPOINT_HEALTH, get(handle_health))
        .layer(Extension(node))
}

pub fn error_response(err: &LogError) -> Response {
    let status = match err {
        LogError::Validation { .. } => StatusCode::BAD_REQUEST,
        LogError::NotFound { .. } | LogError::PartitionEmpty { .. } => StatusCode::NOT_FOUND,
        LogError::Integrity { .. } => StatusCode::CONFLICT,
        LogError::Unavailable { .. } => StatusCode::BAD_GATEWAY,
        LogError::NoReplicasAvailable => StatusCode::SERVICE_UNAVAILABLE,
        LogError::RepairDispatch { .. } | LogError::Io { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::new(err))).into_response()
}

pub async fn handle_write(
    Extension(node): Extension<Arc<StorageNode>>,
    Json(req): Json<WriteRequest>,
) -> Response {
    match node
        .write(&req.partition_id, &req.message, req.lamport_clock)
        .await
    {
        Ok(entry) => (
            StatusCode::OK,
            Json(WriteResponse {
                status: STATUS_SUCCESS.to_string(),
                version: entry.version,
                lamport_clock: entry.lamport_clock,
                node_id: entry.node_id,
                checksum: entry.checksum,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to write to partition {}: {}", req.partition_id, e);
            error_response(&e)
        }
    }
}

pub async fn handle_read(
    Extension(node): Extension<Arc<StorageNode>>,
    Path((partition_id, version)): Path<(String, u64)>,
) -> Response {
    match node.read(&partition_id, version) {
        Ok(entry) => (StatusCode::OK, Json(entry)).into_response(),
        Err(e) => {
            if !e.is_not_found() {
                tracing::error!("Failed to read {}/{}: {}", partition_id, version, e);
            }
            error_response(&e)
        }
    }
}

pub async fn handle_read_latest(
    Extension(node): Extension<Arc<StorageNode>>,
    Path(partition_id): Path<String>,
) -> Response {
    match node.read_latest(&partition_id) {
        Ok(entry) => (StatusCode::OK, Json(entry)).into_response(),
        Err(e) => {
            if !e.is_not_found() {
                tracing::error!("Failed to read latest of {}: {}", partition_id, e);
            }
            error_response(&e)
        }
    }
}

pub async fn handle_read_range(
    Extension(node): Extension<Arc<StorageNode>>,
    Path(partition_id): Path<String>,
    Query(params): Query<RangeParams>,
) -> Response {
    match node.read_range(&partition_id, params.start_version, params.end_version) {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => {
            tracing::error!("Failed to read range of {}: {}", partition_id, e);
            error_response(&e)
        }
    }
}

pub async fn handle_health(Extension(node): Extension<Arc<StorageNode>>) -> Response {
    (StatusCode::OK, Json(node.health())).into_response()
}
