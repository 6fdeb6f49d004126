use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;

use super::coordinator::ReadRepairCoordinator;
use super::protocol::*;
use crate::storage::handlers::error_response;

/// Routes of the coordinator's HTTP contract.
pub fn router(coordinator: Arc<ReadRepairCoordinator>) -> Router {
    Router::new()
        .route(
            &format!("{}/:partition_id/:version", ENDPOINT_READ_WITH_REPAIR),
            get(handle_read_with_repair),
        )
        .route(ENDPOINT_REPAIR_STATS, get(handle_repair_stats))
        .route(ENDPOINT_REPLICAS, get(handle_replicas))
        .route(
            &format!("{}/:partition_id", ENDPOINT_MERKLE_COMPARE),
            get(handle_merkle_compare),
        )
        .route(ENDPOINT_RECONCILIATION_JOBS, get(handle_reconciliation_jobs))
        .route(ENDPOINT_RECONCILIATION_RUN, post(handle_reconciliation_run))
        .route(ENDPOINT_COORDINATOR_HEALTH, get(handle_health))
        .layer(Extension(coordinator))
}

pub async fn handle_read_with_repair(
    Extension(coordinator): Extension<Arc<ReadRepairCoordinator>>,
    Path((partition_id, version)): Path<(String, u64)>,
) -> Response {
    match coordinator.read_with_repair(&partition_id, version).await {
        Ok(result) => (StatusCode::OK, Json(ReadWithRepairResponse::from(result))).into_response(),
        Err(e) => {
            tracing::error!("Read-with-repair of {}/{} failed: {}", partition_id, version, e);
            error_response(&e)
        }
    }
}

pub async fn handle_repair_stats(
    Extension(coordinator): Extension<Arc<ReadRepairCoordinator>>,
) -> Response {
    (StatusCode::OK, Json(coordinator.stats())).into_response()
}

pub async fn handle_replicas(
    Extension(coordinator): Extension<Arc<ReadRepairCoordinator>>,
) -> Response {
    let replicas = coordinator.replica_status().await;
    (StatusCode::OK, Json(ReplicasResponse { replicas })).into_response()
}

pub async fn handle_merkle_compare(
    Extension(coordinator): Extension<Arc<ReadRepairCoordinator>>,
    Path(partition_id): Path<String>,
    Query(params): Query<CompareParams>,
) -> Response {
    let left = params.left.unwrap_or(0);
    let right = params.right.unwrap_or(1);

    match coordinator.compare_replicas(&partition_id, left, right).await {
        Ok(comparison) => (StatusCode::OK, Json(comparison)).into_response(),
        Err(e) => {
            tracing::error!("Merkle compare of {} failed: {}", partition_id, e);
            error_response(&e)
        }
    }
}

pub async fn handle_reconciliation_jobs(
    Extension(coordinator): Extension<Arc<ReadRepairCoordinator>>,
) -> Response {
    let response = ReconciliationResponse {
        stats: coordinator.reconciliation_stats(),
        jobs: coordinator.reconciliation_jobs().await,
    };
    (StatusCode::OK, Json(response)).into_response()
}

pub async fn handle_reconciliation_run(
    Extension(coordinator): Extension<Arc<ReadRepairCoordinator>>,
) -> Response {
    let stats = coordinator.reconcile().await;
    (StatusCode::OK, Json(stats)).into_response()
}

pub async fn handle_health(
    Extension(coordinator): Extension<Arc<ReadRepairCoordinator>>,
) -> Response {
    (
        StatusCode::OK,
        Json(CoordinatorHealth {
            status: coordinator.health_status().to_string(),
        }),
    )
        .into_response()
}
