use replicated_log::config::{CoordinatorConfig, NodeConfig};
use replicated_log::repair::client::HttpReplicaClient;
use replicated_log::repair::coordinator::ReadRepairCoordinator;
use replicated_log::repair::handlers as repair_handlers;
use replicated_log::repair::metrics::RepairCounters;
use replicated_log::storage::backend::MemoryBackend;
use replicated_log::storage::handlers as storage_handlers;
use replicated_log::storage::node::StorageNode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let env = |var: &str| std::env::var(var).ok();

    match args.get(1).map(String::as_str) {
        Some("node") => run_node(NodeConfig::from_args(&args[2..], env)?).await,
        Some("coordinator") => run_coordinator(CoordinatorConfig::from_args(&args[2..], env)?).await,
        _ => {
            eprintln!("Usage: {} <node|coordinator> [--flag value ...]", args[0]);
            eprintln!(
                "Example: {} node --bind 127.0.0.1:8081 --node-id node1",
                args[0]
            );
            eprintln!(
                "Example: {} coordinator --bind 127.0.0.1:8080 --replicas http://127.0.0.1:8081,http://127.0.0.1:8082",
                args[0]
            );
            std::process::exit(1);
        }
    }
}

async fn run_node(config: NodeConfig) -> anyhow::Result<()> {
    let node = StorageNode::new(config.node_id.clone(), Arc::new(MemoryBackend::new()))?;
    let app = storage_handlers::router(node);

    tracing::info!("Storage node {} listening on {}", config.node_id, config.bind);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Storage node {} stopped", config.node_id);
    Ok(())
}

async fn run_coordinator(config: CoordinatorConfig) -> anyhow::Result<()> {
    if config.replicas.is_empty() {
        tracing::warn!("No replicas configured; every read will fail");
    }
    for replica in config.replicas.replicas() {
        tracing::info!("  - replica {}", replica);
    }
    if !config.settings.reconcile_partitions.is_empty() {
        tracing::info!(
            "Reconciling partitions {:?} every {:?}",
            config.settings.reconcile_partitions,
            config.settings.reconcile_interval
        );
    }

    // Scatter reads and repair writes apply their own, tighter budgets on top.
    let request_timeout = config
        .settings
        .read_timeout
        .max(config.settings.repair_timeout);
    let client = Arc::new(HttpReplicaClient::new(request_timeout));
    let coordinator = ReadRepairCoordinator::new(
        config.replicas.clone(),
        client,
        Arc::new(RepairCounters::new()),
        config.settings.clone(),
    );
    let app = repair_handlers::router(coordinator.clone());

    tracing::info!("Coordinator listening on {}", config.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    coordinator.shutdown().await;
    let stats = coordinator.stats();
    let reconciliation = coordinator.reconciliation_stats();
    tracing::info!(
        "Coordinator stopped: repairs triggered={} completed={} failed={} in_flight={}, reconciliations scheduled={} completed={} failed={}",
        stats.triggered,
        stats.completed,
        stats.failed,
        stats.in_flight(),
        reconciliation.scheduled,
        reconciliation.completed,
        reconciliation.failed
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
