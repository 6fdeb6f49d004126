//! Process Configuration
//!
//! Both roles read plain `--flag value` pairs from the command line, falling back
//! to environment variables and then to defaults.
//!
//! | Setting              | Flag                  | Environment          | Default          |
//! |----------------------|-----------------------|----------------------|------------------|
//! | node bind address    | `--bind`              | `NODE_BIND`          | `127.0.0.1:8081` |
//! | node identifier      | `--node-id`           | `NODE_ID`            | random UUID      |
//! | coordinator bind     | `--bind`              | `COORDINATOR_BIND`   | `127.0.0.1:8080` |
//! | replica list         | `--replicas`          | `STORAGE_NODES`      | empty            |
//! | scatter read timeout | `--timeout-ms`        | `READ_TIMEOUT_MS`    | 2000             |
//! | repair write timeout | `--repair-timeout-ms` | `REPAIR_TIMEOUT_MS`  | 5000             |
//! | repair workers       | `--repair-workers`    | `REPAIR_WORKERS`     | 4                |
//! | Merkle segment size  | `--segment-size`      | `MERKLE_SEGMENT_SIZE`| 1000             |
//! | Merkle range limit   | `--range-limit`       | `MERKLE_RANGE_LIMIT` | 10000            |
//! | swept partitions     | `--reconcile-partitions` | `RECONCILE_PARTITIONS` | empty (no sweep) |
//! | sweep period         | `--reconcile-interval-ms` | `RECONCILE_INTERVAL_MS` | 60000       |
//! | jobs per sweep       | `--reconcile-batch`   | `RECONCILE_BATCH`    | 3                |

use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::directory::types::ReplicaDirectory;
use crate::repair::coordinator::CoordinatorSettings;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind: SocketAddr,
    pub node_id: String,
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub bind: SocketAddr,
    pub replicas: ReplicaDirectory,
    pub settings: CoordinatorSettings,
}

impl NodeConfig {
    pub fn from_args(args: &[String], env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let flags = parse_flags(args)?;
        let lookup = |flag: &str, var: &str| flags.get(flag).cloned().or_else(|| env(var));

        let bind = parse_or(lookup("--bind", "NODE_BIND"), "127.0.0.1:8081", "bind address")?;
        let node_id = lookup("--node-id", "NODE_ID")
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(Self { bind, node_id })
    }
}

impl CoordinatorConfig {
    pub fn from_args(args: &[String], env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let flags = parse_flags(args)?;
        let lookup = |flag: &str, var: &str| flags.get(flag).cloned().or_else(|| env(var));
        let defaults = CoordinatorSettings::default();

        let bind = parse_or(
            lookup("--bind", "COORDINATOR_BIND"),
            "127.0.0.1:8080",
            "bind address",
        )?;
        let replicas = ReplicaDirectory::parse(
            &lookup("--replicas", "STORAGE_NODES").unwrap_or_default(),
        )
        .context("invalid replica list")?;

        let read_timeout_ms: u64 = parse_or(
            lookup("--timeout-ms", "READ_TIMEOUT_MS"),
            &defaults.read_timeout.as_millis().to_string(),
            "read timeout",
        )?;
        let repair_timeout_ms: u64 = parse_or(
            lookup("--repair-timeout-ms", "REPAIR_TIMEOUT_MS"),
            &defaults.repair_timeout.as_millis().to_string(),
            "repair timeout",
        )?;
        let repair_workers: usize = parse_or(
            lookup("--repair-workers", "REPAIR_WORKERS"),
            &defaults.repair_workers.to_string(),
            "repair worker count",
        )?;
        let merkle_segment_size: usize = parse_or(
            lookup("--segment-size", "MERKLE_SEGMENT_SIZE"),
            &defaults.merkle_segment_size.to_string(),
            "Merkle segment size",
        )?;
        let merkle_range_limit: u64 = parse_or(
            lookup("--range-limit", "MERKLE_RANGE_LIMIT"),
            &defaults.merkle_range_limit.to_string(),
            "Merkle range limit",
        )?;

        let reconcile_partitions: Vec<String> =
            lookup("--reconcile-partitions", "RECONCILE_PARTITIONS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|partition| !partition.is_empty())
                .map(str::to_string)
                .collect();
        let reconcile_interval_ms: u64 = parse_or(
            lookup("--reconcile-interval-ms", "RECONCILE_INTERVAL_MS"),
            &defaults.reconcile_interval.as_millis().to_string(),
            "reconciliation interval",
        )?;
        let reconcile_batch: usize = parse_or(
            lookup("--reconcile-batch", "RECONCILE_BATCH"),
            &defaults.reconcile_batch.to_string(),
            "reconciliation batch size",
        )?;

        if read_timeout_ms == 0 {
            return Err(anyhow!("read timeout must be positive"));
        }
        if repair_workers == 0 {
            return Err(anyhow!("at least one repair worker is required"));
        }
        if !reconcile_partitions.is_empty() && (reconcile_interval_ms == 0 || reconcile_batch == 0)
        {
            return Err(anyhow!("reconciliation needs a positive interval and batch size"));
        }

        Ok(Self {
            bind,
            replicas,
            settings: CoordinatorSettings {
                read_timeout: Duration::from_millis(read_timeout_ms),
                repair_timeout: Duration::from_millis(repair_timeout_ms),
                repair_workers,
                merkle_segment_size,
                merkle_range_limit,
                reconcile_partitions,
                reconcile_interval: Duration::from_millis(reconcile_interval_ms),
                reconcile_batch,
                ..defaults
            },
        })
    }
}

/// Collects `--flag value` pairs. Unknown flags are kept; a flag without a value is
/// an error.
fn parse_flags(args: &[String]) -> Result<HashMap<String, String>> {
    let mut flags = HashMap::new();
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg.starts_with("--") {
            let value = args
                .get(i + 1)
                .filter(|v| !v.starts_with("--"))
                .ok_or_else(|| anyhow!("{} requires a value", arg))?;
            flags.insert(arg.clone(), value.clone());
            i += 2;
        } else {
            i += 1;
        }
    }
    Ok(flags)
}

fn parse_or<T>(value: Option<String>, default: &str, what: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let raw = value.unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("invalid {} '{}': {}", what, raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_node_config_from_flags() {
        let config =
            NodeConfig::from_args(&args(&["--bind", "0.0.0.0:9001", "--node-id", "node1"]), no_env)
                .unwrap();

        assert_eq!(config.bind, "0.0.0.0:9001".parse().unwrap());
        assert_eq!(config.node_id, "node1");
    }

    #[test]
    fn test_node_config_falls_back_to_env_then_defaults() {
        let env = |var: &str| (var == "NODE_ID").then(|| "node-from-env".to_string());
        let config = NodeConfig::from_args(&[], env).unwrap();

        assert_eq!(config.node_id, "node-from-env");
        assert_eq!(config.bind, "127.0.0.1:8081".parse().unwrap());
    }

    #[test]
    fn test_node_id_is_generated_when_missing() {
        let a = NodeConfig::from_args(&[], no_env).unwrap();
        let b = NodeConfig::from_args(&[], no_env).unwrap();
        assert!(!a.node_id.is_empty());
        assert_ne!(a.node_id, b.node_id);
    }

    #[test]
    fn test_flag_wins_over_env() {
        let env = |var: &str| (var == "NODE_ID").then(|| "env".to_string());
        let config = NodeConfig::from_args(&args(&["--node-id", "flag"]), env).unwrap();
        assert_eq!(config.node_id, "flag");
    }

    #[test]
    fn test_coordinator_config() {
        let config = CoordinatorConfig::from_args(
            &args(&[
                "--replicas",
                "http://node1:8081,http://node2:8082",
                "--timeout-ms",
                "150",
                "--repair-workers",
                "2",
            ]),
            no_env,
        )
        .unwrap();

        assert_eq!(config.replicas.len(), 2);
        assert_eq!(config.settings.read_timeout, Duration::from_millis(150));
        assert_eq!(config.settings.repair_workers, 2);
        assert_eq!(config.settings.merkle_segment_size, 1000);
        assert_eq!(config.bind, "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn test_coordinator_replicas_from_env() {
        let env = |var: &str| (var == "STORAGE_NODES").then(|| "http://a:1,http://b:2".to_string());
        let config = CoordinatorConfig::from_args(&[], env).unwrap();
        assert_eq!(config.replicas.len(), 2);
    }

    #[test]
    fn test_reconciliation_settings() {
        let config = CoordinatorConfig::from_args(
            &args(&[
                "--reconcile-partitions",
                "orders, ,payments",
                "--reconcile-interval-ms",
                "500",
            ]),
            no_env,
        )
        .unwrap();

        assert_eq!(config.settings.reconcile_partitions, vec!["orders", "payments"]);
        assert_eq!(config.settings.reconcile_interval, Duration::from_millis(500));
        assert_eq!(config.settings.reconcile_batch, 3);

        let disabled = CoordinatorConfig::from_args(&[], no_env).unwrap();
        assert!(disabled.settings.reconcile_partitions.is_empty());

        assert!(
            CoordinatorConfig::from_args(
                &args(&["--reconcile-partitions", "orders", "--reconcile-batch", "0"]),
                no_env
            )
            .is_err()
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(CoordinatorConfig::from_args(&args(&["--timeout-ms", "soon"]), no_env).is_err());
        assert!(CoordinatorConfig::from_args(&args(&["--timeout-ms", "0"]), no_env).is_err());
        assert!(CoordinatorConfig::from_args(&args(&["--replicas", "node1:8081"]), no_env).is_err());
        assert!(NodeConfig::from_args(&args(&["--bind"]), no_env).is_err());
    }
}
