use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{LogError, Result};

/// Base URL of one storage node, e.g. `http://10.0.0.7:8081`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplicaAddress(pub String);

impl ReplicaAddress {
    pub fn new(url: &str) -> Result<Self> {
        let trimmed = url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(LogError::validation("replica address must not be empty"));
        }
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(LogError::validation(format!(
                "replica address {} must start with http:// or https://",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `self` joined with an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

impl fmt::Display for ReplicaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static replica set of a partition family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicaDirectory {
    replicas: Vec<ReplicaAddress>,
}

impl ReplicaDirectory {
    pub fn new(replicas: Vec<ReplicaAddress>) -> Result<Self> {
        let mut seen = HashSet::new();
        for replica in &replicas {
            if !seen.insert(replica) {
                return Err(LogError::validation(format!(
                    "replica {} listed twice",
                    replica
                )));
            }
        }
        Ok(Self { replicas })
    }

    /// Parses a comma separated list. Blank items are skipped.
    pub fn parse(list: &str) -> Result<Self> {
        let replicas = list
            .split(',')
            .filter(|item| !item.trim().is_empty())
            .map(ReplicaAddress::new)
            .collect::<Result<Vec<_>>>()?;
        Self::new(replicas)
    }

    pub fn replicas(&self) -> &[ReplicaAddress] {
        &self.replicas
    }

    pub fn get(&self, index: usize) -> Option<&ReplicaAddress> {
        self.replicas.get(index)
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }
}
