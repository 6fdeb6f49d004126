use serde::{Deserialize, Serialize};

use crate::storage::checksum;
use crate::storage::types::LogEntry;

pub const DEFAULT_SEGMENT_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MerkleNode {
    /// Digest of one segment of consecutive entries.
    Leaf {
        hash: String,
        start_version: u64,
        end_version: u64,
    },
    Inner {
        hash: String,
        left: Box<MerkleNode>,
        right: Box<MerkleNode>,
    },
}

impl MerkleNode {
    pub fn hash(&self) -> &str {
        match self {
            MerkleNode::Leaf { hash, .. } | MerkleNode::Inner { hash, .. } => hash,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, MerkleNode::Leaf { .. })
    }

    /// Version range covered by this subtree.
    pub fn span(&self) -> (u64, u64) {
        match self {
            MerkleNode::Leaf {
                start_version,
                end_version,
                ..
            } => (*start_version, *end_version),
            MerkleNode::Inner { left, right, .. } => {
                let (start, _) = left.span();
                let (_, end) = right.span();
                (start, end)
            }
        }
    }

    fn parent(left: MerkleNode, right: MerkleNode) -> MerkleNode {
        let hash = checksum::compute(&format!("{}{}", left.hash(), right.hash()));
        MerkleNode::Inner {
            hash,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// A version range whose digests differ between two replicas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InconsistentSegment {
    pub partition_id: String,
    pub start_version: u64,
    pub end_version: u64,
    pub left_hash: String,
    pub right_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    pub partition_id: String,
    pub root: MerkleNode,
}

impl MerkleTree {
    /// Builds the tree bottom-up from entries sorted by version.
    ///
    /// A leaf hashes `checksum + ","` of each entry of its segment. A level with an
    /// odd number of nodes pairs its last node with itself. No entries give a single
    /// leaf over the empty string.
    pub fn build(partition_id: &str, entries: &[LogEntry], segment_size: usize) -> Self {
        let segment_size = segment_size.max(1);

        let mut level: Vec<MerkleNode> = entries
            .chunks(segment_size)
            .map(|segment| {
                let data: String = segment
                    .iter()
                    .map(|entry| format!("{},", entry.checksum))
                    .collect();
                MerkleNode::Leaf {
                    hash: checksum::compute(&data),
                    start_version: segment[0].version,
                    end_version: segment[segment.len() - 1].version,
                }
            })
            .collect();

        while level.len() > 1 {
            let mut parents = Vec::with_capacity(level.len().div_ceil(2));
            let mut nodes = level.into_iter();
            while let Some(left) = nodes.next() {
                let right = nodes.next().unwrap_or_else(|| left.clone());
                parents.push(MerkleNode::parent(left, right));
            }
            level = parents;
        }

        let root = level.pop().unwrap_or_else(|| MerkleNode::Leaf {
            hash: checksum::compute(""),
            start_version: 0,
            end_version: 0,
        });

        Self {
            partition_id: partition_id.to_string(),
            root,
        }
    }

    pub fn root_hash(&self) -> &str {
        self.root.hash()
    }

    /// Segments whose digests differ, ordered by start version.
    pub fn diff(&self, other: &MerkleTree) -> Vec<InconsistentSegment> {
        let mut segments = Vec::new();
        self.compare(&self.root, &other.root, &mut segments);

        segments.sort_by_key(|s| (s.start_version, s.end_version));
        segments.dedup_by(|a, b| {
            a.start_version == b.start_version && a.end_version == b.end_version
        });
        segments
    }

    fn compare(&self, left: &MerkleNode, right: &MerkleNode, out: &mut Vec<InconsistentSegment>) {
        if left.hash() == right.hash() {
            return;
        }

        match (left, right) {
            (
                MerkleNode::Inner {
                    left: left_a,
                    right: right_a,
                    ..
                },
                MerkleNode::Inner {
                    left: left_b,
                    right: right_b,
                    ..
                },
            ) => {
                self.compare(left_a, left_b, out);
                self.compare(right_a, right_b, out);
            }
            _ => {
                // Leaf against leaf, or trees of different shape: report the union.
                let (start_a, end_a) = left.span();
                let (start_b, end_b) = right.span();
                out.push(InconsistentSegment {
                    partition_id: self.partition_id.clone(),
                    start_version: start_a.min(start_b),
                    end_version: end_a.max(end_b),
                    left_hash: left.hash().to_string(),
                    right_hash: right.hash().to_string(),
                });
            }
        }
    }
}
