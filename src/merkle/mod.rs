//! Merkle Comparison Module
//!
//! Summarises a partition's log as a hash tree over fixed-size version segments so
//! two replicas can be compared without shipping every entry side by side.
//! Equal subtrees are skipped; differing leaves are reported as
//! `InconsistentSegment`s naming the version range that needs attention.

pub mod tree;
