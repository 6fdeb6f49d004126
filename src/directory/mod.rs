//! Replica Directory Module
//!
//! The fixed list of storage node addresses the coordinator fans reads out to.
//! There is no discovery protocol: the list comes from configuration and never
//! changes for the lifetime of the process.

pub mod types;

#[cfg(test)]
mod tests;
