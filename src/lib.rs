//! provgraph: Provenance Graph Consistency Checking
//!
//! A repo/branch/commit graph with branch provenance, a storage port with
//! in-memory and sled backends, and an fsck pass that verifies the graph
//! invariants and optionally repairs what it can.

pub mod cli;
pub mod config;
pub mod error;
pub mod fsck;
pub mod graph;
pub mod logging;
pub mod store;
