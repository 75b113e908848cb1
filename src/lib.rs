//! Distributed Shared-Log Cluster Library
//!
//! This library crate defines the failure-detection core that every node of the
//! shared-log cluster runs. It serves as the foundation for the binary executable
//! (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of four loosely coupled subsystems:
//!
//! - **`wire`**: The binary wire protocol. A compact, forward-compatible encoding
//!   (big-endian integers, length-prefixed strings, enums by name) shared by every
//!   payload that crosses the network or is snapshotted onto the log.
//! - **`cluster_state`**: The connectivity model. Immutable value types describing
//!   the cluster graph: per-node connectivity rows, node states, cluster snapshots
//!   and the layout projections the detector consumes.
//! - **`detector`**: The failure-detection engine. Runs bounded polling rounds of
//!   parallel probes with adaptive per-peer timeouts, collects best-effort node
//!   states, aggregates them over a sliding window and emits `PollReport`s for the
//!   reconfiguration layer to act on.
//! - **`log_queue`**: The persisted queue. An insertion-ordered collection whose
//!   mutations are explicit state-machine operations with undo support, used here
//!   to retain recent connectivity snapshots on the log.

pub mod cluster_state;
pub mod detector;
pub mod log_queue;
pub mod wire;
