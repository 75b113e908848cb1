//! Cluster Connectivity Model
//!
//! In-memory model of the cluster connectivity graph as observed by one node.
//! Every node keeps a row of the adjacency matrix (its `NodeConnectivity`),
//! exchanges it with peers as part of a `NodeState`, and assembles the rows it
//! receives into a `ClusterState` snapshot.
//!
//! ## Core Concepts
//! - **Epoch**: version counter of the cluster layout; stamped on every observation so that
//!   stale views are detectable. `-1` means "unknown".
//! - **Connectivity types**: a node is `Connected` (fresh self-reported observation),
//!   `Unavailable` (our probe to it failed), or `NotReady` (exists but has nothing to report yet).
//! - **Readiness**: a `ClusterState` is usable for failure decisions only when it is non-empty,
//!   all rows agree on the epoch and no row is `NotReady`.
//!
//! The value types here are pure data: constructors and queries, no I/O. Their wire
//! encodings live in `protocol.rs`.

pub mod protocol;
pub mod types;
