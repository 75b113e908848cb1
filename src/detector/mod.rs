//! Failure Detector Module
//!
//! Poll-based failure detection for the shared-log cluster. One instance runs per
//! node and periodically determines, from the local viewpoint, which peers are
//! reachable, which are failed and which observe a stale epoch. Downstream
//! reconfiguration acts on the reports; this module only observes.
//!
//! ## Architecture Overview
//! A polling **round** is made of `failure_threshold` **iterations**. Each iteration:
//! 1. **Fan-out**: probe every server in the layout in parallel, each probe bounded by the
//!    current adaptive timeout (`period`).
//! 2. **Collect**: fuse the settled probe results into one `ClusterState`, synthesizing
//!    `Unavailable` entries for peers that did not deliver a usable state.
//! 3. **Adapt**: when failures were seen, stretch `period` (additively, capped) so slow but
//!    alive peers get a chance to answer in the next iteration.
//!
//! After the last iteration the per-iteration snapshots are aggregated over the window
//! ("latest connected observation wins"), `period` decays one step back toward its floor,
//! and a single `PollReport` is emitted. Peer-level errors never escape a round.
//!
//! ## Submodules
//! - **`types`**: report/config/error types and the heartbeat counter.
//! - **`client`**: the `PeerClient` probe contract and its HTTP implementation.
//! - **`collector`**: per-iteration `ClusterState` construction.
//! - **`aggregator`**: window aggregation across iterations.
//! - **`poller`**: the `FailureDetector` round state machine.
//! - **`context`**: node-wide state served to probing peers.
//! - **`protocol`** / **`handlers`**: HTTP contract and Axum endpoints.

pub mod aggregator;
pub mod client;
pub mod collector;
pub mod context;
pub mod handlers;
pub mod poller;
pub mod protocol;
pub mod types;

#[cfg(test)]
mod tests;
