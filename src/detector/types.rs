use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::cluster_state::types::{ClusterState, Epoch};
use crate::wire::codec::CodecError;

/// Outcome of a single probe to one peer. All variants are distinguishable so
/// the collector can treat "replied at the wrong epoch" differently from
/// "did not reply at all".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("probe timed out")]
    Timeout,
    #[error("transport fault: {0}")]
    Transport(String),
    #[error("peer responded at epoch {server_epoch}")]
    WrongEpoch { server_epoch: Epoch },
    #[error("undecodable reply: {0}")]
    Codec(#[from] CodecError),
}

/// The only error the detector itself raises. Peer-level failures are folded
/// into the report instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DetectorError {
    #[error("invalid failure detector configuration: {0}")]
    InvalidConfiguration(String),
}

/// Tunables of the polling state machine, all in effect from the next round.
/// `period` (the adaptive per-peer response timeout) always stays within
/// `[init_period, max_period]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorConfig {
    /// Iterations per polling round.
    pub failure_threshold: u32,
    /// Floor for the adaptive response timeout.
    pub init_period: Duration,
    /// Ceiling for the adaptive response timeout; failed peers are parked here.
    pub max_period: Duration,
    /// Additive step the timeout moves by.
    pub period_delta: Duration,
    /// Sleep between iterations when the cluster looks healthy.
    pub initial_poll_interval: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            failure_threshold: 3,
            init_period: Duration::from_millis(2_000),
            max_period: Duration::from_millis(5_000),
            period_delta: Duration::from_millis(1_000),
            initial_poll_interval: Duration::from_millis(1_000),
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.failure_threshold < 1 {
            return Err(DetectorError::InvalidConfiguration(
                "failure_threshold must be at least 1".to_string(),
            ));
        }
        if self.init_period > self.max_period {
            return Err(DetectorError::InvalidConfiguration(format!(
                "init_period {:?} exceeds max_period {:?}",
                self.init_period, self.max_period
            )));
        }
        Ok(())
    }
}

/// Monotone counter stamped into every locally emitted `NodeState`. Peers use
/// it as a freshness tiebreaker when aggregating observations.
#[derive(Debug, Default)]
pub struct HeartbeatCounter {
    counter: AtomicU64,
}

impl HeartbeatCounter {
    pub fn new() -> Self {
        HeartbeatCounter::default()
    }

    /// Advances the heartbeat and returns the new value.
    pub fn increment(&self) -> i64 {
        (self.counter.fetch_add(1, Ordering::Relaxed) + 1) as i64
    }

    /// Current value without advancing.
    pub fn current(&self) -> i64 {
        self.counter.load(Ordering::Relaxed) as i64
    }
}

/// Everything one polling round (or one iteration of it) learned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    /// Epoch the round was stamped with.
    pub poll_epoch: Epoch,
    /// Active layout servers at the moment the round started.
    pub responsive_servers: BTreeSet<String>,
    /// Peers that responded, but at an epoch different from `poll_epoch`.
    pub wrong_epochs: BTreeMap<String, Epoch>,
    /// Connectivity snapshot backing this report.
    pub cluster_state: ClusterState,
}

impl PollReport {
    /// Peers that delivered a usable reply at the correct epoch: the local
    /// row's `Ok` entries minus the wrong-epoch responders.
    pub fn reachable_nodes(&self) -> BTreeSet<String> {
        let connected = self
            .cluster_state
            .local_node_connectivity()
            .map(|row| row.connected_nodes())
            .unwrap_or_default();

        connected
            .into_iter()
            .filter(|endpoint| !self.wrong_epochs.contains_key(endpoint))
            .collect()
    }

    /// Peers whose probe failed outright (timeout or transport fault).
    pub fn failed_nodes(&self) -> BTreeSet<String> {
        self.cluster_state
            .local_node_connectivity()
            .map(|row| row.failed_nodes())
            .unwrap_or_default()
    }

    /// Every peer that answered at all, wrong epoch included.
    pub fn all_reachable_nodes(&self) -> BTreeSet<String> {
        let mut nodes = self.reachable_nodes();
        nodes.extend(self.wrong_epochs.keys().cloned());
        nodes
    }
}
