//! Per-Iteration Cluster State Collection
//!
//! One collector is built per poll iteration from the settled probe results.
//! It never fails: every peer that did not deliver a usable `NodeState` is
//! represented as `Unavailable`, and the local node's entry is always rebuilt
//! from what this iteration actually observed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::types::{HeartbeatCounter, ProbeError};
use crate::cluster_state::types::{
    ClusterState, ConnectionStatus, Epoch, HeartbeatTimestamp, NodeConnectivity, NodeState,
    SequencerMetrics,
};

pub struct ClusterStateCollector {
    local_endpoint: String,
    poll_results: HashMap<String, Result<NodeState, ProbeError>>,
    heartbeat_counter: Arc<HeartbeatCounter>,
}

impl ClusterStateCollector {
    pub fn new(
        local_endpoint: &str,
        poll_results: HashMap<String, Result<NodeState, ProbeError>>,
        heartbeat_counter: Arc<HeartbeatCounter>,
    ) -> Self {
        ClusterStateCollector {
            local_endpoint: local_endpoint.to_string(),
            poll_results,
            heartbeat_counter,
        }
    }

    /// Builds the iteration's `ClusterState`. The result contains exactly one
    /// entry per probed endpoint.
    ///
    /// A peer's own reply is taken verbatim only when it is `Connected` and
    /// was observed at the poll epoch; anything else degrades to a synthesized
    /// `Unavailable` entry. The local endpoint never trusts a remote reply
    /// about itself: its row is rebuilt from the probe outcomes, counting a
    /// wrong-epoch response as a successful connection.
    pub fn collect_cluster_state(
        &self,
        epoch: Epoch,
        sequencer_metrics: SequencerMetrics,
    ) -> ClusterState {
        let mut nodes: BTreeMap<String, NodeState> = BTreeMap::new();

        for (endpoint, result) in &self.poll_results {
            let state = match result {
                Ok(state) if state.is_connected() && state.connectivity.epoch == epoch => {
                    state.clone()
                }
                _ => NodeState::unavailable(endpoint),
            };
            nodes.insert(endpoint.clone(), state);
        }

        nodes.insert(self.local_endpoint.clone(), self.local_node_state(epoch, sequencer_metrics));

        ClusterState::new(&self.local_endpoint, nodes)
    }

    /// Peers that responded, but at a different epoch than the poll's.
    pub fn collect_wrong_epochs(&self) -> BTreeMap<String, Epoch> {
        self.poll_results
            .iter()
            .filter_map(|(endpoint, result)| match result {
                Err(ProbeError::WrongEpoch { server_epoch }) => {
                    Some((endpoint.clone(), *server_epoch))
                }
                _ => None,
            })
            .collect()
    }

    fn local_node_state(&self, epoch: Epoch, sequencer_metrics: SequencerMetrics) -> NodeState {
        let mut matrix: BTreeMap<String, ConnectionStatus> = BTreeMap::new();

        for (endpoint, result) in &self.poll_results {
            // A wrong-epoch reply still proves the link works.
            let connected = matches!(result, Ok(_) | Err(ProbeError::WrongEpoch { .. }));
            matrix.insert(endpoint.clone(), ConnectionStatus::from_bool(connected));
        }

        let counter = self.heartbeat_counter.increment();

        NodeState {
            connectivity: NodeConnectivity::connected(&self.local_endpoint, epoch, matrix),
            sequencer_metrics,
            heartbeat: HeartbeatTimestamp { epoch, counter },
        }
    }
}
