//! Window Aggregation
//!
//! Fuses the ordered per-iteration snapshots of one polling round into the
//! best available observation of each endpoint.

use std::collections::{BTreeMap, BTreeSet};

use crate::cluster_state::types::{ClusterState, NodeConnectivityType, NodeState};

/// Aggregates a finite window of `ClusterState`s, oldest first.
pub struct ClusterStateAggregator {
    local_endpoint: String,
    cluster_states: Vec<ClusterState>,
}

/// Selection precedence within the window. A `Connected` observation carries
/// real information, so a newer `Unavailable` must never erase an older
/// `Connected`: a transient probe failure does not unsee a recently alive node.
fn precedence(node_type: NodeConnectivityType) -> u8 {
    match node_type {
        NodeConnectivityType::Unavailable => 0,
        NodeConnectivityType::NotReady => 1,
        NodeConnectivityType::Connected => 2,
    }
}

impl ClusterStateAggregator {
    pub fn new(local_endpoint: &str, cluster_states: Vec<ClusterState>) -> Self {
        ClusterStateAggregator {
            local_endpoint: local_endpoint.to_string(),
            cluster_states,
        }
    }

    /// Per endpoint: the latest `Connected` observation wins; failing that the
    /// latest `NotReady`; failing that the latest observation of any kind.
    /// Epochs are left as observed; inconsistency surfaces via `is_ready()`.
    pub fn aggregated_state(&self) -> ClusterState {
        let endpoints: BTreeSet<&String> = self
            .cluster_states
            .iter()
            .flat_map(|state| state.nodes.keys())
            .collect();

        let mut nodes: BTreeMap<String, NodeState> = BTreeMap::new();
        for endpoint in endpoints {
            if let Some(best) = self.select(endpoint) {
                nodes.insert(endpoint.clone(), best.clone());
            }
        }

        ClusterState::new(&self.local_endpoint, nodes)
    }

    fn select(&self, endpoint: &str) -> Option<&NodeState> {
        let mut best: Option<&NodeState> = None;

        // Oldest to newest: a later observation replaces an earlier one of the
        // same or lower precedence, never a higher one.
        for state in &self.cluster_states {
            let Some(observation) = state.node(endpoint) else {
                continue;
            };

            let replace = match best {
                None => true,
                Some(current) => {
                    precedence(observation.connectivity.node_type)
                        >= precedence(current.connectivity.node_type)
                }
            };

            if replace {
                best = Some(observation);
            }
        }

        best
    }
}
