use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Version counter of the cluster layout. Advances on every reconfiguration.
pub type Epoch = i64;

/// Sentinel for "no epoch known yet".
pub const UNKNOWN_EPOCH: Epoch = -1;

/// Result of a single directed probe between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionStatus {
    Ok,
    Failed,
}

impl ConnectionStatus {
    pub fn from_bool(connected: bool) -> Self {
        if connected {
            ConnectionStatus::Ok
        } else {
            ConnectionStatus::Failed
        }
    }
}

/// How much we know about a node's own view of the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeConnectivityType {
    /// The node exists but has no useful observation yet (not bootstrapped,
    /// no probes completed).
    NotReady,
    /// Fresh observation delivered by the node itself.
    Connected,
    /// Our probe to the node failed; we have no remote observation.
    Unavailable,
}

/// One row of the cluster adjacency matrix: the connection status from
/// `endpoint` to every node in its view, stamped with the epoch the
/// observation was made at.
///
/// A `Connected` row carries an entry for every endpoint in the node's view
/// (itself included). `Unavailable` and `NotReady` rows are empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConnectivity {
    pub endpoint: String,
    pub node_type: NodeConnectivityType,
    pub connectivity: BTreeMap<String, ConnectionStatus>,
    pub epoch: Epoch,
}

/// Raised by connectivity queries that cannot be answered from the stored row.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectivityError {
    #[error("connectivity queried on unavailable node {endpoint}")]
    InvalidConfiguration { endpoint: String },
    #[error("peer {peer} not present in the connectivity view of {endpoint}")]
    PeerNotFound { peer: String, endpoint: String },
}

impl NodeConnectivity {
    /// Row for a node that delivered a fresh observation at `epoch`.
    pub fn connected(
        endpoint: &str,
        epoch: Epoch,
        connectivity: BTreeMap<String, ConnectionStatus>,
    ) -> Self {
        NodeConnectivity {
            endpoint: endpoint.to_string(),
            node_type: NodeConnectivityType::Connected,
            connectivity,
            epoch,
        }
    }

    /// Row for a node our probe could not reach.
    pub fn unavailable(endpoint: &str) -> Self {
        NodeConnectivity {
            endpoint: endpoint.to_string(),
            node_type: NodeConnectivityType::Unavailable,
            connectivity: BTreeMap::new(),
            epoch: 0,
        }
    }

    /// Row for a node that has nothing to report yet.
    pub fn not_ready(endpoint: &str) -> Self {
        NodeConnectivity {
            endpoint: endpoint.to_string(),
            node_type: NodeConnectivityType::NotReady,
            connectivity: BTreeMap::new(),
            epoch: 0,
        }
    }

    /// Peers this node reached successfully.
    pub fn connected_nodes(&self) -> BTreeSet<String> {
        self.connectivity
            .iter()
            .filter(|(_, status)| **status == ConnectionStatus::Ok)
            .map(|(peer, _)| peer.clone())
            .collect()
    }

    /// Peers this node failed to reach.
    pub fn failed_nodes(&self) -> BTreeSet<String> {
        self.connectivity
            .iter()
            .filter(|(_, status)| **status == ConnectionStatus::Failed)
            .map(|(peer, _)| peer.clone())
            .collect()
    }

    /// Status of the link from this node to `peer`.
    pub fn connection_status(&self, peer: &str) -> Result<ConnectionStatus, ConnectivityError> {
        if self.node_type == NodeConnectivityType::Unavailable {
            return Err(ConnectivityError::InvalidConfiguration {
                endpoint: self.endpoint.clone(),
            });
        }

        self.connectivity
            .get(peer)
            .copied()
            .ok_or_else(|| ConnectivityError::PeerNotFound {
                peer: peer.to_string(),
                endpoint: self.endpoint.clone(),
            })
    }

    /// Graph degree: number of `Ok` links out of this node. Self counts like
    /// any other peer; a connected row carries its own `Ok` entry.
    pub fn degree(&self) -> usize {
        self.connectivity
            .values()
            .filter(|status| **status == ConnectionStatus::Ok)
            .count()
    }
}

impl PartialOrd for NodeConnectivity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeConnectivity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.endpoint.cmp(&other.endpoint)
    }
}

/// Health of the sequencer running on a node (if any).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SequencerStatus {
    Ready,
    NotReady,
    #[default]
    Unknown,
}

/// Sequencer health shipped along with every node state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequencerMetrics {
    pub sequencer_status: SequencerStatus,
}

impl SequencerMetrics {
    pub fn ready() -> Self {
        SequencerMetrics {
            sequencer_status: SequencerStatus::Ready,
        }
    }

    pub fn unknown() -> Self {
        SequencerMetrics::default()
    }
}

/// Monotone freshness stamp emitted with every node state. The counter is a
/// per-emitter heartbeat used as an aggregation tiebreaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatTimestamp {
    pub epoch: Epoch,
    pub counter: i64,
}

/// Everything one node reports about itself: its connectivity row, its
/// sequencer health and a heartbeat stamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeState {
    pub connectivity: NodeConnectivity,
    pub sequencer_metrics: SequencerMetrics,
    pub heartbeat: HeartbeatTimestamp,
}

impl NodeState {
    pub fn endpoint(&self) -> &str {
        &self.connectivity.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.connectivity.node_type == NodeConnectivityType::Connected
    }

    /// Placeholder state for a node we could not reach. Sequencer metrics are
    /// unknown and the heartbeat carries the unknown-epoch sentinel.
    pub fn unavailable(endpoint: &str) -> Self {
        NodeState {
            connectivity: NodeConnectivity::unavailable(endpoint),
            sequencer_metrics: SequencerMetrics::unknown(),
            heartbeat: HeartbeatTimestamp {
                epoch: UNKNOWN_EPOCH,
                counter: -1,
            },
        }
    }

    /// State reported by a node that is up but has not completed a polling
    /// round yet.
    pub fn not_ready(endpoint: &str, epoch: Epoch, counter: i64) -> Self {
        NodeState {
            connectivity: NodeConnectivity::not_ready(endpoint),
            sequencer_metrics: SequencerMetrics::unknown(),
            heartbeat: HeartbeatTimestamp { epoch, counter },
        }
    }
}

/// One node's snapshot of the whole cluster: the latest `NodeState` it holds
/// for every member, keyed by endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterState {
    pub local_endpoint: String,
    pub nodes: BTreeMap<String, NodeState>,
}

impl ClusterState {
    pub fn new(local_endpoint: &str, nodes: BTreeMap<String, NodeState>) -> Self {
        ClusterState {
            local_endpoint: local_endpoint.to_string(),
            nodes,
        }
    }

    /// Builds a snapshot from individual states, keying each by its endpoint.
    pub fn from_states(local_endpoint: &str, states: impl IntoIterator<Item = NodeState>) -> Self {
        let nodes = states
            .into_iter()
            .map(|state| (state.endpoint().to_string(), state))
            .collect();
        ClusterState::new(local_endpoint, nodes)
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, endpoint: &str) -> Option<&NodeState> {
        self.nodes.get(endpoint)
    }

    /// The local node's own connectivity row, if present.
    pub fn local_node_connectivity(&self) -> Option<&NodeConnectivity> {
        self.node(&self.local_endpoint)
            .map(|state| &state.connectivity)
    }

    /// Whether this snapshot can be used to find failures: non-empty, all rows
    /// observed at the same epoch, and no row still `NotReady`.
    pub fn is_ready(&self) -> bool {
        if self.nodes.is_empty() {
            tracing::debug!("Cluster state is empty");
            return false;
        }

        if !self.check_epochs() {
            tracing::debug!("Cluster state is not epoch-consistent: {:?}", self.nodes.keys());
            return false;
        }

        // One NotReady member poisons the whole snapshot.
        self.nodes
            .values()
            .all(|state| state.connectivity.node_type != NodeConnectivityType::NotReady)
    }

    fn check_epochs(&self) -> bool {
        let mut current = UNKNOWN_EPOCH;
        for state in self.nodes.values() {
            if current == UNKNOWN_EPOCH {
                current = state.connectivity.epoch;
                continue;
            }
            if state.connectivity.epoch != current {
                return false;
            }
        }
        true
    }
}

/// Declared membership of the cluster at a given epoch. The detector consumes
/// only these three projections of the full layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    epoch: Epoch,
    all_servers: BTreeSet<String>,
    active_layout_servers: BTreeSet<String>,
}

impl Layout {
    /// Layout where every server is an active layout server.
    pub fn new(epoch: Epoch, servers: impl IntoIterator<Item = String>) -> Self {
        let all_servers: BTreeSet<String> = servers.into_iter().collect();
        Layout {
            epoch,
            active_layout_servers: all_servers.clone(),
            all_servers,
        }
    }

    pub fn with_active(mut self, active: impl IntoIterator<Item = String>) -> Self {
        self.active_layout_servers = active.into_iter().collect();
        self
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn all_servers(&self) -> &BTreeSet<String> {
        &self.all_servers
    }

    pub fn active_layout_servers(&self) -> &BTreeSet<String> {
        &self.active_layout_servers
    }
}
