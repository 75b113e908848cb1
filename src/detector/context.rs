//! Node-Wide Detection Context
//!
//! Shared state between the polling loop and the HTTP surface: the layout the
//! node operates under, the heartbeat counter, and the latest aggregated
//! cluster snapshot. Probing peers are answered out of this context.

use std::sync::Arc;
use tokio::sync::RwLock;

use super::types::HeartbeatCounter;
use crate::cluster_state::types::{ClusterState, Epoch, NodeState};

pub struct ClusterStateContext {
    local_endpoint: String,
    layout_epoch: Epoch,
    heartbeat_counter: Arc<HeartbeatCounter>,
    last_cluster_state: RwLock<Option<ClusterState>>,
}

impl ClusterStateContext {
    pub fn new(
        local_endpoint: &str,
        layout_epoch: Epoch,
        heartbeat_counter: Arc<HeartbeatCounter>,
    ) -> Self {
        ClusterStateContext {
            local_endpoint: local_endpoint.to_string(),
            layout_epoch,
            heartbeat_counter,
            last_cluster_state: RwLock::new(None),
        }
    }

    pub fn local_endpoint(&self) -> &str {
        &self.local_endpoint
    }

    pub fn epoch(&self) -> Epoch {
        self.layout_epoch
    }

    pub fn heartbeat_counter(&self) -> Arc<HeartbeatCounter> {
        self.heartbeat_counter.clone()
    }

    /// Replaces the served snapshot with the latest aggregated round result.
    pub async fn refresh(&self, cluster_state: ClusterState) {
        *self.last_cluster_state.write().await = Some(cluster_state);
    }

    pub async fn last_cluster_state(&self) -> Option<ClusterState> {
        self.last_cluster_state.read().await.clone()
    }

    /// Answers a node-state probe stamped with `requested_epoch`.
    ///
    /// A mismatched epoch is rejected with the local epoch so the caller can
    /// record the divergence. Before the first completed round the node
    /// reports itself as not ready rather than guessing.
    pub async fn node_state_for(&self, requested_epoch: Epoch) -> Result<NodeState, Epoch> {
        if requested_epoch != self.layout_epoch {
            return Err(self.layout_epoch);
        }

        let guard = self.last_cluster_state.read().await;
        let local_state = guard
            .as_ref()
            .and_then(|state| state.node(&self.local_endpoint).cloned());

        Ok(local_state.unwrap_or_else(|| {
            NodeState::not_ready(
                &self.local_endpoint,
                self.layout_epoch,
                self.heartbeat_counter.current(),
            )
        }))
    }
}
