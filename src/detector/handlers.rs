//! Detector API Handlers
//!
//! HTTP endpoints that expose the node's failure-detection state to the
//! network. The node-state endpoint is the probe surface peers poll; the
//! stats endpoint is a human-facing health summary.

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
};
use std::sync::Arc;
use sysinfo::System;
use tokio::sync::Mutex;

use super::context::ClusterStateContext;
use super::protocol::NodeStatsResponse;
use crate::cluster_state::types::Epoch;
use crate::log_queue::queue::LogQueue;
use crate::wire::codec::{self, WireEncode};

/// Probe endpoint.
///
/// Replies with this node's wire-encoded `NodeState` when the caller's epoch
/// matches, and with `409 Conflict` carrying the local epoch when it does not.
pub async fn handle_node_state(
    Extension(context): Extension<Arc<ClusterStateContext>>,
    Path(epoch): Path<Epoch>,
) -> (StatusCode, Vec<u8>) {
    match context.node_state_for(epoch).await {
        Ok(state) => (StatusCode::OK, state.to_wire()),
        Err(server_epoch) => {
            tracing::debug!(
                "Rejecting node state request at epoch {} (local epoch {})",
                epoch,
                server_epoch
            );

            let mut body = Vec::new();
            codec::put_i64(&mut body, server_epoch);
            (StatusCode::CONFLICT, body)
        }
    }
}

/// Health summary handler.
pub async fn handle_stats(
    Extension(context): Extension<Arc<ClusterStateContext>>,
    Extension(report_log): Extension<Arc<Mutex<LogQueue<Vec<u8>>>>>,
) -> Json<NodeStatsResponse> {
    let cluster_state = context.last_cluster_state().await;

    let (cluster_ready, cluster_size, connected_nodes, failed_nodes) = match &cluster_state {
        Some(state) => {
            let local_row = state.local_node_connectivity();
            (
                state.is_ready(),
                state.size(),
                local_row
                    .map(|row| row.connected_nodes().into_iter().collect())
                    .unwrap_or_default(),
                local_row
                    .map(|row| row.failed_nodes().into_iter().collect())
                    .unwrap_or_default(),
            )
        }
        None => (false, 0, Vec::new(), Vec::new()),
    };

    let report_log_depth = report_log.lock().await.size();

    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    let cpu_usage = sys.global_cpu_info().cpu_usage();
    // sysinfo returns bytes for memory values.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    Json(NodeStatsResponse {
        endpoint: context.local_endpoint().to_string(),
        epoch: context.epoch(),
        heartbeat_counter: context.heartbeat_counter().current(),
        cluster_ready,
        cluster_size,
        connected_nodes,
        failed_nodes,
        report_log_depth,
        cpu_usage,
        mem_used_mb,
        mem_total_mb,
    })
}
