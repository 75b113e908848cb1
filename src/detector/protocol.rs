use serde::Serialize;

// Endpoints
pub const ENDPOINT_NODE_STATE: &str = "/internal/node_state";
pub const ENDPOINT_HEALTH_STATS: &str = "/health/stats";

/// Node health summary (public API).
#[derive(Debug, Serialize)]
pub struct NodeStatsResponse {
    pub endpoint: String,
    pub epoch: i64,
    pub heartbeat_counter: i64,
    pub cluster_ready: bool,
    pub cluster_size: usize,
    pub connected_nodes: Vec<String>,
    pub failed_nodes: Vec<String>,
    pub report_log_depth: usize,
    pub cpu_usage: f32,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
}
