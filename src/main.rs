use axum::{
    Router,
    extract::Extension,
    routing::get,
};
use distributed_log::cluster_state::types::{Layout, SequencerMetrics};
use distributed_log::detector::client::HttpRuntime;
use distributed_log::detector::context::ClusterStateContext;
use distributed_log::detector::handlers::{handle_node_state, handle_stats};
use distributed_log::detector::poller::FailureDetector;
use distributed_log::detector::protocol::{ENDPOINT_HEALTH_STATS, ENDPOINT_NODE_STATE};
use distributed_log::detector::types::{DetectorConfig, HeartbeatCounter};
use distributed_log::log_queue::queue::LogQueue;
use distributed_log::wire::codec::WireEncode;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// How many recent aggregated snapshots the node retains on the log queue.
const REPORT_LOG_WATERMARK: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} --bind <addr:port> [--peer <addr:port>]...", args[0]);
        eprintln!("Example: {} --bind 127.0.0.1:9000", args[0]);
        eprintln!(
            "Example: {} --bind 127.0.0.1:9001 --peer 127.0.0.1:9000 --peer 127.0.0.1:9002",
            args[0]
        );

        std::process::exit(1);
    }

    let mut bind_addr: Option<SocketAddr> = None;
    let mut peers: Vec<String> = vec![];

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                bind_addr = Some(args[i + 1].parse()?);
                i += 2;
            }
            "--peer" => {
                peers.push(args[i + 1].clone());
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let bind_addr = bind_addr.expect("--bind is required");
    let local_endpoint = bind_addr.to_string();

    let epoch = env_i64("FD_EPOCH", 1);
    let mut servers = peers.clone();
    servers.push(local_endpoint.clone());
    let layout = Layout::new(epoch, servers);

    tracing::info!("Starting node {} at epoch {}", local_endpoint, epoch);
    tracing::info!("Layout servers: {:?}", layout.all_servers());

    let config = detector_config_from_env();
    tracing::info!("Detector config: {:?}", config);

    // 1. Shared node context:
    let heartbeat_counter = Arc::new(HeartbeatCounter::new());
    let context = Arc::new(ClusterStateContext::new(
        &local_endpoint,
        epoch,
        heartbeat_counter.clone(),
    ));

    // 2. Report log (recent connectivity snapshots on the shared log):
    let report_log: Arc<Mutex<LogQueue<Vec<u8>>>> = Arc::new(Mutex::new(LogQueue::new()));

    // 3. HTTP Router:
    let app = Router::new()
        .route(
            &format!("{}/:epoch", ENDPOINT_NODE_STATE),
            get(handle_node_state),
        )
        .route(ENDPOINT_HEALTH_STATS, get(handle_stats))
        .layer(Extension(context.clone()))
        .layer(Extension(report_log.clone()));

    // 4. Spawn the detector loop:
    let runtime = HttpRuntime::new(config.init_period);
    let poll_loop_interval = Duration::from_millis(env_i64("FD_POLL_LOOP_INTERVAL_MS", 3_000) as u64);
    let loop_layout = layout.clone();
    let loop_context = context.clone();
    let loop_report_log = report_log.clone();

    tokio::spawn(async move {
        let mut detector =
            FailureDetector::with_config(heartbeat_counter, loop_context.local_endpoint(), config);
        let mut interval = tokio::time::interval(poll_loop_interval);

        loop {
            interval.tick().await;

            let report = match detector
                .poll(&loop_layout, &runtime, SequencerMetrics::ready())
                .await
            {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!("Poll round failed: {}", e);
                    continue;
                }
            };

            let failed = report.failed_nodes();
            if !failed.is_empty() {
                tracing::warn!("Detected failed nodes: {:?}", failed);
            }
            if !report.wrong_epochs.is_empty() {
                tracing::warn!("Detected wrong epochs: {:?}", report.wrong_epochs);
            }
            tracing::info!(
                "Poll round done: {}/{} reachable, period {:?}, cluster ready: {}",
                report.reachable_nodes().len(),
                report.cluster_state.size(),
                detector.period(),
                report.cluster_state.is_ready()
            );

            loop_context.refresh(report.cluster_state.clone()).await;

            // Retain the snapshot on the log, trimming from the head.
            let mut log = loop_report_log.lock().await;
            log.enqueue(report.cluster_state.to_wire());
            while log.size() > REPORT_LOG_WATERMARK {
                let Some(oldest) = log.entry_list(1).first().map(|record| record.id) else {
                    break;
                };
                log.remove(oldest);
            }
        }
    });

    // 5. Start HTTP server:
    tracing::info!("HTTP server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(default)
}

/// Detector tunables, overridable per node via `FD_*` environment variables
/// (all durations in milliseconds).
fn detector_config_from_env() -> DetectorConfig {
    let defaults = DetectorConfig::default();

    DetectorConfig {
        failure_threshold: env_i64(
            "FD_FAILURE_THRESHOLD",
            defaults.failure_threshold as i64,
        ) as u32,
        init_period: Duration::from_millis(env_i64(
            "FD_INIT_PERIOD_MS",
            defaults.init_period.as_millis() as i64,
        ) as u64),
        max_period: Duration::from_millis(env_i64(
            "FD_MAX_PERIOD_MS",
            defaults.max_period.as_millis() as i64,
        ) as u64),
        period_delta: Duration::from_millis(env_i64(
            "FD_PERIOD_DELTA_MS",
            defaults.period_delta.as_millis() as i64,
        ) as u64),
        initial_poll_interval: Duration::from_millis(env_i64(
            "FD_INITIAL_POLL_INTERVAL_MS",
            defaults.initial_poll_interval.as_millis() as i64,
        ) as u64),
    }
}
