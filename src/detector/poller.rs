//! Polling State Machine
//!
//! `FailureDetector` runs bounded polling rounds against every server in the
//! layout. The management loop guarantees at most one active `poll` per
//! instance, so the detector is deliberately not thread safe: the only state
//! it carries between rounds is `period`, the adaptive response timeout.
//!
//! ## Round Shape
//! ```text
//! for i in 0..failure_threshold:
//!     report[i] = poll_iteration()          // parallel fan-out + collect
//!     sleep(modify_iteration_timeouts())    // stretch period on failures
//! aggregate(reports) -> PollReport          // union sets, decay period once
//! ```

use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::aggregator::ClusterStateAggregator;
use super::client::{ClientRuntime, PeerClient};
use super::collector::ClusterStateCollector;
use super::types::{
    DetectorConfig, DetectorError, HeartbeatCounter, PollReport, ProbeError,
};
use crate::cluster_state::types::{Epoch, Layout, NodeState, SequencerMetrics};

pub struct FailureDetector {
    config: DetectorConfig,
    /// Current per-peer response timeout. Stretches while failures are being
    /// observed, decays once per round, and never leaves
    /// `[init_period, max_period]`.
    period: Duration,
    heartbeat_counter: Arc<HeartbeatCounter>,
    local_endpoint: String,
}

impl FailureDetector {
    pub fn new(heartbeat_counter: Arc<HeartbeatCounter>, local_endpoint: &str) -> Self {
        Self::with_config(heartbeat_counter, local_endpoint, DetectorConfig::default())
    }

    pub fn with_config(
        heartbeat_counter: Arc<HeartbeatCounter>,
        local_endpoint: &str,
        config: DetectorConfig,
    ) -> Self {
        FailureDetector {
            period: config.init_period,
            config,
            heartbeat_counter,
            local_endpoint: local_endpoint.to_string(),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Replaces the configuration. Meant to be called before the first round;
    /// the adaptive timeout restarts from the new floor.
    pub fn set_config(&mut self, config: DetectorConfig) {
        self.period = config.init_period;
        self.config = config;
    }

    /// Current adaptive response timeout.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Executes one polling round and reports on the whole layout.
    ///
    /// Peer-level failures (timeouts, transport faults, wrong epochs,
    /// undecodable replies) are folded into the report; the only error that
    /// escapes is a broken configuration.
    pub async fn poll(
        &mut self,
        layout: &Layout,
        runtime: &dyn ClientRuntime,
        sequencer_metrics: SequencerMetrics,
    ) -> Result<PollReport, DetectorError> {
        self.config.validate()?;

        tracing::trace!("Poll round starting at epoch {}", layout.epoch());

        let mut clients: HashMap<String, Arc<dyn PeerClient>> = HashMap::new();
        for server in layout.all_servers() {
            let client = runtime.get_client(server);
            client.set_timeout_response(self.period);
            clients.insert(server.clone(), client);
        }

        Ok(self.poll_round(layout, &clients, sequencer_metrics).await)
    }

    async fn poll_round(
        &mut self,
        layout: &Layout,
        clients: &HashMap<String, Arc<dyn PeerClient>>,
        sequencer_metrics: SequencerMetrics,
    ) -> PollReport {
        let epoch = layout.epoch();
        let mut reports: Vec<PollReport> = Vec::with_capacity(self.config.failure_threshold as usize);

        for _ in 0..self.config.failure_threshold {
            let iteration_start = Instant::now();

            let report = self
                .poll_iteration(layout, clients, sequencer_metrics)
                .await;

            let poll_interval = self.modify_iteration_timeouts(clients, &report, iteration_start);
            reports.push(report);

            tokio::time::sleep(poll_interval).await;
        }

        // Aggregation step: union the window, then drop every wrong-epoch
        // entry for a peer that was reachable at any iteration.
        let mut wrong_epochs: BTreeMap<String, Epoch> = BTreeMap::new();
        let mut connected: BTreeSet<String> = BTreeSet::new();
        let mut failed: BTreeSet<String> = BTreeSet::new();

        for report in &reports {
            wrong_epochs.extend(
                report
                    .wrong_epochs
                    .iter()
                    .map(|(endpoint, server_epoch)| (endpoint.clone(), *server_epoch)),
            );
            connected.extend(report.reachable_nodes());
            failed.extend(report.failed_nodes());
        }
        for endpoint in &connected {
            wrong_epochs.remove(endpoint);
        }
        failed.retain(|endpoint| !connected.contains(endpoint));

        let mut all_connected = connected;
        all_connected.extend(wrong_epochs.keys().cloned());

        self.tune_poll_report_timeouts(clients, &failed, &all_connected);

        let cluster_states = reports
            .into_iter()
            .map(|report| report.cluster_state)
            .collect();
        let aggregator = ClusterStateAggregator::new(&self.local_endpoint, cluster_states);

        PollReport {
            poll_epoch: epoch,
            responsive_servers: layout.active_layout_servers().clone(),
            wrong_epochs,
            cluster_state: aggregator.aggregated_state(),
        }
    }

    /// One fan-out of probes plus one `ClusterState` construction.
    async fn poll_iteration(
        &self,
        layout: &Layout,
        clients: &HashMap<String, Arc<dyn PeerClient>>,
        sequencer_metrics: SequencerMetrics,
    ) -> PollReport {
        let epoch = layout.epoch();
        tracing::trace!("Poll iteration at epoch {}", epoch);

        let poll_results = self.poll_async(clients, epoch).await;

        let collector = ClusterStateCollector::new(
            &self.local_endpoint,
            poll_results,
            self.heartbeat_counter.clone(),
        );

        PollReport {
            poll_epoch: epoch,
            responsive_servers: layout.active_layout_servers().clone(),
            wrong_epochs: collector.collect_wrong_epochs(),
            cluster_state: collector.collect_cluster_state(epoch, sequencer_metrics),
        }
    }

    /// Probes every server in parallel and waits for all of them to settle.
    /// Each probe is bounded by its client's response timeout; failures stay
    /// local to their entry.
    async fn poll_async(
        &self,
        clients: &HashMap<String, Arc<dyn PeerClient>>,
        epoch: Epoch,
    ) -> HashMap<String, Result<NodeState, ProbeError>> {
        let probes = clients.iter().map(|(endpoint, client)| {
            let endpoint = endpoint.clone();
            let client = client.clone();
            async move { (endpoint, client.send_node_state_request(epoch).await) }
        });

        join_all(probes).await.into_iter().collect()
    }

    /// Adapts timeouts after one iteration and returns the inter-iteration
    /// sleep. A healthy iteration leaves `period` alone; a failed one
    /// stretches it and pushes the new value to the peers that answered.
    fn modify_iteration_timeouts(
        &mut self,
        clients: &HashMap<String, Arc<dyn PeerClient>>,
        report: &PollReport,
        iteration_start: Instant,
    ) -> Duration {
        if report.failed_nodes().is_empty() {
            return self.config.initial_poll_interval;
        }

        let elapsed = iteration_start.elapsed();
        let poll_interval = self
            .config
            .initial_poll_interval
            .max(self.period.saturating_sub(elapsed));

        self.period = self.config.max_period.min(self.period + self.config.period_delta);
        self.tune_response_timeouts(clients, &report.all_reachable_nodes(), self.period);

        poll_interval
    }

    /// Once per round: decay `period` one step toward the floor, push it to
    /// every peer that answered, and park the failed peers at the ceiling so a
    /// slow recovery still gets a chance to respond.
    fn tune_poll_report_timeouts(
        &mut self,
        clients: &HashMap<String, Arc<dyn PeerClient>>,
        failed: &BTreeSet<String>,
        all_connected: &BTreeSet<String>,
    ) {
        self.period = self
            .config
            .init_period
            .max(self.period.saturating_sub(self.config.period_delta));

        self.tune_response_timeouts(clients, all_connected, self.period);
        self.tune_response_timeouts(clients, failed, self.config.max_period);
    }

    fn tune_response_timeouts(
        &self,
        clients: &HashMap<String, Arc<dyn PeerClient>>,
        endpoints: &BTreeSet<String>,
        timeout: Duration,
    ) {
        tracing::trace!("Tuning response timeouts for {:?} to {:?}", endpoints, timeout);

        for endpoint in endpoints {
            if let Some(client) = clients.get(endpoint) {
                client.set_timeout_response(timeout);
            }
        }
    }
}
