//! Failure Detector Tests
//!
//! Validates the three layers of the detector independently and end to end.
//!
//! ## Test Scopes
//! - **Collector**: completeness, wrong-epoch accounting, local-row construction.
//! - **Aggregator**: "latest connected wins" selection across a window.
//! - **Poller**: full rounds against scripted peers, timeout adaptation, error containment.

#[cfg(test)]
mod tests {
    use crate::cluster_state::types::{
        ClusterState, ConnectionStatus, Epoch, HeartbeatTimestamp, Layout, NodeConnectivity,
        NodeConnectivityType, NodeState, SequencerMetrics,
    };
    use crate::detector::aggregator::ClusterStateAggregator;
    use crate::detector::client::{ClientRuntime, PeerClient};
    use crate::detector::collector::ClusterStateCollector;
    use crate::detector::poller::FailureDetector;
    use crate::detector::types::{DetectorConfig, DetectorError, HeartbeatCounter, ProbeError};
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const ENDPOINTS: [&str; 3] = ["a", "b", "c"];

    fn full_matrix(statuses: &[ConnectionStatus]) -> BTreeMap<String, ConnectionStatus> {
        ENDPOINTS
            .iter()
            .zip(statuses)
            .map(|(endpoint, status)| (endpoint.to_string(), *status))
            .collect()
    }

    /// Connected state for `endpoint` with one status per endpoint of the
    /// three-node test cluster, in order.
    fn node_state(endpoint: &str, epoch: Epoch, counter: i64, statuses: &[ConnectionStatus]) -> NodeState {
        NodeState {
            connectivity: NodeConnectivity::connected(endpoint, epoch, full_matrix(statuses)),
            sequencer_metrics: SequencerMetrics::ready(),
            heartbeat: HeartbeatTimestamp { epoch, counter },
        }
    }

    fn healthy_state(endpoint: &str, epoch: Epoch, counter: i64) -> NodeState {
        node_state(
            endpoint,
            epoch,
            counter,
            &[ConnectionStatus::Ok, ConnectionStatus::Ok, ConnectionStatus::Ok],
        )
    }

    fn test_config() -> DetectorConfig {
        DetectorConfig {
            failure_threshold: 3,
            init_period: Duration::from_millis(40),
            max_period: Duration::from_millis(70),
            period_delta: Duration::from_millis(10),
            initial_poll_interval: Duration::from_millis(5),
        }
    }

    // ============================================================
    // SCRIPTED CLIENTS
    // ============================================================

    /// Replays a scripted sequence of probe outcomes, repeating the last one
    /// once the script is exhausted, and records every timeout it is tuned to.
    struct ScriptedClient {
        script: Mutex<VecDeque<Result<NodeState, ProbeError>>>,
        fallback: Result<NodeState, ProbeError>,
        timeouts: Mutex<Vec<Duration>>,
    }

    impl ScriptedClient {
        fn repeating(response: Result<NodeState, ProbeError>) -> Arc<Self> {
            Arc::new(ScriptedClient {
                script: Mutex::new(VecDeque::new()),
                fallback: response,
                timeouts: Mutex::new(Vec::new()),
            })
        }

        fn scripted(
            responses: Vec<Result<NodeState, ProbeError>>,
            fallback: Result<NodeState, ProbeError>,
        ) -> Arc<Self> {
            Arc::new(ScriptedClient {
                script: Mutex::new(responses.into()),
                fallback,
                timeouts: Mutex::new(Vec::new()),
            })
        }

        fn recorded_timeouts(&self) -> Vec<Duration> {
            self.timeouts.lock().unwrap().clone()
        }

        fn last_timeout(&self) -> Duration {
            *self.timeouts.lock().unwrap().last().expect("timeout recorded")
        }
    }

    #[async_trait]
    impl PeerClient for ScriptedClient {
        async fn send_node_state_request(&self, _epoch: Epoch) -> Result<NodeState, ProbeError> {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone())
        }

        fn set_timeout_response(&self, timeout: Duration) {
            self.timeouts.lock().unwrap().push(timeout);
        }
    }

    struct MockRuntime {
        clients: HashMap<String, Arc<ScriptedClient>>,
    }

    impl MockRuntime {
        fn new(clients: impl IntoIterator<Item = (&'static str, Arc<ScriptedClient>)>) -> Self {
            MockRuntime {
                clients: clients
                    .into_iter()
                    .map(|(endpoint, client)| (endpoint.to_string(), client))
                    .collect(),
            }
        }
    }

    impl ClientRuntime for MockRuntime {
        fn get_client(&self, endpoint: &str) -> Arc<dyn PeerClient> {
            self.clients
                .get(endpoint)
                .unwrap_or_else(|| panic!("no scripted client for {}", endpoint))
                .clone()
        }
    }

    fn three_node_layout(epoch: Epoch) -> Layout {
        Layout::new(epoch, ENDPOINTS.map(String::from))
    }

    // ============================================================
    // COLLECTOR TESTS
    // ============================================================

    #[test]
    fn test_collector_completeness() {
        let mut poll_results: HashMap<String, Result<NodeState, ProbeError>> = HashMap::new();
        poll_results.insert("a".to_string(), Ok(healthy_state("a", 1, 1)));
        poll_results.insert("b".to_string(), Err(ProbeError::Timeout));
        poll_results.insert(
            "c".to_string(),
            Err(ProbeError::Transport("connection refused".to_string())),
        );

        let collector =
            ClusterStateCollector::new("a", poll_results, Arc::new(HeartbeatCounter::new()));
        let cluster_state = collector.collect_cluster_state(1, SequencerMetrics::ready());

        assert_eq!(cluster_state.size(), 3, "one entry per probe, no more, no less");
        assert_eq!(
            cluster_state.node("b").unwrap().connectivity.node_type,
            NodeConnectivityType::Unavailable
        );
        assert_eq!(
            cluster_state.node("c").unwrap().connectivity.node_type,
            NodeConnectivityType::Unavailable
        );
    }

    #[test]
    fn test_collector_rejects_stale_epoch_replies() {
        let mut poll_results: HashMap<String, Result<NodeState, ProbeError>> = HashMap::new();
        poll_results.insert("a".to_string(), Ok(healthy_state("a", 1, 1)));
        // b answered with a well-formed state observed at another epoch.
        poll_results.insert("b".to_string(), Ok(healthy_state("b", 2, 1)));

        let collector =
            ClusterStateCollector::new("a", poll_results, Arc::new(HeartbeatCounter::new()));
        let cluster_state = collector.collect_cluster_state(1, SequencerMetrics::ready());

        assert_eq!(
            cluster_state.node("b").unwrap().connectivity.node_type,
            NodeConnectivityType::Unavailable,
            "a stale-epoch observation is not a usable observation"
        );
    }

    #[test]
    fn test_collector_local_row_counts_wrong_epoch_as_reachable() {
        let mut poll_results: HashMap<String, Result<NodeState, ProbeError>> = HashMap::new();
        poll_results.insert("a".to_string(), Ok(healthy_state("a", 1, 1)));
        poll_results.insert("b".to_string(), Err(ProbeError::WrongEpoch { server_epoch: 2 }));
        poll_results.insert("c".to_string(), Err(ProbeError::Timeout));

        let counter = Arc::new(HeartbeatCounter::new());
        let collector = ClusterStateCollector::new("a", poll_results, counter.clone());
        let cluster_state = collector.collect_cluster_state(1, SequencerMetrics::ready());

        let local_row = &cluster_state.node("a").unwrap().connectivity;
        assert_eq!(local_row.node_type, NodeConnectivityType::Connected);
        assert_eq!(local_row.epoch, 1);
        assert_eq!(local_row.connection_status("a"), Ok(ConnectionStatus::Ok));
        assert_eq!(
            local_row.connection_status("b"),
            Ok(ConnectionStatus::Ok),
            "wrong epoch still proves the link works"
        );
        assert_eq!(local_row.connection_status("c"), Ok(ConnectionStatus::Failed));

        // The remote b entry itself degrades to unavailable.
        assert_eq!(
            cluster_state.node("b").unwrap().connectivity.node_type,
            NodeConnectivityType::Unavailable
        );
    }

    #[test]
    fn test_collector_heartbeat_advances_per_collection() {
        let counter = Arc::new(HeartbeatCounter::new());
        let mut poll_results: HashMap<String, Result<NodeState, ProbeError>> = HashMap::new();
        poll_results.insert("a".to_string(), Ok(healthy_state("a", 1, 1)));

        let collector = ClusterStateCollector::new("a", poll_results, counter.clone());

        let first = collector.collect_cluster_state(1, SequencerMetrics::ready());
        let second = collector.collect_cluster_state(1, SequencerMetrics::ready());

        assert_eq!(first.node("a").unwrap().heartbeat.counter, 1);
        assert_eq!(second.node("a").unwrap().heartbeat.counter, 2);
        assert_eq!(counter.current(), 2);
    }

    #[test]
    fn test_collector_wrong_epochs() {
        let mut poll_results: HashMap<String, Result<NodeState, ProbeError>> = HashMap::new();
        poll_results.insert("a".to_string(), Ok(healthy_state("a", 1, 1)));
        poll_results.insert("b".to_string(), Err(ProbeError::WrongEpoch { server_epoch: 5 }));
        poll_results.insert("c".to_string(), Err(ProbeError::Timeout));

        let collector =
            ClusterStateCollector::new("a", poll_results, Arc::new(HeartbeatCounter::new()));
        let wrong_epochs = collector.collect_wrong_epochs();

        assert_eq!(wrong_epochs.len(), 1);
        assert_eq!(wrong_epochs.get("b"), Some(&5));
    }

    // ============================================================
    // AGGREGATOR TESTS
    // ============================================================

    #[test]
    fn test_aggregator_single_node_cluster() {
        let cluster_state = ClusterState::from_states(
            "a",
            vec![node_state("a", 1, 1, &[ConnectionStatus::Ok, ConnectionStatus::Ok, ConnectionStatus::Ok])],
        );

        let aggregator = ClusterStateAggregator::new(
            "a",
            vec![cluster_state.clone(), cluster_state.clone(), cluster_state.clone()],
        );

        assert_eq!(
            aggregator.aggregated_state().node("a"),
            cluster_state.node("a")
        );
    }

    #[test]
    fn test_aggregator_prefers_latest_connected_observation() {
        use ConnectionStatus::{Failed, Ok};

        let state1 = ClusterState::from_states(
            "a",
            vec![
                node_state("a", 1, 1, &[Ok, Failed, Failed]),
                NodeState::unavailable("b"),
                NodeState::unavailable("c"),
            ],
        );
        let state2 = ClusterState::from_states(
            "a",
            vec![
                node_state("a", 1, 2, &[Ok, Ok, Failed]),
                node_state("b", 1, 2, &[Ok, Ok, Failed]),
                NodeState::unavailable("c"),
            ],
        );
        let state3 = ClusterState::from_states(
            "a",
            vec![
                node_state("a", 1, 3, &[Ok, Failed, Failed]),
                NodeState::unavailable("b"),
                NodeState::not_ready("c", 1, 123),
            ],
        );

        let aggregator =
            ClusterStateAggregator::new("a", vec![state1, state2.clone(), state3.clone()]);
        let aggregated = aggregator.aggregated_state();

        // [CONNECTED, CONNECTED, CONNECTED] -> the latest one
        assert_eq!(aggregated.node("a"), state3.node("a"));
        // [UNAVAILABLE, CONNECTED, UNAVAILABLE] -> the connected one
        assert_eq!(aggregated.node("b"), state2.node("b"));
        assert!(aggregated.node("b").unwrap().is_connected());
        // [UNAVAILABLE, UNAVAILABLE, NOT_READY] -> not ready
        assert_eq!(aggregated.node("c"), state3.node("c"));
        assert!(!aggregated.node("c").unwrap().is_connected());
    }

    #[test]
    fn test_aggregator_connected_survives_newer_unavailable() {
        use ConnectionStatus::Ok;

        let connected = ClusterState::from_states(
            "a",
            vec![node_state("b", 1, 5, &[Ok, Ok, Ok])],
        );
        let unavailable =
            ClusterState::from_states("a", vec![NodeState::unavailable("b")]);

        let aggregator = ClusterStateAggregator::new(
            "a",
            vec![connected.clone(), unavailable.clone(), unavailable],
        );
        let aggregated = aggregator.aggregated_state();

        let selected = aggregated.node("b").unwrap();
        assert!(selected.is_connected(), "transient probe failures must not erase a live node");
        assert_eq!(selected.heartbeat.counter, 5);
    }

    #[test]
    fn test_aggregator_recency_among_connected() {
        use ConnectionStatus::Ok;

        let older = ClusterState::from_states("a", vec![node_state("b", 1, 5, &[Ok, Ok, Ok])]);
        let newer = ClusterState::from_states("a", vec![node_state("b", 1, 9, &[Ok, Ok, Ok])]);

        let aggregator = ClusterStateAggregator::new("a", vec![older, newer]);

        assert_eq!(
            aggregator.aggregated_state().node("b").unwrap().heartbeat.counter,
            9,
            "with several connected observations the latest wins"
        );
    }

    #[test]
    fn test_aggregator_not_ready_beats_unavailable() {
        let unavailable = ClusterState::from_states("a", vec![NodeState::unavailable("c")]);
        let not_ready =
            ClusterState::from_states("a", vec![NodeState::not_ready("c", 1, 7)]);

        let aggregator = ClusterStateAggregator::new(
            "a",
            vec![unavailable.clone(), unavailable, not_ready.clone()],
        );
        let aggregated = aggregator.aggregated_state();

        assert_eq!(aggregated.node("c"), not_ready.node("c"));
        assert!(!aggregated.is_ready(), "a not-ready member keeps the snapshot unusable");
    }

    // ============================================================
    // POLLER SCENARIOS
    // ============================================================

    #[tokio::test]
    async fn test_poll_all_healthy_cluster() {
        let clients: Vec<(&str, Arc<ScriptedClient>)> = ENDPOINTS
            .iter()
            .map(|endpoint| (*endpoint, ScriptedClient::repeating(Ok(healthy_state(endpoint, 1, 1)))))
            .collect();
        let runtime = MockRuntime::new(clients.clone());

        let counter = Arc::new(HeartbeatCounter::new());
        let mut detector = FailureDetector::with_config(counter.clone(), "a", test_config());

        let report = detector
            .poll(&three_node_layout(1), &runtime, SequencerMetrics::ready())
            .await
            .unwrap();

        assert!(report.wrong_epochs.is_empty());
        assert!(report.failed_nodes().is_empty());
        assert_eq!(report.poll_epoch, 1);
        assert_eq!(report.cluster_state.size(), 3);
        for endpoint in ENDPOINTS {
            assert!(
                report.cluster_state.node(endpoint).unwrap().is_connected(),
                "{} must be connected",
                endpoint
            );
        }
        assert_eq!(
            report.responsive_servers,
            three_node_layout(1).active_layout_servers().clone()
        );

        // One heartbeat per iteration.
        assert_eq!(counter.current(), 3);

        // No failures anywhere: period never moved off the floor.
        assert_eq!(detector.period(), test_config().init_period);
        for (_, client) in &clients {
            assert_eq!(client.last_timeout(), test_config().init_period);
        }
    }

    #[tokio::test]
    async fn test_poll_one_dead_node() {
        use ConnectionStatus::{Failed, Ok};

        let reply_matrix = [Ok, Ok, Failed]; // everyone sees c down
        let client_a = ScriptedClient::repeating(Result::Ok(node_state("a", 1, 1, &reply_matrix)));
        let client_b = ScriptedClient::repeating(Result::Ok(node_state("b", 1, 1, &reply_matrix)));
        let client_c = ScriptedClient::repeating(Err(ProbeError::Timeout));
        let runtime = MockRuntime::new([
            ("a", client_a.clone()),
            ("b", client_b.clone()),
            ("c", client_c.clone()),
        ]);

        let config = test_config();
        let mut detector =
            FailureDetector::with_config(Arc::new(HeartbeatCounter::new()), "a", config.clone());

        let report = detector
            .poll(&three_node_layout(1), &runtime, SequencerMetrics::ready())
            .await
            .unwrap();

        assert_eq!(
            report.cluster_state.node("c").unwrap().connectivity.node_type,
            NodeConnectivityType::Unavailable
        );
        assert_eq!(
            report.failed_nodes().into_iter().collect::<Vec<_>>(),
            vec!["c".to_string()]
        );
        for observer in ["a", "b"] {
            let row = &report.cluster_state.node(observer).unwrap().connectivity;
            assert_eq!(row.connection_status("c"), Result::Ok(Failed));
        }

        // Three failed iterations stretched the period to the ceiling, the
        // round decay brought it one step back.
        let expected = config.max_period - config.period_delta;
        assert_eq!(detector.period(), expected);

        // Reachable peers follow the stretched period; the dead one is parked
        // at the ceiling for the next round.
        assert_eq!(client_a.last_timeout(), expected);
        assert_eq!(client_b.last_timeout(), expected);
        assert_eq!(client_c.last_timeout(), config.max_period);
        assert_eq!(
            client_c.recorded_timeouts(),
            vec![config.init_period, config.max_period],
            "a failed peer never receives the iteration stretches"
        );
    }

    #[tokio::test]
    async fn test_poll_wrong_epoch_peer() {
        let client_a = ScriptedClient::repeating(Ok(healthy_state("a", 1, 1)));
        let client_b = ScriptedClient::repeating(Ok(healthy_state("b", 1, 1)));
        let client_c =
            ScriptedClient::repeating(Err(ProbeError::WrongEpoch { server_epoch: 2 }));
        let runtime = MockRuntime::new([
            ("a", client_a),
            ("b", client_b),
            ("c", client_c.clone()),
        ]);

        let config = test_config();
        let mut detector =
            FailureDetector::with_config(Arc::new(HeartbeatCounter::new()), "a", config.clone());

        let report = detector
            .poll(&three_node_layout(1), &runtime, SequencerMetrics::ready())
            .await
            .unwrap();

        assert_eq!(report.wrong_epochs.len(), 1);
        assert_eq!(report.wrong_epochs.get("c"), Some(&2));
        assert!(
            !report.failed_nodes().contains("c"),
            "a wrong-epoch peer is reachable, not failed"
        );
        // No usable observation for c, so its entry degrades to unavailable.
        assert_eq!(
            report.cluster_state.node("c").unwrap().connectivity.node_type,
            NodeConnectivityType::Unavailable
        );

        // Nothing failed, so the period stayed on the floor; c is tuned with
        // the connected peers.
        assert_eq!(detector.period(), config.init_period);
        assert_eq!(client_c.last_timeout(), config.init_period);
    }

    #[tokio::test]
    async fn test_wrong_epoch_suppressed_once_peer_is_reachable() {
        let client_a = ScriptedClient::repeating(Ok(healthy_state("a", 1, 1)));
        let client_b = ScriptedClient::repeating(Ok(healthy_state("b", 1, 1)));
        // c diverges in the first iteration, then catches up.
        let client_c = ScriptedClient::scripted(
            vec![Err(ProbeError::WrongEpoch { server_epoch: 2 })],
            Ok(healthy_state("c", 1, 1)),
        );
        let runtime = MockRuntime::new([("a", client_a), ("b", client_b), ("c", client_c)]);

        let mut detector =
            FailureDetector::with_config(Arc::new(HeartbeatCounter::new()), "a", test_config());

        let report = detector
            .poll(&three_node_layout(1), &runtime, SequencerMetrics::ready())
            .await
            .unwrap();

        assert!(
            report.wrong_epochs.is_empty(),
            "a peer reachable at any iteration must not be reported as wrong-epoch"
        );
        assert!(report.cluster_state.node("c").unwrap().is_connected());
    }

    #[tokio::test]
    async fn test_poll_rejects_zero_threshold() {
        let runtime = MockRuntime::new([]);
        let mut config = test_config();
        config.failure_threshold = 0;

        let mut detector =
            FailureDetector::with_config(Arc::new(HeartbeatCounter::new()), "a", config);

        let result = detector
            .poll(&three_node_layout(1), &runtime, SequencerMetrics::ready())
            .await;

        assert!(matches!(result, Err(DetectorError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_poll_rejects_inverted_period_bounds() {
        let runtime = MockRuntime::new([]);
        let mut config = test_config();
        config.init_period = Duration::from_millis(100);
        config.max_period = Duration::from_millis(50);

        let mut detector =
            FailureDetector::with_config(Arc::new(HeartbeatCounter::new()), "a", config);

        let result = detector
            .poll(&three_node_layout(1), &runtime, SequencerMetrics::ready())
            .await;

        assert!(matches!(result, Err(DetectorError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_period_envelope_and_decay() {
        let config = test_config();
        let client_a = ScriptedClient::repeating(Ok(healthy_state("a", 1, 1)));
        let client_b = ScriptedClient::repeating(Ok(healthy_state("b", 1, 1)));
        // c is down for exactly one round (three iterations), then recovers.
        let client_c = ScriptedClient::scripted(
            vec![
                Err(ProbeError::Timeout),
                Err(ProbeError::Timeout),
                Err(ProbeError::Timeout),
            ],
            Ok(healthy_state("c", 1, 1)),
        );
        let runtime = MockRuntime::new([("a", client_a), ("b", client_b), ("c", client_c)]);

        let mut detector =
            FailureDetector::with_config(Arc::new(HeartbeatCounter::new()), "a", config.clone());
        let layout = three_node_layout(1);

        // Round 1: stretches to the ceiling, decays one step.
        detector
            .poll(&layout, &runtime, SequencerMetrics::ready())
            .await
            .unwrap();
        assert_eq!(detector.period(), config.max_period - config.period_delta);

        // Healthy rounds decay one step each until the floor, never below it.
        let mut previous = detector.period();
        for _ in 0..4 {
            detector
                .poll(&layout, &runtime, SequencerMetrics::ready())
                .await
                .unwrap();

            let period = detector.period();
            assert!(period >= config.init_period && period <= config.max_period);
            assert!(
                previous.saturating_sub(period) <= config.period_delta,
                "decay moves at most one step per round"
            );
            assert!(period <= previous);
            previous = period;
        }
        assert_eq!(detector.period(), config.init_period);
    }

    #[tokio::test]
    async fn test_no_peer_error_escapes_poll() {
        let client_a = ScriptedClient::repeating(Err(ProbeError::Transport(
            "connection reset".to_string(),
        )));
        let client_b = ScriptedClient::repeating(Err(ProbeError::Codec(
            crate::wire::codec::CodecError::AbsentString,
        )));
        let client_c = ScriptedClient::repeating(Err(ProbeError::Timeout));
        let runtime = MockRuntime::new([("a", client_a), ("b", client_b), ("c", client_c)]);

        let mut detector =
            FailureDetector::with_config(Arc::new(HeartbeatCounter::new()), "a", test_config());

        let report = detector
            .poll(&three_node_layout(1), &runtime, SequencerMetrics::ready())
            .await
            .expect("peer errors must never escape a round");

        // Every remote entry degraded, every local link marked failed.
        for endpoint in ["b", "c"] {
            assert_eq!(
                report.cluster_state.node(endpoint).unwrap().connectivity.node_type,
                NodeConnectivityType::Unavailable
            );
        }
        let local_row = report.cluster_state.local_node_connectivity().unwrap();
        assert_eq!(local_row.failed_nodes().len(), 3, "undecodable replies count as faults");
    }
}
