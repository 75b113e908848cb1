//! Probe Clients
//!
//! The detector talks to peers through the minimal `PeerClient` contract: one
//! async node-state request plus a mutable response timeout. The production
//! implementation rides the node's HTTP surface; tests substitute scripted
//! clients.

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::StatusCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::protocol::ENDPOINT_NODE_STATE;
use super::types::ProbeError;
use crate::cluster_state::types::{Epoch, NodeState};
use crate::wire::codec::{self, WireDecode};

/// Async request/response channel to one peer.
///
/// A probe that outlives its timeout is abandoned; implementations must make
/// sure a late reply never mutates shared state.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Asks the peer for its current `NodeState`, stamped with the caller's epoch.
    async fn send_node_state_request(&self, epoch: Epoch) -> Result<NodeState, ProbeError>;

    /// Updates the response timeout used by subsequent probes.
    fn set_timeout_response(&self, timeout: Duration);
}

/// Hands out one `PeerClient` per endpoint. Clients are long-lived; the
/// detector re-tunes their timeouts across rounds.
pub trait ClientRuntime: Send + Sync {
    fn get_client(&self, endpoint: &str) -> Arc<dyn PeerClient>;
}

/// Probes a peer over its HTTP surface.
///
/// Maps the transport onto the probe taxonomy: request timeout ⇒ `Timeout`,
/// connection fault ⇒ `Transport`, HTTP 409 carrying the server epoch ⇒
/// `WrongEpoch`, undecodable body ⇒ `Codec`.
pub struct HttpPeerClient {
    endpoint: String,
    http_client: reqwest::Client,
    timeout_ms: AtomicU64,
}

impl HttpPeerClient {
    pub fn new(endpoint: &str, http_client: reqwest::Client, timeout: Duration) -> Self {
        HttpPeerClient {
            endpoint: endpoint.to_string(),
            http_client,
            timeout_ms: AtomicU64::new(timeout.as_millis() as u64),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.load(Ordering::Relaxed))
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn send_node_state_request(&self, epoch: Epoch) -> Result<NodeState, ProbeError> {
        let url = format!("http://{}{}/{}", self.endpoint, ENDPOINT_NODE_STATE, epoch);

        let response = self
            .http_client
            .get(&url)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProbeError::Timeout
                } else {
                    ProbeError::Transport(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| ProbeError::Transport(e.to_string()))?;
                Ok(NodeState::from_wire(&body)?)
            }
            StatusCode::CONFLICT => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| ProbeError::Transport(e.to_string()))?;
                let server_epoch = codec::get_i64(&mut body.as_ref())?;
                Err(ProbeError::WrongEpoch { server_epoch })
            }
            other => Err(ProbeError::Transport(format!(
                "unexpected status {} from {}",
                other, self.endpoint
            ))),
        }
    }

    fn set_timeout_response(&self, timeout: Duration) {
        self.timeout_ms
            .store(timeout.as_millis() as u64, Ordering::Relaxed);
    }
}

/// Production runtime: one cached `HttpPeerClient` per endpoint, all sharing a
/// single connection pool.
pub struct HttpRuntime {
    clients: DashMap<String, Arc<HttpPeerClient>>,
    http_client: reqwest::Client,
    default_timeout: Duration,
}

impl HttpRuntime {
    pub fn new(default_timeout: Duration) -> Self {
        HttpRuntime {
            clients: DashMap::new(),
            http_client: reqwest::Client::new(),
            default_timeout,
        }
    }
}

impl ClientRuntime for HttpRuntime {
    fn get_client(&self, endpoint: &str) -> Arc<dyn PeerClient> {
        let client = self
            .clients
            .entry(endpoint.to_string())
            .or_insert_with(|| {
                Arc::new(HttpPeerClient::new(
                    endpoint,
                    self.http_client.clone(),
                    self.default_timeout,
                ))
            })
            .clone();

        client
    }
}
