//! HTTP transport for distributed mesh nodes.
//!
//! Blocking request/response against each peer's `/mesh/*` endpoints.
//! Transient failures (502/503/504, connect, timeout) are retried with
//! exponential backoff plus jitter up to a bounded attempt count;
//! non-transient HTTP errors fail immediately. Every completed call
//! feeds the per-peer partition state machine.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use credmesh_store::{LogName, LogStore};

use crate::codec::{decode_payload, encode_payload};
use crate::config::TransportConfig;
use crate::identity::NodeIdentity;
use crate::partition::{PartitionEvent, PartitionMetrics, PeerState, PeerTracker};
use crate::{Transport, TransportError, TransportHealth};

/// HTTP statuses retried as transient.
const TRANSIENT_STATUSES: [u16; 3] = [502, 503, 504];

/// Response header carrying the peer certificate fingerprint.
const FINGERPRINT_HEADER: &str = "x-peer-cert-fingerprint";

/// One outbound wire request.
pub(crate) struct WireRequest {
    pub method: &'static str,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub content_type: Option<&'static str>,
    pub timeout: Duration,
}

/// One wire response, already fully read.
pub(crate) struct WireResponse {
    pub status: u16,
    pub content_type: String,
    pub peer_fingerprint: Option<String>,
    pub body: Vec<u8>,
}

/// Transport-level wire failures (always transient).
pub(crate) enum WireFailure {
    Connect(String),
    Timeout(String),
}

impl WireFailure {
    fn reason(&self) -> &str {
        match self {
            WireFailure::Connect(r) | WireFailure::Timeout(r) => r,
        }
    }
}

/// Minimal HTTP execution seam; production uses reqwest, tests script
/// responses.
pub(crate) trait WireClient: Send + Sync {
    fn execute(&self, request: &WireRequest) -> Result<WireResponse, WireFailure>;
}

struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::InvalidConfig(e.to_string()))?;
        Ok(Self { client })
    }
}

impl WireClient for ReqwestClient {
    fn execute(&self, request: &WireRequest) -> Result<WireResponse, WireFailure> {
        let mut builder = match request.method {
            "POST" => self.client.post(&request.url),
            _ => self.client.get(&request.url),
        };
        builder = builder.timeout(request.timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(content_type) = request.content_type {
            builder = builder.header("Content-Type", content_type);
        }

        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                WireFailure::Timeout(e.to_string())
            } else {
                WireFailure::Connect(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string();
        let peer_fingerprint = response
            .headers()
            .get(FINGERPRINT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .map_err(|e| WireFailure::Connect(e.to_string()))?
            .to_vec();

        Ok(WireResponse {
            status,
            content_type,
            peer_fingerprint,
            body,
        })
    }
}

/// Mutual-auth material, hot-rotatable at runtime.
#[derive(Debug, Clone, Default)]
struct IdentityState {
    trust_roots: Vec<String>,
    client_cert_path: Option<String>,
    client_key_path: Option<String>,
    cert_rotation_path: Option<String>,
    pinned: BTreeMap<String, NodeIdentity>,
}

/// Identity section of the health document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityInfo {
    pub trust_roots: Vec<String>,
    pub client_cert_path: Option<String>,
    pub cert_rotation_path: Option<String>,
}

/// HTTP-specific transport health.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpHealth {
    pub peers_total: usize,
    pub peers_reachable: usize,
    /// Per-peer probe result: ok | error:<status> | unreachable
    pub peer_health: BTreeMap<String, String>,
    pub peer_states: BTreeMap<String, PeerState>,
    pub partition_metrics: PartitionMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityInfo>,
    pub dense_codec: bool,
}

/// HTTP-based transport for distributed deployments.
pub struct HttpTransport {
    peers: BTreeMap<String, String>,
    config: TransportConfig,
    store: Arc<LogStore>,
    tracker: Mutex<PeerTracker>,
    identity: RwLock<IdentityState>,
    client: Box<dyn WireClient>,
}

impl HttpTransport {
    /// Build a transport over a peer registry (`node_id` → base URL).
    ///
    /// The store handle backs node-local status writes; remote peers
    /// are only ever reached over HTTP.
    pub fn new(
        peer_registry: BTreeMap<String, String>,
        config: TransportConfig,
        store: Arc<LogStore>,
    ) -> Result<Self, TransportError> {
        config.validate()?;
        let client = Box::new(ReqwestClient::new(config.timeout)?);
        Ok(Self::with_wire_client(peer_registry, config, store, client))
    }

    pub(crate) fn with_wire_client(
        peer_registry: BTreeMap<String, String>,
        config: TransportConfig,
        store: Arc<LogStore>,
        client: Box<dyn WireClient>,
    ) -> Self {
        let tracker = PeerTracker::new(
            config.suspect_after_failures,
            config.offline_after_failures,
            config.recovery_successes,
        );
        let identity = IdentityState {
            trust_roots: config.trust_roots.clone(),
            client_cert_path: config.client_cert_path.clone(),
            client_key_path: config.client_key_path.clone(),
            cert_rotation_path: config.cert_rotation_path.clone(),
            pinned: BTreeMap::new(),
        };
        Self {
            peers: peer_registry,
            config,
            store,
            tracker: Mutex::new(tracker),
            identity: RwLock::new(identity),
            client,
        }
    }

    /// Pin a peer's expected identity.
    pub fn set_peer_identity(&self, node_id: &str, identity: NodeIdentity) {
        self.identity
            .write()
            .expect("identity lock poisoned")
            .pinned
            .insert(node_id.to_string(), identity);
    }

    /// Replace the trust-root set without rebuilding the transport.
    pub fn configure_trust_roots(&self, trust_roots: Vec<String>) {
        self.identity
            .write()
            .expect("identity lock poisoned")
            .trust_roots = trust_roots;
    }

    /// Rotate the client certificate paths.
    pub fn rotate_client_certificate(
        &self,
        cert_path: impl Into<String>,
        key_path: impl Into<String>,
        cert_rotation_path: Option<String>,
    ) {
        let mut identity = self.identity.write().expect("identity lock poisoned");
        identity.client_cert_path = Some(cert_path.into());
        identity.client_key_path = Some(key_path.into());
        if cert_rotation_path.is_some() {
            identity.cert_rotation_path = cert_rotation_path;
        }
    }

    /// Current peer state map (ONLINE/SUSPECT/OFFLINE).
    pub fn peer_states(&self) -> BTreeMap<String, PeerState> {
        let mut states = self.tracker.lock().expect("tracker lock poisoned").states();
        for peer in self.peers.keys() {
            states.entry(peer.clone()).or_insert(PeerState::Online);
        }
        states
    }

    /// Recent partition/recovery events, oldest first.
    pub fn partition_events(&self) -> Vec<PartitionEvent> {
        self.tracker.lock().expect("tracker lock poisoned").events()
    }

    fn base_url(&self, node_id: &str) -> Result<String, TransportError> {
        let url = self
            .peers
            .get(node_id)
            .ok_or_else(|| TransportError::UnknownPeer(node_id.to_string()))?;
        Ok(url.trim_end_matches('/').to_string())
    }

    fn preflight_mtls(&self, peer_id: &str, base_url: &str) -> Result<(), TransportError> {
        if self.config.require_mtls && !base_url.starts_with("https://") {
            return Err(TransportError::IdentityRejected {
                peer: peer_id.to_string(),
                reason: format!("peer URL {base_url} is not HTTPS under mutual auth"),
            });
        }
        Ok(())
    }

    fn check_identity(&self, peer_id: &str, response: &WireResponse) -> Result<(), TransportError> {
        let identity = self.identity.read().expect("identity lock poisoned");
        let Some(pinned) = identity.pinned.get(peer_id) else {
            return Ok(());
        };
        if pinned.cert_fingerprint.is_empty() {
            return Ok(());
        }
        match &response.peer_fingerprint {
            Some(fingerprint) if *fingerprint == pinned.cert_fingerprint => Ok(()),
            other => Err(TransportError::IdentityRejected {
                peer: peer_id.to_string(),
                reason: format!(
                    "certificate fingerprint mismatch: expected {}, got {}",
                    pinned.cert_fingerprint,
                    other.as_deref().unwrap_or("<none>")
                ),
            }),
        }
    }

    fn backoff(&self, attempt: u32) {
        let base_ms = self.config.backoff_base.as_millis() as u64;
        if base_ms == 0 {
            return;
        }
        let exp = base_ms.saturating_mul(1u64 << attempt.min(16));
        let capped = exp.min(self.config.backoff_cap.as_millis() as u64);
        let jitter = rand::thread_rng().gen_range(0..=capped / 2);
        std::thread::sleep(Duration::from_millis(capped + jitter));
    }

    fn mark_success(&self, peer_id: &str) {
        self.tracker
            .lock()
            .expect("tracker lock poisoned")
            .record_success(peer_id);
    }

    fn mark_failure(&self, peer_id: &str, reason: &str) {
        self.tracker
            .lock()
            .expect("tracker lock poisoned")
            .record_failure(peer_id, reason);
    }

    /// Execute a request with bounded retries on transient failures.
    fn request_with_retry(
        &self,
        peer_id: &str,
        mut request: WireRequest,
    ) -> Result<Value, TransportError> {
        request.timeout = self.config.timeout;
        let attempts = self.config.max_retries;
        let mut last_reason = String::from("request_failed");

        for attempt in 0..attempts {
            match self.client.execute(&request) {
                Ok(response) if TRANSIENT_STATUSES.contains(&response.status) => {
                    warn!(
                        url = %request.url,
                        status = response.status,
                        attempt = attempt + 1,
                        attempts,
                        "transient peer failure"
                    );
                    last_reason = format!("http_{}", response.status);
                    if attempt + 1 < attempts {
                        self.backoff(attempt);
                    }
                }
                Ok(response) if response.status >= 400 => {
                    // Non-transient: fail now, never retry.
                    self.mark_failure(peer_id, &format!("http_{}", response.status));
                    return Err(TransportError::Http {
                        status: response.status,
                        url: request.url,
                    });
                }
                Ok(response) => {
                    self.check_identity(peer_id, &response)?;
                    let value = decode_payload(&response.body, &response.content_type)?;
                    self.mark_success(peer_id);
                    return Ok(value);
                }
                Err(failure) => {
                    warn!(
                        url = %request.url,
                        attempt = attempt + 1,
                        attempts,
                        reason = failure.reason(),
                        "connection error"
                    );
                    last_reason = failure.reason().to_string();
                    if attempt + 1 < attempts {
                        self.backoff(attempt);
                    }
                }
            }
        }

        self.mark_failure(peer_id, &last_reason);
        Err(TransportError::Connection {
            url: request.url,
            attempts,
            reason: last_reason,
        })
    }
}

impl Transport for HttpTransport {
    fn push(
        &self,
        tenant_id: &str,
        target_node_id: &str,
        log: LogName,
        records: &[Value],
    ) -> Result<usize, TransportError> {
        let base = self.base_url(target_node_id)?;
        self.preflight_mtls(target_node_id, &base)?;
        let url = format!("{base}/mesh/{tenant_id}/{target_node_id}/push");
        let payload = json!({ log.key(): records });
        let (body, content_type) = encode_payload(&payload, self.config.prefer_dense_codec)?;

        let result = self.request_with_retry(
            target_node_id,
            WireRequest {
                method: "POST",
                url,
                query: Vec::new(),
                body: Some(body),
                content_type: Some(content_type),
                timeout: self.config.timeout,
            },
        )?;
        Ok(result["received"][log.key()].as_u64().unwrap_or(0) as usize)
    }

    fn pull(
        &self,
        tenant_id: &str,
        source_node_id: &str,
        log: LogName,
        since: &str,
    ) -> Result<Vec<Value>, TransportError> {
        let base = self.base_url(source_node_id)?;
        self.preflight_mtls(source_node_id, &base)?;
        let url = format!("{base}/mesh/{tenant_id}/{source_node_id}/pull");
        let mut query = Vec::new();
        if !since.is_empty() {
            query.push(("since".to_string(), since.to_string()));
        }

        let result = self.request_with_retry(
            source_node_id,
            WireRequest {
                method: "GET",
                url,
                query,
                body: None,
                content_type: None,
                timeout: self.config.timeout,
            },
        )?;
        Ok(result["records"][log.key()]
            .as_array()
            .cloned()
            .unwrap_or_default())
    }

    fn get_status(&self, tenant_id: &str, node_id: &str) -> Option<Value> {
        let base = self.base_url(node_id).ok()?;
        self.preflight_mtls(node_id, &base).ok()?;
        let url = format!("{base}/mesh/{tenant_id}/{node_id}/status");
        self.request_with_retry(
            node_id,
            WireRequest {
                method: "GET",
                url,
                query: Vec::new(),
                body: None,
                content_type: None,
                timeout: self.config.timeout,
            },
        )
        .ok()
    }

    fn set_status(
        &self,
        tenant_id: &str,
        node_id: &str,
        status: &Value,
    ) -> Result<(), TransportError> {
        // Status is node-local: always written to our own store.
        Ok(self.store.write_status(tenant_id, node_id, status)?)
    }

    fn health(&self) -> TransportHealth {
        let mut peer_health: BTreeMap<String, String> = BTreeMap::new();
        for (node_id, base_url) in &self.peers {
            let request = WireRequest {
                method: "GET",
                url: format!("{}/health", base_url.trim_end_matches('/')),
                query: Vec::new(),
                body: None,
                content_type: None,
                timeout: Duration::from_secs(2),
            };
            match self.client.execute(&request) {
                Ok(response) if response.status == 200 => {
                    peer_health.insert(node_id.clone(), "ok".to_string());
                    self.mark_success(node_id);
                }
                Ok(response) => {
                    peer_health.insert(node_id.clone(), format!("error:{}", response.status));
                    self.mark_failure(node_id, &format!("http_{}", response.status));
                }
                Err(_) => {
                    peer_health.insert(node_id.clone(), "unreachable".to_string());
                    self.mark_failure(node_id, "health_unreachable");
                }
            }
        }

        let reachable = peer_health.values().filter(|v| *v == "ok").count();
        let (peer_states, partition_metrics) = {
            let tracker = self.tracker.lock().expect("tracker lock poisoned");
            (tracker.states(), tracker.metrics())
        };
        let mut peer_states = peer_states;
        for peer in self.peers.keys() {
            peer_states.entry(peer.clone()).or_insert(PeerState::Online);
        }

        let identity = if self.config.require_mtls {
            let state = self.identity.read().expect("identity lock poisoned");
            Some(IdentityInfo {
                trust_roots: state.trust_roots.clone(),
                client_cert_path: state.client_cert_path.clone(),
                cert_rotation_path: state.cert_rotation_path.clone(),
            })
        } else {
            None
        };

        TransportHealth {
            status: if reachable == self.peers.len() {
                "ok".to_string()
            } else {
                "degraded".to_string()
            },
            transport: "http".to_string(),
            http: Some(HttpHealth {
                peers_total: self.peers.len(),
                peers_reachable: reachable,
                peer_health,
                peer_states,
                partition_metrics,
                identity,
                dense_codec: cfg!(feature = "dense-codec") && self.config.prefer_dense_codec,
            }),
        }
    }
}
