//! Pluggable transport for inter-node replication.
//!
//! A [`Transport`] moves records between nodes and reads peer status.
//! Two implementations:
//!
//! - [`LocalTransport`]: direct read/append against a shared
//!   [`credmesh_store::LogStore`]; single-process topologies and tests.
//! - [`HttpTransport`]: HTTP calls against each peer's mesh endpoints,
//!   with bounded retries, exponential backoff with jitter, a per-peer
//!   partition state machine, and optional mutual-auth identity
//!   pinning.
//!
//! Callers depend only on the trait; a node takes its transport by
//! `Arc<dyn Transport>` at construction. There is no ambient default
//! instance.

pub mod codec;
pub mod config;
pub mod http;
pub mod identity;
pub mod local;
pub mod partition;

pub use codec::{decode_payload, encode_payload};
pub use config::TransportConfig;
pub use http::{HttpHealth, HttpTransport, IdentityInfo};
pub use identity::NodeIdentity;
pub use local::LocalTransport;
pub use partition::{PartitionEvent, PartitionMetrics, PeerState, PeerTracker};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use credmesh_store::{LogName, StoreError};

/// Transport-layer errors.
///
/// Transient wire failures surface as [`TransportError::Connection`]
/// only after retries are exhausted; identity failures are immediate
/// and never retried.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Target node is not in the peer registry (programmer error)
    #[error("unknown peer node: {0}")]
    UnknownPeer(String),

    /// Request failed after exhausting retries
    #[error("connection to {url} failed after {attempts} attempts: {reason}")]
    Connection {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// Non-retriable HTTP failure
    #[error("peer returned HTTP {status} for {url}")]
    Http { status: u16, url: String },

    /// Mutual-auth identity check failed; never retried
    #[error("identity rejected for peer {peer}: {reason}")]
    IdentityRejected { peer: String, reason: String },

    /// Response body could not be decoded
    #[error("payload decode failed: {0}")]
    Codec(String),

    /// Invalid transport configuration (programmer error)
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),

    /// Local storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Aggregate transport health, serialized into node health endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportHealth {
    /// ok | degraded
    pub status: String,
    /// local | http
    pub transport: String,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpHealth>,
}

/// Abstract transport interface for inter-node communication.
pub trait Transport: Send + Sync {
    /// Push records into a target node's log. Returns the count the
    /// target accepted.
    fn push(
        &self,
        tenant_id: &str,
        target_node_id: &str,
        log: LogName,
        records: &[Value],
    ) -> Result<usize, TransportError>;

    /// Pull records from a source node's log, optionally only those
    /// with `timestamp >= since`.
    fn pull(
        &self,
        tenant_id: &str,
        source_node_id: &str,
        log: LogName,
        since: &str,
    ) -> Result<Vec<Value>, TransportError>;

    /// Read a node's status document. `None` when unavailable for any
    /// reason; status probes never hard-fail a tick.
    fn get_status(&self, tenant_id: &str, node_id: &str) -> Option<Value>;

    /// Write this node's own status document (always node-local).
    fn set_status(&self, tenant_id: &str, node_id: &str, status: &Value)
        -> Result<(), TransportError>;

    /// Transport health snapshot.
    fn health(&self) -> TransportHealth;
}
