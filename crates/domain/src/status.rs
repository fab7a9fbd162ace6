//! Node status documents, roles, tick outcomes, and replication events.

use serde::{Deserialize, Serialize};

use crate::time;

/// Role a mesh node plays each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Edge,
    Validator,
    Aggregator,
    SealAuthority,
}

/// Status document a node publishes about itself.
///
/// Stored as the node's single status file and served over the status
/// endpoint; the aggregator reads peers' `offline` self-reports when
/// deriving sync regions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeStatus {
    pub node_id: String,
    pub tenant_id: String,
    pub region_id: String,
    pub role: NodeRole,
    /// Lifecycle state: initialized | active | offline
    pub state: String,
    pub offline: bool,
    /// Crypto backend label (Ed25519 | DEMO)
    pub crypto_mode: String,
    /// Truncated public key for display
    pub public_key: String,
    pub cycle_count: u64,
    pub last_updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<String>,
}

impl NodeStatus {
    /// Abbreviate a public key for status display.
    pub fn abbreviate_key(public_key: &str) -> String {
        if public_key.len() <= 16 {
            public_key.to_string()
        } else {
            format!("{}...", &public_key[..16])
        }
    }
}

/// What a node did during one tick, for observability.
///
/// Serialized with an `action` tag so log consumers can filter without
/// knowing every variant's field set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TickAction {
    /// Tick was a no-op (e.g. the node is offline)
    Skip { reason: String },
    GenerateEnvelope {
        envelope_id: String,
        envelope_count: u32,
        region: String,
        group: String,
        replicated_to: u32,
    },
    ValidateEnvelopes { accepted: u32, rejected: u32 },
    Aggregate {
        aggregate_id: String,
        index_score: f64,
        index_band: String,
        claim_state: crate::claim::ClaimStatus,
        envelopes_processed: u32,
        validations_processed: u32,
    },
    Seal {
        seal_hash: String,
        prev_seal_hash: String,
        aggregate_id: String,
        index_score: f64,
    },
    SealSkip { reason: String },
}

impl TickAction {
    /// Short action label for status documents and logs.
    pub fn label(&self) -> &'static str {
        match self {
            TickAction::Skip { .. } => "skip",
            TickAction::GenerateEnvelope { .. } => "generate_envelope",
            TickAction::ValidateEnvelopes { .. } => "validate_envelopes",
            TickAction::Aggregate { .. } => "aggregate",
            TickAction::Seal { .. } => "seal",
            TickAction::SealSkip { .. } => "seal_skip",
        }
    }
}

/// One tick's structured result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickOutcome {
    pub node_id: String,
    pub cycle: u64,
    #[serde(flatten)]
    pub action: TickAction,
}

/// Replication metadata appended to a node's replication log after
/// every push.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplicationEvent {
    pub node_id: String,
    /// push | pull
    pub direction: String,
    pub peer_id: String,
    pub log_name: String,
    pub record_count: u32,
    pub timestamp: String,
}

impl ReplicationEvent {
    /// Record a push of `record_count` records to `peer_id`.
    pub fn push(
        node_id: impl Into<String>,
        peer_id: impl Into<String>,
        log_name: impl Into<String>,
        record_count: u32,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            direction: "push".to_string(),
            peer_id: peer_id.into(),
            log_name: log_name.into(),
            record_count,
            timestamp: time::now_iso(),
        }
    }
}
