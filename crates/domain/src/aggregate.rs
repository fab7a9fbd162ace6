//! Aggregation records: an aggregator's periodic snapshot of mesh state.

use serde::{Deserialize, Serialize};

use credmesh_crypto::{canonical_bytes, sha256_trunc_hex};

use crate::claim::{ClaimState, CorrelationCluster, SyncRegion};
use crate::envelope::CONTENT_HASH_LEN;
use crate::{ids, time, DomainError};

/// Six-component credibility breakdown.
///
/// Penalties are stored negated (a 12.5-point claim-integrity hit
/// appears as `-12.5`) so the components sum with the base to the score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct IndexComponents {
    pub claim_integrity: f64,
    pub correlation_risk: f64,
    pub quorum_margin: f64,
    pub ttl_health: f64,
    pub sync_plane: f64,
    pub confirmation_bonus: f64,
}

/// Credibility index: bounded 0–100 score with a named band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CredibilityIndex {
    pub score: f64,
    pub band: String,
    #[serde(default)]
    pub components: IndexComponents,
}

impl Default for CredibilityIndex {
    fn default() -> Self {
        Self {
            score: 0.0,
            band: "Compromised".to_string(),
            components: IndexComponents::default(),
        }
    }
}

/// Periodic federated snapshot built by an aggregator node.
///
/// Consumed by the seal authority; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregationRecord {
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub aggregate_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub aggregator_id: String,
    /// First envelope timestamp in the aggregated window
    #[serde(default)]
    pub window_start: String,
    /// Last envelope timestamp in the aggregated window
    #[serde(default)]
    pub window_end: String,
    #[serde(default)]
    pub tier0_claims_state: Vec<ClaimState>,
    #[serde(default)]
    pub correlation_clusters: Vec<CorrelationCluster>,
    #[serde(default)]
    pub sync_regions: Vec<SyncRegion>,
    #[serde(default)]
    pub credibility_snapshot: CredibilityIndex,
    #[serde(default)]
    pub policy_hash: String,
    /// Truncated SHA-256 over the snapshot content, input to sealing
    #[serde(default)]
    pub seal_candidate_hash: String,
}

/// Snapshot content covered by the seal candidate hash.
#[derive(Serialize)]
struct SealCandidateContent<'a> {
    claims: &'a [ClaimState],
    clusters: &'a [CorrelationCluster],
    regions: &'a [SyncRegion],
    snapshot: &'a CredibilityIndex,
    policy_hash: &'a str,
}

impl AggregationRecord {
    /// Create a snapshot with a fresh id and timestamp.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: impl Into<String>,
        aggregator_id: impl Into<String>,
        window_start: impl Into<String>,
        window_end: impl Into<String>,
        tier0_claims_state: Vec<ClaimState>,
        correlation_clusters: Vec<CorrelationCluster>,
        sync_regions: Vec<SyncRegion>,
        credibility_snapshot: CredibilityIndex,
        policy_hash: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            aggregate_id: ids::new_id("AGG"),
            timestamp: time::now_iso(),
            aggregator_id: aggregator_id.into(),
            window_start: window_start.into(),
            window_end: window_end.into(),
            tier0_claims_state,
            correlation_clusters,
            sync_regions,
            credibility_snapshot,
            policy_hash: policy_hash.into(),
            seal_candidate_hash: String::new(),
        }
    }

    /// Compute and store the seal candidate hash over snapshot content.
    pub fn compute_seal_candidate(&mut self) -> Result<String, DomainError> {
        let content = SealCandidateContent {
            claims: &self.tier0_claims_state,
            clusters: &self.correlation_clusters,
            regions: &self.sync_regions,
            snapshot: &self.credibility_snapshot,
            policy_hash: &self.policy_hash,
        };
        let raw = canonical_bytes(&content)?;
        self.seal_candidate_hash = sha256_trunc_hex(&raw, CONTENT_HASH_LEN);
        Ok(self.seal_candidate_hash.clone())
    }
}
