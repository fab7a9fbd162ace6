//! Derived mesh state: claim verdicts, correlation clusters, and
//! sync-region health.
//!
//! None of these carry signatures; they are recomputed from scratch
//! every aggregation cycle and their authority comes from the signed
//! aggregation snapshot that embeds them.

use serde::{Deserialize, Serialize};

/// Mesh verdict for a logical claim.
///
/// `Unknown` is the safe default: the mesh prefers an honest UNKNOWN
/// over an optimistic wrong VERIFIED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClaimStatus {
    #[default]
    Unknown,
    Degraded,
    Verified,
}

/// Claim state for one tier-0 claim, recomputed each cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimState {
    #[serde(default)]
    pub claim_id: String,
    #[serde(default)]
    pub state: ClaimStatus,
    #[serde(default)]
    pub k_required: u32,
    #[serde(default)]
    pub n_total: u32,
    #[serde(default)]
    pub margin: u32,
    #[serde(default)]
    pub correlation_groups_required: u32,
    /// Distinct correlation groups with at least one ACCEPT, sorted
    #[serde(default)]
    pub correlation_group_actuals: Vec<String>,
    #[serde(default)]
    pub ttl_remaining_seconds: f64,
    #[serde(default)]
    pub accept_count: u32,
    /// Regions contributing accepted evidence, sorted
    #[serde(default)]
    pub accept_regions: Vec<String>,
    /// Regions containing an invalid-correlation cluster, sorted
    #[serde(default)]
    pub invalid_regions: Vec<String>,
}

impl Default for ClaimState {
    fn default() -> Self {
        Self {
            claim_id: String::new(),
            state: ClaimStatus::Unknown,
            k_required: 3,
            n_total: 5,
            margin: 2,
            correlation_groups_required: 2,
            correlation_group_actuals: Vec::new(),
            ttl_remaining_seconds: 900.0,
            accept_count: 0,
            accept_regions: Vec::new(),
            invalid_regions: Vec::new(),
        }
    }
}

/// Risk classification of a correlation cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Review,
    Invalid,
}

/// Per-correlation-group coefficient and risk classification.
///
/// High coefficient means the group's payload values are suspiciously
/// similar, which is a shared-source signal, not corroboration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrelationCluster {
    /// `CORR-<group>`
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub region_id: String,
    /// In [0, 1], rounded to 4 decimal places
    #[serde(default)]
    pub coefficient: f64,
    #[serde(default)]
    pub risk_level: RiskLevel,
    /// First 10 member envelope ids
    #[serde(default)]
    pub members: Vec<String>,
}

/// Replication health of one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegionStatus {
    #[default]
    Healthy,
    Degraded,
    Offline,
}

/// Per-region replication health.
///
/// `Offline`, once observed from a peer's own self-report, is sticky:
/// the aggregation cycle never upgrades it; only an explicit clear
/// (the peer reporting itself back online) does.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncRegion {
    #[serde(default)]
    pub region_id: String,
    #[serde(default)]
    pub node_count: u32,
    #[serde(default)]
    pub online_count: u32,
    #[serde(default)]
    pub last_heartbeat: String,
    #[serde(default)]
    pub status: RegionStatus,
}

impl SyncRegion {
    /// A fresh healthy region with no observed activity.
    pub fn healthy(region_id: impl Into<String>) -> Self {
        Self {
            region_id: region_id.into(),
            node_count: 0,
            online_count: 0,
            last_heartbeat: String::new(),
            status: RegionStatus::Healthy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ClaimStatus::Verified).unwrap(),
            "\"VERIFIED\""
        );
        assert_eq!(
            serde_json::to_string(&ClaimStatus::Unknown).unwrap(),
            "\"UNKNOWN\""
        );
    }

    #[test]
    fn test_default_claim_is_unknown() {
        let claim = ClaimState::default();
        assert_eq!(claim.state, ClaimStatus::Unknown);
        assert_eq!(claim.k_required, 3);
    }

    #[test]
    fn test_risk_and_region_status_lowercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::Invalid).unwrap(), "\"invalid\"");
        assert_eq!(
            serde_json::to_string(&RegionStatus::Offline).unwrap(),
            "\"offline\""
        );
    }
}
