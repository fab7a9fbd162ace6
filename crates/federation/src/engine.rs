//! The federated state computation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use credmesh_domain::{
    time, ClaimState, ClaimStatus, CorrelationCluster, EvidenceEnvelope, MeshPolicy, RegionStatus,
    RiskLevel, SyncRegion, ValidationRecord, Verdict,
};

use crate::correlation::build_clusters;

/// Fixed id of the single tier-0 claim.
const TIER0_CLAIM_ID: &str = "MESH-T0-001";

/// Penalty inputs the credibility index consumes, plus cycle counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ComponentMetrics {
    pub quorum_margin: u32,
    pub correlation_penalty: f64,
    pub quorum_penalty: f64,
    pub ttl_penalty: f64,
    pub online_region_count: u32,
    pub total_envelopes: u32,
    pub total_validations: u32,
    pub accept_count: u32,
}

/// Output of one federation cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FederatedState {
    pub tier0_claims: Vec<ClaimState>,
    pub correlation_clusters: Vec<CorrelationCluster>,
    pub sync_regions: Vec<SyncRegion>,
    pub component_metrics: ComponentMetrics,
}

/// Compute federated claim state from envelopes and validations.
///
/// Pure with respect to its inputs apart from TTL aging, which compares
/// envelope timestamps against the wall clock.
pub fn compute_federated_state(
    policy: &MeshPolicy,
    envelopes: &[EvidenceEnvelope],
    validations: &[ValidationRecord],
    sync_regions: &[SyncRegion],
) -> FederatedState {
    let tier0 = policy.quorum.tier0;

    // Group envelopes by correlation group and by region.
    let mut by_group: BTreeMap<String, Vec<&EvidenceEnvelope>> = BTreeMap::new();
    let mut by_region: BTreeMap<String, Vec<&EvidenceEnvelope>> = BTreeMap::new();
    for env in envelopes {
        by_group
            .entry(group_of(env).to_string())
            .or_default()
            .push(env);
        by_region
            .entry(region_of(env).to_string())
            .or_default()
            .push(env);
    }

    let mut by_envelope: BTreeMap<&str, Vec<&ValidationRecord>> = BTreeMap::new();
    for val in validations {
        by_envelope
            .entry(val.envelope_id.as_str())
            .or_default()
            .push(val);
    }

    // Mesh-wide clusters, plus an independent per-region pass: a region
    // is invalidated by correlation observed within its own envelopes.
    let clusters = build_clusters(&by_group, &policy.correlation);
    let mut invalid_regions: BTreeSet<String> = BTreeSet::new();
    for (region, region_envs) in &by_region {
        let mut region_groups: BTreeMap<String, Vec<&EvidenceEnvelope>> = BTreeMap::new();
        for env in region_envs {
            region_groups
                .entry(group_of(env).to_string())
                .or_default()
                .push(env);
        }
        let region_clusters = build_clusters(&region_groups, &policy.correlation);
        if region_clusters
            .iter()
            .any(|c| c.risk_level == RiskLevel::Invalid)
        {
            invalid_regions.insert(region.clone());
        }
    }

    // Tally accepted validations and the diversity they cover.
    let mut accept_count: u32 = 0;
    let mut accept_groups: BTreeSet<String> = BTreeSet::new();
    let mut accept_regions: BTreeSet<String> = BTreeSet::new();
    for env in envelopes {
        for val in by_envelope.get(env.envelope_id.as_str()).into_iter().flatten() {
            if val.verdict == Verdict::Accept {
                accept_count += 1;
                accept_groups.insert(group_of(env).to_string());
                accept_regions.insert(region_of(env).to_string());
            }
        }
    }

    let mut known_regions: BTreeSet<&str> = BTreeSet::new();
    let mut online_regions: BTreeSet<&str> = BTreeSet::new();
    let mut offline_regions: BTreeSet<&str> = BTreeSet::new();
    for region in sync_regions {
        known_regions.insert(region.region_id.as_str());
        if region.status == RegionStatus::Offline {
            offline_regions.insert(region.region_id.as_str());
        } else {
            online_regions.insert(region.region_id.as_str());
        }
    }

    // High-assurance mesh: every known region must participate.
    let min_regions = known_regions.len().max(2);

    // Decision table, first match wins. UNKNOWN is the safe default.
    let state = if !offline_regions.is_empty() {
        if accept_count > 0 && invalid_regions.is_empty() {
            // Honest answer to a partial quorum during partition.
            ClaimStatus::Unknown
        } else if !invalid_regions.is_empty() {
            ClaimStatus::Degraded
        } else {
            ClaimStatus::Unknown
        }
    } else if accept_count >= tier0.k_required
        && accept_groups.len() >= tier0.min_correlation_groups as usize
        && accept_regions.len() >= min_regions
        && invalid_regions.is_empty()
    {
        ClaimStatus::Verified
    } else if !invalid_regions.is_empty() {
        if accept_count >= tier0.k_required {
            ClaimStatus::Degraded
        } else {
            ClaimStatus::Unknown
        }
    } else if accept_count > 0 {
        ClaimStatus::Degraded
    } else {
        ClaimStatus::Unknown
    };

    // Nominal margin, derated by actual online-region × group coverage.
    let margin = tier0.n_total.saturating_sub(tier0.k_required);
    let effective_n = online_regions.len() as u32 * (accept_groups.len() as u32).max(1);
    let effective_margin = effective_n.saturating_sub(tier0.k_required);
    let margin = margin.min(effective_margin);

    let claim = ClaimState {
        claim_id: TIER0_CLAIM_ID.to_string(),
        state,
        k_required: tier0.k_required,
        n_total: tier0.n_total,
        margin,
        correlation_groups_required: tier0.min_correlation_groups,
        correlation_group_actuals: accept_groups.iter().cloned().collect(),
        ttl_remaining_seconds: min_ttl(envelopes, policy),
        accept_count,
        accept_regions: accept_regions.iter().cloned().collect(),
        invalid_regions: invalid_regions.iter().cloned().collect(),
    };

    debug!(
        state = ?claim.state,
        accept_count,
        groups = claim.correlation_group_actuals.len(),
        regions = claim.accept_regions.len(),
        offline = offline_regions.len(),
        "federated claim computed"
    );

    let updated_regions = update_sync_regions(sync_regions, &by_region);

    let component_metrics = ComponentMetrics {
        quorum_margin: claim.margin,
        correlation_penalty: correlation_penalty(&clusters),
        quorum_penalty: quorum_penalty(&claim),
        ttl_penalty: ttl_penalty(&claim),
        online_region_count: online_regions.len() as u32,
        total_envelopes: envelopes.len() as u32,
        total_validations: validations.len() as u32,
        accept_count,
    };

    FederatedState {
        tier0_claims: vec![claim],
        correlation_clusters: clusters,
        sync_regions: updated_regions,
        component_metrics,
    }
}

/// Minimum remaining TTL across envelopes, aged against the wall clock.
fn min_ttl(envelopes: &[EvidenceEnvelope], policy: &MeshPolicy) -> f64 {
    let tier0_ttl = policy.ttl.tier0_seconds as f64;
    if envelopes.is_empty() {
        return 0.0;
    }
    let mut min_remaining = tier0_ttl;
    for env in envelopes {
        if let Some(age) = time::age_seconds(&env.timestamp) {
            min_remaining = min_remaining.min(tier0_ttl - age);
        }
    }
    min_remaining.max(0.0)
}

/// Region status update: activity this cycle means healthy, silence
/// means degraded; offline is sticky until cleared by its own peer.
fn update_sync_regions(
    sync_regions: &[SyncRegion],
    by_region: &BTreeMap<String, Vec<&EvidenceEnvelope>>,
) -> Vec<SyncRegion> {
    sync_regions
        .iter()
        .map(|region| {
            let mut updated = region.clone();
            if region.status == RegionStatus::Offline {
                return updated;
            }
            match by_region.get(&region.region_id) {
                Some(envs) if !envs.is_empty() => {
                    updated.online_count = envs.len() as u32;
                    updated.last_heartbeat = envs
                        .iter()
                        .map(|e| e.timestamp.as_str())
                        .max()
                        .unwrap_or("")
                        .to_string();
                    updated.status = RegionStatus::Healthy;
                }
                _ => updated.status = RegionStatus::Degraded,
            }
            updated
        })
        .collect()
}

fn correlation_penalty(clusters: &[CorrelationCluster]) -> f64 {
    let penalty: f64 = clusters
        .iter()
        .map(|c| match c.risk_level {
            RiskLevel::Invalid => 15.0 * c.coefficient,
            RiskLevel::Review => 5.0 * c.coefficient,
            RiskLevel::Low => 0.0,
        })
        .sum();
    (penalty * 100.0).round() / 100.0
}

fn quorum_penalty(claim: &ClaimState) -> f64 {
    match claim.margin {
        0 => 20.0,
        1 => 10.0,
        _ => 0.0,
    }
}

fn ttl_penalty(claim: &ClaimState) -> f64 {
    let ttl = claim.ttl_remaining_seconds;
    if ttl <= 0.0 {
        15.0
    } else if ttl <= 120.0 {
        8.0
    } else if ttl <= 300.0 {
        3.0
    } else {
        0.0
    }
}

fn group_of(env: &EvidenceEnvelope) -> &str {
    if env.correlation_group.is_empty() {
        "unknown"
    } else {
        &env.correlation_group
    }
}

fn region_of(env: &EvidenceEnvelope) -> &str {
    if env.region_id.is_empty() {
        "unknown"
    } else {
        &env.region_id
    }
}
