//! Credibility index over federated state.

use credmesh_domain::{
    ClaimState, ClaimStatus, CorrelationCluster, CredibilityIndex, IndexComponents, RegionStatus,
    SyncRegion,
};

use crate::engine::ComponentMetrics;

/// Compute the 0–100 credibility index from one cycle's federated state.
///
/// Six components: claim-integrity penalty, correlation penalty, quorum
/// margin compression, TTL proximity, sync-plane health, and a small
/// bonus for independent corroboration. Monotone-bounded: the score is
/// clamped to [0, 100] and rounded to one decimal.
pub fn compute_credibility_index(
    claims: &[ClaimState],
    _clusters: &[CorrelationCluster],
    sync_regions: &[SyncRegion],
    metrics: &ComponentMetrics,
) -> CredibilityIndex {
    let base = 100.0;

    let claim_penalty: f64 = claims
        .iter()
        .map(|c| match c.state {
            ClaimStatus::Unknown => 25.0,
            ClaimStatus::Degraded => 15.0,
            ClaimStatus::Verified => 0.0,
        })
        .sum();

    let corr_penalty = metrics.correlation_penalty;
    let quorum_penalty = metrics.quorum_penalty;
    let ttl_penalty = metrics.ttl_penalty;

    let sync_penalty: f64 = sync_regions
        .iter()
        .map(|r| match r.status {
            RegionStatus::Offline => 8.0,
            RegionStatus::Degraded => 3.0,
            RegionStatus::Healthy => 0.0,
        })
        .sum();

    let bonus: f64 = claims
        .iter()
        .filter(|c| c.correlation_group_actuals.len() >= 3)
        .count() as f64
        * 3.0;

    let raw =
        base - claim_penalty - corr_penalty - quorum_penalty - ttl_penalty - sync_penalty + bonus;
    let score = (raw.clamp(0.0, 100.0) * 10.0).round() / 10.0;

    CredibilityIndex {
        score,
        band: band(score).to_string(),
        components: IndexComponents {
            claim_integrity: -claim_penalty,
            correlation_risk: -corr_penalty,
            quorum_margin: -quorum_penalty,
            ttl_health: -ttl_penalty,
            sync_plane: -sync_penalty,
            confirmation_bonus: bonus,
        },
    }
}

fn band(score: f64) -> &'static str {
    if score >= 95.0 {
        "Stable"
    } else if score >= 85.0 {
        "Minor drift"
    } else if score >= 70.0 {
        "Elevated risk"
    } else if score >= 50.0 {
        "Structural degradation"
    } else {
        "Compromised"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verified_claim(groups: usize) -> ClaimState {
        ClaimState {
            state: ClaimStatus::Verified,
            correlation_group_actuals: (0..groups).map(|i| format!("G{i}")).collect(),
            margin: 2,
            ..ClaimState::default()
        }
    }

    fn healthy_region(id: &str) -> SyncRegion {
        SyncRegion {
            region_id: id.into(),
            status: RegionStatus::Healthy,
            ..SyncRegion::healthy(id)
        }
    }

    #[test]
    fn test_clean_mesh_is_stable() {
        let claims = vec![verified_claim(3)];
        let regions = vec![healthy_region("region-A"), healthy_region("region-B")];
        let index = compute_credibility_index(&claims, &[], &regions, &ComponentMetrics::default());
        assert_eq!(index.score, 100.0);
        assert_eq!(index.band, "Stable");
        assert_eq!(index.components.confirmation_bonus, 3.0);
    }

    #[test]
    fn test_unknown_claim_penalized_more_than_degraded() {
        let unknown = vec![ClaimState {
            state: ClaimStatus::Unknown,
            ..ClaimState::default()
        }];
        let degraded = vec![ClaimState {
            state: ClaimStatus::Degraded,
            ..ClaimState::default()
        }];
        let metrics = ComponentMetrics::default();
        let u = compute_credibility_index(&unknown, &[], &[], &metrics);
        let d = compute_credibility_index(&degraded, &[], &[], &metrics);
        assert!(u.score < d.score);
        assert_eq!(u.components.claim_integrity, -25.0);
        assert_eq!(d.components.claim_integrity, -15.0);
    }

    #[test]
    fn test_offline_region_penalty() {
        let claims = vec![verified_claim(2)];
        let mut offline = healthy_region("region-B");
        offline.status = RegionStatus::Offline;
        let regions = vec![healthy_region("region-A"), offline];
        let index = compute_credibility_index(&claims, &[], &regions, &ComponentMetrics::default());
        assert_eq!(index.components.sync_plane, -8.0);
        assert_eq!(index.score, 92.0);
        assert_eq!(index.band, "Minor drift");
    }

    #[test]
    fn test_score_is_bounded() {
        let claims: Vec<ClaimState> = (0..10)
            .map(|_| ClaimState {
                state: ClaimStatus::Unknown,
                ..ClaimState::default()
            })
            .collect();
        let metrics = ComponentMetrics {
            correlation_penalty: 50.0,
            quorum_penalty: 20.0,
            ttl_penalty: 15.0,
            ..ComponentMetrics::default()
        };
        let index = compute_credibility_index(&claims, &[], &[], &metrics);
        assert_eq!(index.score, 0.0);
        assert_eq!(index.band, "Compromised");
    }

    #[test]
    fn test_band_thresholds() {
        for (score, expected) in [
            (95.0, "Stable"),
            (94.9, "Minor drift"),
            (85.0, "Minor drift"),
            (84.9, "Elevated risk"),
            (70.0, "Elevated risk"),
            (69.9, "Structural degradation"),
            (50.0, "Structural degradation"),
            (49.9, "Compromised"),
        ] {
            assert_eq!(band(score), expected, "score {score}");
        }
    }
}
