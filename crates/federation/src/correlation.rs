//! Correlation clusters over envelope payload values.

use std::collections::BTreeMap;

use serde_json::Value;

use credmesh_domain::{CorrelationCluster, CorrelationPolicy, EvidenceEnvelope, RiskLevel};

/// Members listed per cluster, capped for record size.
const MEMBER_CAP: usize = 10;

/// Correlation coefficient from a group's payload values.
///
/// `max(0, 1 - cv)` over the coefficient of variation: near-identical
/// values give a coefficient near 1 (shared-source risk), widely spread
/// values give 0. Fewer than 3 samples, or a zero mean, yield 0: no
/// risk signal from an insufficient sample.
///
/// This is a compatibility heuristic inherited from the record format,
/// not a statistical correlation measure; thresholds elsewhere assume
/// exactly this mapping.
pub fn correlation_coefficient(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let cv = variance.sqrt() / mean.abs();
    round4((1.0 - cv).max(0.0))
}

/// Classify a coefficient against the policy thresholds.
pub fn classify(coefficient: f64, policy: &CorrelationPolicy) -> RiskLevel {
    if coefficient >= policy.invalid_threshold {
        RiskLevel::Invalid
    } else if coefficient >= policy.review_threshold {
        RiskLevel::Review
    } else {
        RiskLevel::Low
    }
}

/// Build correlation clusters from envelopes grouped by correlation
/// group, in sorted group order.
pub fn build_clusters(
    by_group: &BTreeMap<String, Vec<&EvidenceEnvelope>>,
    policy: &CorrelationPolicy,
) -> Vec<CorrelationCluster> {
    by_group
        .iter()
        .map(|(group, envelopes)| {
            let values: Vec<f64> = envelopes.iter().map(|e| payload_value(e)).collect();
            let coefficient = correlation_coefficient(&values);
            CorrelationCluster {
                cluster_id: format!("CORR-{group}"),
                region_id: envelopes
                    .first()
                    .map(|e| e.region_id.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                coefficient,
                risk_level: classify(coefficient, policy),
                members: envelopes
                    .iter()
                    .take(MEMBER_CAP)
                    .map(|e| e.envelope_id.clone())
                    .collect(),
            }
        })
        .collect()
}

/// Numeric `value` field of an envelope payload, 0 when absent.
pub(crate) fn payload_value(envelope: &EvidenceEnvelope) -> f64 {
    envelope
        .payload
        .get("value")
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use credmesh_domain::PayloadMap;
    use serde_json::json;

    fn envelope(group: &str, region: &str, value: f64) -> EvidenceEnvelope {
        let mut payload = PayloadMap::new();
        payload.insert("value".into(), json!(value));
        let mut env = EvidenceEnvelope::new("t", "p", region, group, payload);
        env.payload_hash = "x".into();
        env
    }

    #[test]
    fn test_insufficient_sample_is_zero() {
        assert_eq!(correlation_coefficient(&[]), 0.0);
        assert_eq!(correlation_coefficient(&[95.0, 95.0]), 0.0);
    }

    #[test]
    fn test_identical_values_max_correlation() {
        assert_eq!(correlation_coefficient(&[95.0, 95.0, 95.0]), 1.0);
    }

    #[test]
    fn test_spread_values_low_correlation() {
        let coeff = correlation_coefficient(&[10.0, 50.0, 100.0]);
        assert!(coeff < 0.7, "spread values should stay below review: {coeff}");
    }

    #[test]
    fn test_zero_mean_is_zero() {
        assert_eq!(correlation_coefficient(&[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_classification_thresholds() {
        let policy = CorrelationPolicy {
            review_threshold: 0.7,
            invalid_threshold: 0.9,
        };
        assert_eq!(classify(0.5, &policy), RiskLevel::Low);
        assert_eq!(classify(0.7, &policy), RiskLevel::Review);
        assert_eq!(classify(0.9, &policy), RiskLevel::Invalid);
        assert_eq!(classify(1.0, &policy), RiskLevel::Invalid);
    }

    #[test]
    fn test_build_clusters_near_identical_values_invalid() {
        let envs = vec![
            envelope("G1", "region-A", 95.0),
            envelope("G1", "region-A", 95.0),
            envelope("G1", "region-A", 95.0),
        ];
        let mut by_group: BTreeMap<String, Vec<&EvidenceEnvelope>> = BTreeMap::new();
        by_group.insert("G1".into(), envs.iter().collect());

        let clusters = build_clusters(
            &by_group,
            &CorrelationPolicy {
                review_threshold: 0.7,
                invalid_threshold: 0.9,
            },
        );
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].cluster_id, "CORR-G1");
        assert_eq!(clusters[0].risk_level, RiskLevel::Invalid);
        assert_eq!(clusters[0].members.len(), 3);
    }

    #[test]
    fn test_member_cap() {
        let envs: Vec<EvidenceEnvelope> = (0..15)
            .map(|i| envelope("G1", "region-A", 20.0 + i as f64 * 7.0))
            .collect();
        let mut by_group: BTreeMap<String, Vec<&EvidenceEnvelope>> = BTreeMap::new();
        by_group.insert("G1".into(), envs.iter().collect());

        let clusters = build_clusters(
            &by_group,
            &CorrelationPolicy {
                review_threshold: 0.7,
                invalid_threshold: 0.9,
            },
        );
        assert_eq!(clusters[0].members.len(), 10);
    }
}
