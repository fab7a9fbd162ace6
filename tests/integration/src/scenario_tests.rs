//! Mesh scenario phases: healthy, partition, correlated failure,
//! recovery.

use serde_json::Value;

use credmesh_crypto::{generate_keypair, CryptoBackend};
use credmesh_domain::{ClaimStatus, EvidenceEnvelope, NodeRole, PayloadMap, TickAction};
use credmesh_store::LogName;

use crate::test_utils::{TestMesh, TENANT};

fn crafted_envelope(producer: &str, region: &str, group: &str, value: i64) -> Value {
    let kp = generate_keypair(CryptoBackend::Ed25519);
    let mut payload = PayloadMap::new();
    payload.insert("value".into(), Value::from(value));
    payload.insert("confidence".into(), Value::from(0.9));
    let envelope =
        EvidenceEnvelope::signed(TENANT, producer, region, group, payload, &kp).unwrap();
    serde_json::to_value(&envelope).unwrap()
}

#[test]
fn test_healthy_mesh_cycle_produces_aggregate_and_seal() {
    let mut mesh = TestMesh::standard_topology();
    let outcomes = mesh.run_cycle();

    assert_eq!(outcomes.len(), 7);
    assert!(TestMesh::claim_state(&outcomes).is_some());

    // One more cycle so the seal authority sees an aggregate.
    let outcomes = mesh.run_cycle();
    let sealed = outcomes
        .iter()
        .any(|o| matches!(o.action, TickAction::Seal { .. }));
    assert!(sealed, "seal authority should chain once aggregates exist");
}

#[test]
fn test_spread_multi_region_evidence_verifies() {
    // Deterministic inputs: one widely-spread envelope per region in
    // distinct correlation groups, validated by two validators.
    let mut mesh = TestMesh::new();
    mesh.add_node(
        "validator-B",
        "region-B",
        NodeRole::Validator,
        vec!["edge-A".into(), "edge-B".into(), "edge-C".into()],
    );
    mesh.add_node(
        "validator-C",
        "region-C",
        NodeRole::Validator,
        vec!["edge-A".into(), "edge-B".into(), "edge-C".into()],
    );
    mesh.add_node(
        "aggregator-A",
        "region-A",
        NodeRole::Aggregator,
        vec![
            "edge-A".into(),
            "edge-B".into(),
            "edge-C".into(),
            "validator-B".into(),
            "validator-C".into(),
        ],
    );

    for (producer, region, group, value) in [
        ("edge-A", "region-A", "G1", 30),
        ("edge-B", "region-B", "G2", 70),
        ("edge-C", "region-C", "G3", 50),
    ] {
        mesh.store
            .append(
                TENANT,
                producer,
                LogName::Envelopes,
                &crafted_envelope(producer, region, group, value),
            )
            .unwrap();
    }

    let outcomes = mesh.run_cycle();
    // Both validators accept all three envelopes: 6 accepts across 3
    // groups and 3 regions, no offline region, no correlated cluster.
    assert_eq!(
        TestMesh::claim_state(&outcomes),
        Some(ClaimStatus::Verified)
    );

    let aggregates = mesh
        .store
        .load_all(TENANT, "aggregator-A", LogName::Aggregates)
        .unwrap();
    let claim = &aggregates[0]["tier0_claims_state"][0];
    assert_eq!(claim["state"], "VERIFIED");
    assert_eq!(claim["accept_count"], 6);
    assert_eq!(
        claim["accept_regions"],
        serde_json::json!(["region-A", "region-B", "region-C"])
    );
}

#[test]
fn test_partition_phase_never_verifies() {
    let mut mesh = TestMesh::standard_topology();

    // Healthy warm-up so region B is known to the mesh.
    mesh.run_cycle();

    // Partition: all of region B drops off.
    mesh.node_mut("edge-B").set_offline(true).unwrap();
    mesh.node_mut("validator-B").set_offline(true).unwrap();

    for cycle in 0..3 {
        let outcomes = mesh.run_cycle();
        let state = TestMesh::claim_state(&outcomes).expect("aggregate ran");
        assert_ne!(
            state,
            ClaimStatus::Verified,
            "cycle {cycle}: claim must not verify during a partition"
        );

        // Offline nodes report skips.
        let skips = outcomes
            .iter()
            .filter(|o| {
                matches!(&o.action, TickAction::Skip { reason } if reason == "offline")
            })
            .count();
        assert_eq!(skips, 2);
    }

    // The snapshot itself records region B as offline.
    let aggregates = mesh
        .store
        .load_all(TENANT, "aggregator-A", LogName::Aggregates)
        .unwrap();
    let last = aggregates.last().unwrap();
    let region_b = last["sync_regions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["region_id"] == "region-B")
        .expect("region B known");
    assert_eq!(region_b["status"], "offline");
}

#[test]
fn test_recovery_clears_offline_region() {
    let mut mesh = TestMesh::standard_topology();
    mesh.run_cycle();

    mesh.node_mut("edge-B").set_offline(true).unwrap();
    mesh.node_mut("validator-B").set_offline(true).unwrap();
    mesh.run_cycle();

    // Recovery phase: region B rejoins.
    mesh.node_mut("edge-B").set_offline(false).unwrap();
    mesh.node_mut("validator-B").set_offline(false).unwrap();
    let outcomes = mesh.run_cycle();

    assert!(TestMesh::claim_state(&outcomes).is_some());
    let aggregates = mesh
        .store
        .load_all(TENANT, "aggregator-A", LogName::Aggregates)
        .unwrap();
    let last = aggregates.last().unwrap();
    let offline_regions: Vec<&Value> = last["sync_regions"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["status"] == "offline")
        .collect();
    assert!(
        offline_regions.is_empty(),
        "no region should stay offline after recovery: {offline_regions:?}"
    );
}

#[test]
fn test_forced_correlation_detected_and_penalized() {
    // A single edge bursting near-identical values into one group.
    let mut mesh = TestMesh::new();
    mesh.add_node("edge-C", "region-C", NodeRole::Edge, vec![]);
    mesh.add_node(
        "validator-C",
        "region-C",
        NodeRole::Validator,
        vec!["edge-C".into()],
    );
    mesh.add_node(
        "aggregator-A",
        "region-A",
        NodeRole::Aggregator,
        vec!["edge-C".into(), "validator-C".into()],
    );
    mesh.node_mut("edge-C").set_force_correlation(Some(0.95));

    let outcomes = mesh.run_cycle();
    let state = TestMesh::claim_state(&outcomes).unwrap();
    assert_ne!(state, ClaimStatus::Verified);

    let aggregates = mesh
        .store
        .load_all(TENANT, "aggregator-A", LogName::Aggregates)
        .unwrap();
    let snapshot = aggregates.last().unwrap();
    let cluster = snapshot["correlation_clusters"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["cluster_id"] == "CORR-G1")
        .expect("forced group clustered");
    assert_eq!(cluster["risk_level"], "invalid");
    assert_eq!(cluster["coefficient"], 1.0);

    // Correlation penalty shows up in the credibility snapshot.
    let correlation_risk =
        snapshot["credibility_snapshot"]["components"]["correlation_risk"]
            .as_f64()
            .unwrap();
    assert!(correlation_risk < 0.0);
}

#[test]
fn test_tampered_envelope_rejected_end_to_end() {
    let mut mesh = TestMesh::new();
    mesh.add_node(
        "validator-B",
        "region-B",
        NodeRole::Validator,
        vec!["edge-A".into()],
    );

    let mut record = crafted_envelope("edge-A", "region-A", "G1", 42);
    record["payload"]["value"] = Value::from(1_000_000);
    mesh.store
        .append(TENANT, "edge-A", LogName::Envelopes, &record)
        .unwrap();

    let outcomes = mesh.run_cycle();
    assert_eq!(
        outcomes[0].action,
        TickAction::ValidateEnvelopes {
            accepted: 0,
            rejected: 1
        }
    );
    let validations = mesh
        .store
        .load_all(TENANT, "validator-B", LogName::Validations)
        .unwrap();
    assert_eq!(validations[0]["verdict"], "REJECT");
}

#[test]
fn test_replication_events_logged_across_mesh() {
    let mut mesh = TestMesh::standard_topology();
    mesh.run_cycle();

    let events = mesh
        .store
        .load_all(TENANT, "edge-A", LogName::Replication)
        .unwrap();
    // One push event per peer for the edge's envelope.
    assert_eq!(events.len(), 6);
    assert!(events.iter().all(|e| e["direction"] == "push"));
}
