//! The MeshNode actor and its per-role tick behaviors.

use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use tracing::{debug, info, warn};

use credmesh_crypto::{generate_keypair, CryptoBackend, Keypair};
use credmesh_domain::{
    time, AggregationRecord, EvidenceEnvelope, MeshPolicy, NodeRole, NodeStatus, PayloadMap,
    RegionStatus, ReplicationEvent, SealChainEntry, SyncRegion, TickAction, TickOutcome,
    ValidationRecord, Verdict, GENESIS_SEAL,
};
use credmesh_federation::{compute_credibility_index, compute_federated_state};
use credmesh_store::{dedupe_by_id, LogName, LogStore};
use credmesh_transport::Transport;

use crate::NodeError;

/// Correlation groups an edge node samples from.
const EDGE_GROUPS: [&str; 3] = ["G1", "G2", "G3"];

/// Envelope burst size under forced correlation.
const FORCED_BURST: u32 = 3;

/// Validations replicated back to peers per validator tick.
const VALIDATION_PUSH_WINDOW: usize = 10;

/// Static identity and topology of one node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub node_id: String,
    pub tenant_id: String,
    pub region_id: String,
    pub role: NodeRole,
    pub peers: Vec<String>,
}

/// A mesh node with a specific role.
///
/// Construction requires an explicit transport and store; there is no
/// ambient default. The node owns its keypair and is the sole writer
/// of its own logs.
pub struct MeshNode {
    config: NodeConfig,
    keypair: Keypair,
    policy: MeshPolicy,
    transport: Arc<dyn Transport>,
    store: Arc<LogStore>,
    cycle_count: u64,
    offline: bool,
    /// Test hook: above 0.8, edges emit a correlated burst
    force_correlation: Option<f64>,
}

impl MeshNode {
    /// Create a node, generate its keypair, and publish an
    /// `initialized` status.
    pub fn new(
        config: NodeConfig,
        transport: Arc<dyn Transport>,
        store: Arc<LogStore>,
        policy: MeshPolicy,
        backend: CryptoBackend,
    ) -> Result<Self, NodeError> {
        let node = Self {
            config,
            keypair: generate_keypair(backend),
            policy,
            transport,
            store,
            cycle_count: 0,
            offline: false,
            force_correlation: None,
        };
        node.update_status("initialized", None)?;
        Ok(node)
    }

    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    pub fn region_id(&self) -> &str {
        &self.config.region_id
    }

    pub fn role(&self) -> NodeRole {
        self.config.role
    }

    pub fn public_key(&self) -> &str {
        &self.keypair.public_key
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Scenario control: take the node off the mesh (ticks become
    /// no-ops) or bring it back.
    pub fn set_offline(&mut self, offline: bool) -> Result<(), NodeError> {
        self.offline = offline;
        self.update_status(if offline { "offline" } else { "active" }, None)
    }

    /// Scenario control: force a correlated evidence burst (edge role).
    pub fn set_force_correlation(&mut self, coefficient: Option<f64>) {
        self.force_correlation = coefficient;
    }

    /// Execute one cycle of the node's role behavior.
    ///
    /// An offline node reports a skip instead of acting. A failed push
    /// or pull against a single peer is logged and skipped, never
    /// aborting the tick; only local storage failures do.
    pub fn tick(&mut self) -> Result<TickOutcome, NodeError> {
        if self.offline {
            self.update_status("offline", None)?;
            return Ok(self.outcome(TickAction::Skip {
                reason: "offline".to_string(),
            }));
        }

        self.cycle_count += 1;
        let action = match self.config.role {
            NodeRole::Edge => self.tick_edge()?,
            NodeRole::Validator => self.tick_validator()?,
            NodeRole::Aggregator => self.tick_aggregator()?,
            NodeRole::SealAuthority => self.tick_seal_authority()?,
        };

        self.update_status("active", Some(action.label()))?;
        Ok(self.outcome(action))
    }

    // -------------------------------------------------------------------
    // Edge: generate envelopes
    // -------------------------------------------------------------------

    fn tick_edge(&mut self) -> Result<TickAction, NodeError> {
        let forced = self.force_correlation.is_some_and(|c| c > 0.8);
        let burst = if forced { FORCED_BURST } else { 1 };

        let mut last_envelope_id = String::new();
        let mut last_group = String::new();

        for _ in 0..burst {
            let (group, value, confidence) = if forced {
                // Single group, tight values: simulates every signal
                // coming from one shared origin.
                ("G1".to_string(), 95i64, 0.98)
            } else {
                let mut rng = rand::thread_rng();
                let group = EDGE_GROUPS
                    .choose(&mut rng)
                    .map(|g| g.to_string())
                    .unwrap_or_else(|| "G1".to_string());
                let value = rng.gen_range(20..=100i64);
                let confidence = (rng.gen_range(0.5..1.0f64) * 1000.0).round() / 1000.0;
                (group, value, confidence)
            };

            let mut payload = PayloadMap::new();
            payload.insert("value".into(), Value::from(value));
            payload.insert("confidence".into(), Value::from(confidence));
            payload.insert(
                "source".into(),
                Value::from(format!("edge-{}", self.config.node_id)),
            );

            let envelope = EvidenceEnvelope::signed(
                &self.config.tenant_id,
                &self.config.node_id,
                &self.config.region_id,
                &group,
                payload,
                &self.keypair,
            )?;
            let record = serde_json::to_value(&envelope)?;

            self.append_own(LogName::Envelopes, &record)?;
            for peer_id in &self.config.peers {
                self.push_to_peer(peer_id, LogName::Envelopes, std::slice::from_ref(&record));
            }

            last_envelope_id = envelope.envelope_id;
            last_group = group;
        }

        for peer_id in self.config.peers.clone() {
            self.log_replication(&peer_id, LogName::Envelopes, burst)?;
        }

        debug!(
            node_id = %self.config.node_id,
            envelope_id = %last_envelope_id,
            burst,
            forced,
            "edge produced evidence"
        );
        Ok(TickAction::GenerateEnvelope {
            envelope_id: last_envelope_id,
            envelope_count: burst,
            region: self.config.region_id.clone(),
            group: last_group,
            replicated_to: self.config.peers.len() as u32,
        })
    }

    // -------------------------------------------------------------------
    // Validator: verify and judge envelopes
    // -------------------------------------------------------------------

    fn tick_validator(&mut self) -> Result<TickAction, NodeError> {
        let mut accepted: u32 = 0;
        let mut rejected: u32 = 0;

        // Ids this node already judged; makes re-pulls idempotent.
        let mut validated_ids: HashSet<String> = self
            .store
            .load_all(&self.config.tenant_id, &self.config.node_id, LogName::Validations)?
            .iter()
            .filter_map(|v| v.get("envelope_id").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        for peer_id in self.config.peers.clone() {
            let records = match self.transport.pull(
                &self.config.tenant_id,
                &peer_id,
                LogName::Envelopes,
                "",
            ) {
                Ok(records) => records,
                Err(err) => {
                    warn!(%peer_id, %err, "pull failed, skipping peer this tick");
                    continue;
                }
            };

            for record in records {
                let envelope: EvidenceEnvelope = match serde_json::from_value(record) {
                    Ok(env) => env,
                    Err(_) => continue,
                };
                if envelope.envelope_id.is_empty()
                    || validated_ids.contains(&envelope.envelope_id)
                {
                    continue;
                }

                let mut verdict = Verdict::Accept;
                let mut reasons = Vec::new();
                if !envelope.verify_signature() {
                    verdict = Verdict::Reject;
                    reasons.push("signature_invalid".to_string());
                }
                let hash_ok = envelope
                    .recompute_payload_hash()
                    .map(|h| h == envelope.payload_hash)
                    .unwrap_or(false);
                if !hash_ok {
                    verdict = Verdict::Reject;
                    reasons.push("payload_hash_mismatch".to_string());
                }

                let validation = ValidationRecord::signed(
                    &self.config.tenant_id,
                    &self.config.node_id,
                    &self.config.region_id,
                    &envelope.envelope_id,
                    verdict,
                    reasons,
                    &self.keypair,
                )?;
                self.append_own(LogName::Validations, &serde_json::to_value(&validation)?)?;
                validated_ids.insert(envelope.envelope_id);

                if verdict == Verdict::Accept {
                    accepted += 1;
                } else {
                    rejected += 1;
                }
            }
        }

        // Replicate the latest validation window back to peers.
        let own_validations = self.store.load_last_n(
            &self.config.tenant_id,
            &self.config.node_id,
            LogName::Validations,
            VALIDATION_PUSH_WINDOW,
        )?;
        if !own_validations.is_empty() {
            for peer_id in self.config.peers.clone() {
                self.push_to_peer(&peer_id, LogName::Validations, &own_validations);
                self.log_replication(&peer_id, LogName::Validations, own_validations.len() as u32)?;
            }
        }

        Ok(TickAction::ValidateEnvelopes { accepted, rejected })
    }

    // -------------------------------------------------------------------
    // Aggregator: compute federated state
    // -------------------------------------------------------------------

    fn tick_aggregator(&mut self) -> Result<TickAction, NodeError> {
        let mut envelope_records = Vec::new();
        let mut validation_records = Vec::new();

        for peer_id in self.config.peers.clone() {
            match self
                .transport
                .pull(&self.config.tenant_id, &peer_id, LogName::Envelopes, "")
            {
                Ok(mut records) => envelope_records.append(&mut records),
                Err(err) => warn!(%peer_id, %err, "envelope pull failed"),
            }
            match self
                .transport
                .pull(&self.config.tenant_id, &peer_id, LogName::Validations, "")
            {
                Ok(mut records) => validation_records.append(&mut records),
                Err(err) => warn!(%peer_id, %err, "validation pull failed"),
            }
        }
        envelope_records.extend(self.store.load_all(
            &self.config.tenant_id,
            &self.config.node_id,
            LogName::Envelopes,
        )?);
        validation_records.extend(self.store.load_all(
            &self.config.tenant_id,
            &self.config.node_id,
            LogName::Validations,
        )?);

        let envelope_records = dedupe_by_id(envelope_records, "envelope_id");
        let validation_records = dedupe_by_id(validation_records, "validation_id");

        let envelopes: Vec<EvidenceEnvelope> = envelope_records
            .iter()
            .filter_map(|r| serde_json::from_value(r.clone()).ok())
            .collect();
        let validations: Vec<ValidationRecord> = validation_records
            .iter()
            .filter_map(|r| serde_json::from_value(r.clone()).ok())
            .collect();

        let policy_hash = self.policy.policy_hash()?;
        let sync_regions = self.build_sync_regions(&envelopes);

        let fed_state =
            compute_federated_state(&self.policy, &envelopes, &validations, &sync_regions);
        let index = compute_credibility_index(
            &fed_state.tier0_claims,
            &fed_state.correlation_clusters,
            &fed_state.sync_regions,
            &fed_state.component_metrics,
        );

        let claim_state = fed_state
            .tier0_claims
            .first()
            .map(|c| c.state)
            .unwrap_or_default();
        let index_score = index.score;
        let index_band = index.band.clone();

        let mut aggregate = AggregationRecord::new(
            &self.config.tenant_id,
            &self.config.node_id,
            envelopes.first().map(|e| e.timestamp.as_str()).unwrap_or(""),
            envelopes.last().map(|e| e.timestamp.as_str()).unwrap_or(""),
            fed_state.tier0_claims,
            fed_state.correlation_clusters,
            fed_state.sync_regions,
            index,
            policy_hash,
        );
        aggregate.compute_seal_candidate()?;
        let record = serde_json::to_value(&aggregate)?;

        self.append_own(LogName::Aggregates, &record)?;
        for peer_id in self.config.peers.clone() {
            self.push_to_peer(&peer_id, LogName::Aggregates, std::slice::from_ref(&record));
            self.log_replication(&peer_id, LogName::Aggregates, 1)?;
        }

        info!(
            node_id = %self.config.node_id,
            aggregate_id = %aggregate.aggregate_id,
            ?claim_state,
            index_score,
            "aggregation cycle complete"
        );
        Ok(TickAction::Aggregate {
            aggregate_id: aggregate.aggregate_id,
            index_score,
            index_band,
            claim_state,
            envelopes_processed: envelopes.len() as u32,
            validations_processed: validations.len() as u32,
        })
    }

    /// Sync regions from envelope activity plus peer self-reports.
    ///
    /// A peer reporting itself offline marks its whole region offline,
    /// sticky until the peer reports otherwise.
    fn build_sync_regions(&self, envelopes: &[EvidenceEnvelope]) -> Vec<SyncRegion> {
        let mut regions: Vec<SyncRegion> = Vec::new();

        for envelope in envelopes {
            let region_id = if envelope.region_id.is_empty() {
                "unknown"
            } else {
                &envelope.region_id
            };
            let idx = match regions.iter().position(|r| r.region_id == region_id) {
                Some(idx) => idx,
                None => {
                    regions.push(SyncRegion::healthy(region_id));
                    regions.len() - 1
                }
            };
            let region = &mut regions[idx];
            region.node_count += 1;
            region.online_count += 1;
            if envelope.timestamp > region.last_heartbeat {
                region.last_heartbeat = envelope.timestamp.clone();
            }
        }

        for peer_id in &self.config.peers {
            let Some(status) = self.transport.get_status(&self.config.tenant_id, peer_id) else {
                continue;
            };
            if !status.get("offline").and_then(Value::as_bool).unwrap_or(false) {
                continue;
            }
            let region_id = status
                .get("region_id")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            match regions.iter().position(|r| r.region_id == region_id) {
                Some(idx) => regions[idx].status = RegionStatus::Offline,
                None => regions.push(SyncRegion {
                    region_id: region_id.to_string(),
                    node_count: 1,
                    online_count: 0,
                    last_heartbeat: String::new(),
                    status: RegionStatus::Offline,
                }),
            }
        }

        regions
    }

    // -------------------------------------------------------------------
    // Seal authority: extend the hash chain
    // -------------------------------------------------------------------

    fn tick_seal_authority(&mut self) -> Result<TickAction, NodeError> {
        let mut aggregate_records = Vec::new();
        for peer_id in self.config.peers.clone() {
            match self
                .transport
                .pull(&self.config.tenant_id, &peer_id, LogName::Aggregates, "")
            {
                Ok(mut records) => aggregate_records.append(&mut records),
                Err(err) => warn!(%peer_id, %err, "aggregate pull failed"),
            }
        }
        aggregate_records.extend(self.store.load_all(
            &self.config.tenant_id,
            &self.config.node_id,
            LogName::Aggregates,
        )?);
        let aggregate_records = dedupe_by_id(aggregate_records, "aggregate_id");

        let aggregates: Vec<AggregationRecord> = aggregate_records
            .iter()
            .filter_map(|r| serde_json::from_value(r.clone()).ok())
            .collect();
        let Some(latest) = aggregates.iter().max_by(|a, b| a.timestamp.cmp(&b.timestamp))
        else {
            return Ok(TickAction::SealSkip {
                reason: "no_aggregates".to_string(),
            });
        };
        if latest.seal_candidate_hash.is_empty() {
            return Ok(TickAction::SealSkip {
                reason: "missing_snapshot_hash".to_string(),
            });
        }

        let prev_seal_hash = self
            .store
            .load_last_n(
                &self.config.tenant_id,
                &self.config.node_id,
                LogName::SealChainMirror,
                1,
            )?
            .last()
            .and_then(|s| s.get("seal_hash").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| GENESIS_SEAL.to_string());

        let entry = SealChainEntry::next(
            &self.config.tenant_id,
            &latest.aggregate_id,
            &self.config.node_id,
            prev_seal_hash,
            self.policy.policy_hash()?,
            &latest.seal_candidate_hash,
            latest.credibility_snapshot.score,
            &latest.credibility_snapshot.band,
        )?;
        let record = serde_json::to_value(&entry)?;

        self.append_own(LogName::SealChainMirror, &record)?;
        for peer_id in self.config.peers.clone() {
            self.push_to_peer(&peer_id, LogName::SealChainMirror, std::slice::from_ref(&record));
            self.log_replication(&peer_id, LogName::SealChainMirror, 1)?;
        }

        info!(
            node_id = %self.config.node_id,
            seal_hash = %entry.seal_hash,
            aggregate_id = %entry.aggregate_id,
            "seal appended"
        );
        Ok(TickAction::Seal {
            seal_hash: entry.seal_hash,
            prev_seal_hash: entry.prev_seal_hash,
            aggregate_id: entry.aggregate_id,
            index_score: entry.index_score,
        })
    }

    // -------------------------------------------------------------------
    // Shared plumbing
    // -------------------------------------------------------------------

    fn append_own(&self, log: LogName, record: &Value) -> Result<(), NodeError> {
        Ok(self
            .store
            .append(&self.config.tenant_id, &self.config.node_id, log, record)?)
    }

    /// Push records to one peer; a failure is logged, not fatal.
    fn push_to_peer(&self, peer_id: &str, log: LogName, records: &[Value]) {
        if let Err(err) = self
            .transport
            .push(&self.config.tenant_id, peer_id, log, records)
        {
            warn!(%peer_id, log = log.key(), %err, "push failed");
        }
    }

    fn log_replication(&self, peer_id: &str, log: LogName, count: u32) -> Result<(), NodeError> {
        let event = ReplicationEvent::push(&self.config.node_id, peer_id, log.key(), count);
        self.append_own(LogName::Replication, &serde_json::to_value(&event)?)
    }

    fn update_status(&self, state: &str, last_action: Option<&str>) -> Result<(), NodeError> {
        let status = NodeStatus {
            node_id: self.config.node_id.clone(),
            tenant_id: self.config.tenant_id.clone(),
            region_id: self.config.region_id.clone(),
            role: self.config.role,
            state: state.to_string(),
            offline: self.offline,
            crypto_mode: self.keypair.backend.label().to_string(),
            public_key: NodeStatus::abbreviate_key(&self.keypair.public_key),
            cycle_count: self.cycle_count,
            last_updated: time::now_iso(),
            last_action: last_action.map(str::to_string),
        };
        Ok(self.transport.set_status(
            &self.config.tenant_id,
            &self.config.node_id,
            &serde_json::to_value(&status)?,
        )?)
    }

    fn outcome(&self, action: TickAction) -> TickOutcome {
        TickOutcome {
            node_id: self.config.node_id.clone(),
            cycle: self.cycle_count,
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credmesh_domain::ClaimStatus;
    use credmesh_transport::LocalTransport;
    use tempfile::TempDir;

    const TENANT: &str = "test-tenant";

    struct Mesh {
        _dir: TempDir,
        store: Arc<LogStore>,
        transport: Arc<dyn Transport>,
    }

    fn mesh() -> Mesh {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LogStore::new(dir.path()));
        let transport: Arc<dyn Transport> = Arc::new(LocalTransport::new(store.clone()));
        Mesh {
            _dir: dir,
            store,
            transport,
        }
    }

    fn node(mesh: &Mesh, node_id: &str, region: &str, role: NodeRole, peers: &[&str]) -> MeshNode {
        MeshNode::new(
            NodeConfig {
                node_id: node_id.to_string(),
                tenant_id: TENANT.to_string(),
                region_id: region.to_string(),
                role,
                peers: peers.iter().map(|p| p.to_string()).collect(),
            },
            mesh.transport.clone(),
            mesh.store.clone(),
            MeshPolicy::default(),
            CryptoBackend::Ed25519,
        )
        .unwrap()
    }

    #[test]
    fn test_offline_node_skips() {
        let mesh = mesh();
        let mut edge = node(&mesh, "edge-A", "region-A", NodeRole::Edge, &[]);
        edge.set_offline(true).unwrap();
        let outcome = edge.tick().unwrap();
        assert_eq!(
            outcome.action,
            TickAction::Skip {
                reason: "offline".into()
            }
        );
        assert_eq!(outcome.cycle, 0);
    }

    #[test]
    fn test_edge_tick_appends_and_replicates() {
        let mesh = mesh();
        let mut edge = node(&mesh, "edge-A", "region-A", NodeRole::Edge, &["validator-B"]);
        let outcome = edge.tick().unwrap();

        match outcome.action {
            TickAction::GenerateEnvelope {
                envelope_count,
                replicated_to,
                ..
            } => {
                assert_eq!(envelope_count, 1);
                assert_eq!(replicated_to, 1);
            }
            other => panic!("unexpected action: {other:?}"),
        }

        // Own log and the peer's log both hold the envelope.
        assert_eq!(
            mesh.store.load_all(TENANT, "edge-A", LogName::Envelopes).unwrap().len(),
            1
        );
        assert_eq!(
            mesh.store
                .load_all(TENANT, "validator-B", LogName::Envelopes)
                .unwrap()
                .len(),
            1
        );
        // Replication metadata recorded.
        assert_eq!(
            mesh.store
                .load_all(TENANT, "edge-A", LogName::Replication)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_forced_correlation_bursts_into_one_group() {
        let mesh = mesh();
        let mut edge = node(&mesh, "edge-A", "region-A", NodeRole::Edge, &[]);
        edge.set_force_correlation(Some(0.95));
        let outcome = edge.tick().unwrap();
        match outcome.action {
            TickAction::GenerateEnvelope {
                envelope_count,
                group,
                ..
            } => {
                assert_eq!(envelope_count, 3);
                assert_eq!(group, "G1");
            }
            other => panic!("unexpected action: {other:?}"),
        }
        let records = mesh.store.load_all(TENANT, "edge-A", LogName::Envelopes).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r["payload"]["value"] == 95));
    }

    #[test]
    fn test_validator_accepts_valid_envelopes() {
        let mesh = mesh();
        let mut edge = node(&mesh, "edge-A", "region-A", NodeRole::Edge, &["validator-B"]);
        edge.tick().unwrap();

        let mut validator = node(&mesh, "validator-B", "region-B", NodeRole::Validator, &["edge-A"]);
        let outcome = validator.tick().unwrap();
        assert_eq!(
            outcome.action,
            TickAction::ValidateEnvelopes {
                accepted: 1,
                rejected: 0
            }
        );
        let validations = mesh
            .store
            .load_all(TENANT, "validator-B", LogName::Validations)
            .unwrap();
        assert_eq!(validations.len(), 1);
        assert_eq!(validations[0]["verdict"], "ACCEPT");
    }

    #[test]
    fn test_validator_is_idempotent_across_ticks() {
        let mesh = mesh();
        let mut edge = node(&mesh, "edge-A", "region-A", NodeRole::Edge, &["validator-B"]);
        edge.tick().unwrap();

        let mut validator = node(&mesh, "validator-B", "region-B", NodeRole::Validator, &["edge-A"]);
        validator.tick().unwrap();
        let second = validator.tick().unwrap();
        // Already-validated envelopes are skipped.
        assert_eq!(
            second.action,
            TickAction::ValidateEnvelopes {
                accepted: 0,
                rejected: 0
            }
        );
        assert_eq!(
            mesh.store
                .load_all(TENANT, "validator-B", LogName::Validations)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_validator_rejects_tampered_envelope() {
        let mesh = mesh();
        let edge = node(&mesh, "edge-A", "region-A", NodeRole::Edge, &[]);

        // Hand-craft a tampered envelope in the edge's log.
        let mut payload = PayloadMap::new();
        payload.insert("value".into(), Value::from(42));
        let mut envelope = EvidenceEnvelope::signed(
            TENANT,
            "edge-A",
            "region-A",
            "G1",
            payload,
            &edge.keypair,
        )
        .unwrap();
        envelope.payload.insert("value".into(), Value::from(999));
        mesh.store
            .append(
                TENANT,
                "edge-A",
                LogName::Envelopes,
                &serde_json::to_value(&envelope).unwrap(),
            )
            .unwrap();

        let mut validator = node(&mesh, "validator-B", "region-B", NodeRole::Validator, &["edge-A"]);
        let outcome = validator.tick().unwrap();
        assert_eq!(
            outcome.action,
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
        let reasons = validations[0]["reasons"].as_array().unwrap();
        assert!(reasons.contains(&Value::from("payload_hash_mismatch")));
    }

    #[test]
    fn test_aggregator_builds_snapshot() {
        let mesh = mesh();
        let mut edge = node(&mesh, "edge-A", "region-A", NodeRole::Edge, &["validator-B", "aggregator-A"]);
        edge.tick().unwrap();
        let mut validator = node(&mesh, "validator-B", "region-B", NodeRole::Validator, &["edge-A", "aggregator-A"]);
        validator.tick().unwrap();

        let mut aggregator = node(
            &mesh,
            "aggregator-A",
            "region-A",
            NodeRole::Aggregator,
            &["edge-A", "validator-B"],
        );
        let outcome = aggregator.tick().unwrap();
        match outcome.action {
            TickAction::Aggregate {
                aggregate_id,
                envelopes_processed,
                validations_processed,
                ..
            } => {
                assert!(aggregate_id.starts_with("AGG-"));
                assert!(envelopes_processed >= 1);
                assert!(validations_processed >= 1);
            }
            other => panic!("unexpected action: {other:?}"),
        }

        let aggregates = mesh
            .store
            .load_all(TENANT, "aggregator-A", LogName::Aggregates)
            .unwrap();
        assert_eq!(aggregates.len(), 1);
        assert!(!aggregates[0]["seal_candidate_hash"].as_str().unwrap().is_empty());
        // Replicated to peers too.
        assert_eq!(
            mesh.store.load_all(TENANT, "edge-A", LogName::Aggregates).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_aggregator_sees_offline_peer_region() {
        let mesh = mesh();
        let mut edge_b = node(&mesh, "edge-B", "region-B", NodeRole::Edge, &[]);
        edge_b.tick().unwrap();
        edge_b.set_offline(true).unwrap();

        let mut edge_a = node(&mesh, "edge-A", "region-A", NodeRole::Edge, &[]);
        edge_a.tick().unwrap();

        let mut aggregator = node(
            &mesh,
            "aggregator-A",
            "region-A",
            NodeRole::Aggregator,
            &["edge-A", "edge-B"],
        );
        let outcome = aggregator.tick().unwrap();
        match outcome.action {
            TickAction::Aggregate { claim_state, .. } => {
                // An offline region can never yield VERIFIED.
                assert_ne!(claim_state, ClaimStatus::Verified);
            }
            other => panic!("unexpected action: {other:?}"),
        }

        let aggregates = mesh
            .store
            .load_all(TENANT, "aggregator-A", LogName::Aggregates)
            .unwrap();
        let regions = aggregates[0]["sync_regions"].as_array().unwrap();
        let region_b = regions
            .iter()
            .find(|r| r["region_id"] == "region-B")
            .unwrap();
        assert_eq!(region_b["status"], "offline");
    }

    #[test]
    fn test_seal_authority_chains_from_genesis() {
        let mesh = mesh();
        let mut aggregator = node(&mesh, "aggregator-A", "region-A", NodeRole::Aggregator, &[]);
        aggregator.tick().unwrap();
        aggregator.tick().unwrap();

        let mut seal = node(
            &mesh,
            "seal-A",
            "region-A",
            NodeRole::SealAuthority,
            &["aggregator-A"],
        );
        let first = seal.tick().unwrap();
        match &first.action {
            TickAction::Seal { prev_seal_hash, seal_hash, .. } => {
                assert_eq!(prev_seal_hash, GENESIS_SEAL);
                assert!(seal_hash.starts_with("sha256:"));
            }
            other => panic!("unexpected action: {other:?}"),
        }

        let second = seal.tick().unwrap();
        let entries = mesh
            .store
            .load_all(TENANT, "seal-A", LogName::SealChainMirror)
            .unwrap();
        assert_eq!(entries.len(), 2);
        match &second.action {
            TickAction::Seal { prev_seal_hash, .. } => {
                assert_eq!(prev_seal_hash, entries[0]["seal_hash"].as_str().unwrap());
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn test_seal_authority_skips_without_aggregates() {
        let mesh = mesh();
        let mut seal = node(&mesh, "seal-A", "region-A", NodeRole::SealAuthority, &[]);
        let outcome = seal.tick().unwrap();
        assert_eq!(
            outcome.action,
            TickAction::SealSkip {
                reason: "no_aggregates".into()
            }
        );
    }

    #[test]
    fn test_status_published_after_tick() {
        let mesh = mesh();
        let mut edge = node(&mesh, "edge-A", "region-A", NodeRole::Edge, &[]);
        edge.tick().unwrap();
        let status = mesh.store.read_status(TENANT, "edge-A").unwrap().unwrap();
        assert_eq!(status["state"], "active");
        assert_eq!(status["cycle_count"], 1);
        assert_eq!(status["last_action"], "generate_envelope");
        assert_eq!(status["crypto_mode"], "Ed25519");
    }
}
