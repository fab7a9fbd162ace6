//! Shared mesh topology helpers.

use std::sync::Arc;

use tempfile::TempDir;

use credmesh_crypto::CryptoBackend;
use credmesh_domain::{ClaimStatus, MeshPolicy, NodeRole, TickAction, TickOutcome};
use credmesh_node::{MeshNode, NodeConfig};
use credmesh_store::LogStore;
use credmesh_transport::{LocalTransport, Transport};

pub const TENANT: &str = "scenario-tenant";

/// A mesh of nodes sharing one local transport and store.
pub struct TestMesh {
    _dir: TempDir,
    pub store: Arc<LogStore>,
    pub transport: Arc<dyn Transport>,
    pub nodes: Vec<MeshNode>,
}

impl TestMesh {
    /// Empty mesh over a fresh temp store.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let store = Arc::new(LogStore::new(dir.path()));
        let transport: Arc<dyn Transport> = Arc::new(LocalTransport::new(store.clone()));
        Self {
            _dir: dir,
            store,
            transport,
            nodes: Vec::new(),
        }
    }

    /// The standard 3-region, 7-node topology:
    /// region A: edge-A, aggregator-A, seal-A; region B: validator-B,
    /// edge-B; region C: edge-C, validator-C. Every node peers with
    /// every other.
    pub fn standard_topology() -> Self {
        let mut mesh = Self::new();
        let layout = [
            ("edge-A", "region-A", NodeRole::Edge),
            ("aggregator-A", "region-A", NodeRole::Aggregator),
            ("seal-A", "region-A", NodeRole::SealAuthority),
            ("validator-B", "region-B", NodeRole::Validator),
            ("edge-B", "region-B", NodeRole::Edge),
            ("edge-C", "region-C", NodeRole::Edge),
            ("validator-C", "region-C", NodeRole::Validator),
        ];
        let all_ids: Vec<&str> = layout.iter().map(|(id, _, _)| *id).collect();
        for (node_id, region, role) in layout {
            let peers = all_ids
                .iter()
                .filter(|id| **id != node_id)
                .map(|id| id.to_string())
                .collect();
            mesh.add_node(node_id, region, role, peers);
        }
        mesh
    }

    pub fn add_node(
        &mut self,
        node_id: &str,
        region_id: &str,
        role: NodeRole,
        peers: Vec<String>,
    ) {
        let node = MeshNode::new(
            NodeConfig {
                node_id: node_id.to_string(),
                tenant_id: TENANT.to_string(),
                region_id: region_id.to_string(),
                role,
                peers,
            },
            self.transport.clone(),
            self.store.clone(),
            MeshPolicy::default(),
            CryptoBackend::Ed25519,
        )
        .expect("node construction");
        self.nodes.push(node);
    }

    pub fn node_mut(&mut self, node_id: &str) -> &mut MeshNode {
        self.nodes
            .iter_mut()
            .find(|n| n.node_id() == node_id)
            .unwrap_or_else(|| panic!("no node {node_id}"))
    }

    /// Tick every node once, in topology order; returns the outcomes.
    pub fn run_cycle(&mut self) -> Vec<TickOutcome> {
        self.nodes
            .iter_mut()
            .map(|node| node.tick().expect("tick"))
            .collect()
    }

    /// Claim state reported by the aggregator in a cycle's outcomes.
    pub fn claim_state(outcomes: &[TickOutcome]) -> Option<ClaimStatus> {
        outcomes.iter().find_map(|o| match &o.action {
            TickAction::Aggregate { claim_state, .. } => Some(*claim_state),
            _ => None,
        })
    }
}

impl Default for TestMesh {
    fn default() -> Self {
        Self::new()
    }
}
