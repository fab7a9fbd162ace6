//! Mesh node runtime.
//!
//! A [`MeshNode`] is a role-tagged actor. Each `tick()` performs one
//! role-specific step: producing evidence (edge), judging it
//! (validator), federating it into a snapshot (aggregator), or sealing
//! the snapshot into the hash chain (seal authority), using the
//! injected transport, store, and policy. Nodes hold no cross-tick
//! shared state beyond their own append-only logs; a driver invokes
//! ticks synchronously, one loop per node.

pub mod node;

pub use node::{MeshNode, NodeConfig};

use thiserror::Error;

/// Node runtime errors.
///
/// Validation and crypto failures are not errors; they become REJECT
/// verdicts. These variants cover storage, serialization, and the
/// transport failures that abort a whole tick (never a single peer's
/// push or pull, which only logs).
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Domain(#[from] credmesh_domain::DomainError),

    #[error(transparent)]
    Store(#[from] credmesh_store::StoreError),

    #[error(transparent)]
    Transport(#[from] credmesh_transport::TransportError),

    #[error("record serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}
