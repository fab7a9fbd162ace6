//! CredMesh record types.
//!
//! Immutable, canonically-serializable, signable structures exchanged
//! between mesh nodes: evidence envelopes, validation verdicts,
//! aggregation snapshots, and seal-chain entries, plus the derived
//! claim/cluster/region state they carry and the policy that governs
//! them.
//!
//! Records are created once, signed (where applicable), and then only
//! replicated. Duplicates across nodes are expected; readers
//! deduplicate by id.

pub mod aggregate;
pub mod claim;
pub mod envelope;
pub mod ids;
pub mod policy;
pub mod seal;
pub mod status;
pub mod time;
pub mod validation;

pub use aggregate::{AggregationRecord, CredibilityIndex, IndexComponents};
pub use claim::{
    ClaimState, ClaimStatus, CorrelationCluster, RegionStatus, RiskLevel, SyncRegion,
};
pub use envelope::{EvidenceEnvelope, PayloadMap};
pub use policy::{CorrelationPolicy, MeshPolicy, QuorumPolicy, TierQuorum, TtlPolicy};
pub use seal::{compute_seal_hash, SealChainEntry, GENESIS_SEAL};
pub use status::{NodeRole, NodeStatus, ReplicationEvent, TickAction, TickOutcome};
pub use validation::{ValidationRecord, Verdict};

use thiserror::Error;

/// Errors raised while constructing or hashing records.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Canonical serialization failed
    #[error(transparent)]
    Crypto(#[from] credmesh_crypto::CryptoError),

    /// A required record field was empty at construction time
    #[error("required field missing: {0}")]
    MissingField(&'static str),
}
