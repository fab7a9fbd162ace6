//! Mesh policy: quorum, correlation, and TTL thresholds.
//!
//! Policy is an explicit immutable struct injected at construction time.
//! The hash of the policy in force travels with every aggregation
//! snapshot and seal entry so a reader can tell which thresholds
//! produced a verdict.

use serde::{Deserialize, Serialize};

use credmesh_crypto::{canonical_bytes, sha256_trunc_hex};

use crate::DomainError;

/// Hex length of the truncated policy hash.
const POLICY_HASH_LEN: usize = 16;

/// Quorum thresholds for one claim tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TierQuorum {
    /// Minimum ACCEPT validations
    pub k_required: u32,
    /// Nominal validator pool size
    pub n_total: u32,
    /// Minimum distinct correlation groups among accepts
    pub min_correlation_groups: u32,
}

/// Quorum policy across tiers (single tier-0 claim in this design).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct QuorumPolicy {
    pub tier0: TierQuorum,
}

/// Correlation risk thresholds over the cluster coefficient.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CorrelationPolicy {
    /// Coefficient at or above which a cluster needs review
    pub review_threshold: f64,
    /// Coefficient at or above which a cluster invalidates its region
    pub invalid_threshold: f64,
}

/// Evidence time-to-live per tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TtlPolicy {
    pub tier0_seconds: u64,
}

/// Complete mesh policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MeshPolicy {
    pub quorum: QuorumPolicy,
    pub correlation: CorrelationPolicy,
    pub ttl: TtlPolicy,
}

impl Default for MeshPolicy {
    fn default() -> Self {
        Self {
            quorum: QuorumPolicy {
                tier0: TierQuorum {
                    k_required: 3,
                    n_total: 5,
                    min_correlation_groups: 2,
                },
            },
            correlation: CorrelationPolicy {
                review_threshold: 0.7,
                invalid_threshold: 0.9,
            },
            ttl: TtlPolicy { tier0_seconds: 900 },
        }
    }
}

impl MeshPolicy {
    /// Truncated SHA-256 over the canonical policy bytes.
    pub fn policy_hash(&self) -> Result<String, DomainError> {
        let raw = canonical_bytes(self)?;
        Ok(sha256_trunc_hex(&raw, POLICY_HASH_LEN))
    }
}
