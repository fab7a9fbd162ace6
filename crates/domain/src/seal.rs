//! Seal-chain entries: the hash-linked ledger of mesh conclusions.

use serde::{Deserialize, Serialize};

use credmesh_crypto::sha256_trunc_hex;

use crate::{time, DomainError};

/// Sentinel `prev_seal_hash` of the first chain entry.
pub const GENESIS_SEAL: &str = "GENESIS";

/// Hex length of the truncated seal digest (after the `sha256:` prefix).
const SEAL_HASH_LEN: usize = 40;

/// Compute a seal hash from its three inputs.
///
/// `sha256:` + truncated SHA-256 over `"{prev}|{policy}|{snapshot}"`.
pub fn compute_seal_hash(prev_seal_hash: &str, policy_hash: &str, snapshot_hash: &str) -> String {
    let input = format!("{prev_seal_hash}|{policy_hash}|{snapshot_hash}");
    format!("sha256:{}", sha256_trunc_hex(input.as_bytes(), SEAL_HASH_LEN))
}

/// One entry in the append-only seal chain.
///
/// Chain continuity (`entry[i].prev_seal_hash == entry[i-1].seal_hash`,
/// anchored at [`GENESIS_SEAL`]) is the core integrity invariant,
/// verifiable by any reader holding the log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SealChainEntry {
    #[serde(default)]
    pub tenant_id: String,
    /// Aggregate this entry seals
    #[serde(default)]
    pub aggregate_id: String,
    #[serde(default)]
    pub sealed_by: String,
    #[serde(default)]
    pub sealed_at: String,
    #[serde(default)]
    pub seal_hash: String,
    #[serde(default)]
    pub prev_seal_hash: String,
    #[serde(default)]
    pub policy_hash: String,
    #[serde(default)]
    pub snapshot_hash: String,
    #[serde(default)]
    pub index_score: f64,
    #[serde(default)]
    pub index_band: String,
}

impl SealChainEntry {
    /// Build the next chain entry from the previous seal hash (or
    /// [`GENESIS_SEAL`] for the first entry).
    #[allow(clippy::too_many_arguments)]
    pub fn next(
        tenant_id: impl Into<String>,
        aggregate_id: impl Into<String>,
        sealed_by: impl Into<String>,
        prev_seal_hash: impl Into<String>,
        policy_hash: impl Into<String>,
        snapshot_hash: impl Into<String>,
        index_score: f64,
        index_band: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let prev_seal_hash = prev_seal_hash.into();
        let policy_hash = policy_hash.into();
        let snapshot_hash = snapshot_hash.into();
        if snapshot_hash.is_empty() {
            return Err(DomainError::MissingField("snapshot_hash"));
        }
        let seal_hash = compute_seal_hash(&prev_seal_hash, &policy_hash, &snapshot_hash);
        Ok(Self {
            tenant_id: tenant_id.into(),
            aggregate_id: aggregate_id.into(),
            sealed_by: sealed_by.into(),
            sealed_at: time::now_iso(),
            seal_hash,
            prev_seal_hash,
            policy_hash,
            snapshot_hash,
            index_score,
            index_band: index_band.into(),
        })
    }
}
