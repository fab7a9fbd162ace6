//! Seal-chain continuity verification.

use serde::{Deserialize, Serialize};

use credmesh_domain::{SealChainEntry, GENESIS_SEAL};

/// One detected discontinuity in a seal chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainBreak {
    /// Index of the entry whose `prev_seal_hash` is wrong
    pub index: usize,
    pub expected: String,
    pub actual: String,
}

/// Full verification report over one seal-chain log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChainReport {
    pub seal_count: usize,
    pub chain_intact: bool,
    pub breaks: Vec<ChainBreak>,
    /// `seal[<index>].<field>` for each missing required field
    pub missing_fields: Vec<String>,
    pub first_seal: Option<String>,
    pub last_seal: Option<String>,
}

/// Verify an ordered seal-chain log.
///
/// Checks, over every entry (never halting early):
/// - entry 0 anchors at [`GENESIS_SEAL`];
/// - `entry[i].prev_seal_hash == entry[i-1].seal_hash` for i > 0;
/// - `seal_hash`, `prev_seal_hash`, `policy_hash`, `snapshot_hash` are
///   all non-empty.
///
/// An empty log is trivially intact.
pub fn verify_seal_chain(entries: &[SealChainEntry]) -> ChainReport {
    let mut report = ChainReport {
        seal_count: entries.len(),
        chain_intact: true,
        first_seal: entries.first().map(|e| e.seal_hash.clone()),
        last_seal: entries.last().map(|e| e.seal_hash.clone()),
        ..ChainReport::default()
    };

    for (i, entry) in entries.iter().enumerate() {
        for (field, value) in [
            ("seal_hash", &entry.seal_hash),
            ("prev_seal_hash", &entry.prev_seal_hash),
            ("policy_hash", &entry.policy_hash),
            ("snapshot_hash", &entry.snapshot_hash),
        ] {
            if value.is_empty() {
                report.missing_fields.push(format!("seal[{i}].{field}"));
            }
        }

        let expected = if i == 0 {
            GENESIS_SEAL.to_string()
        } else {
            entries[i - 1].seal_hash.clone()
        };
        if entry.prev_seal_hash != expected {
            report.breaks.push(ChainBreak {
                index: i,
                expected,
                actual: entry.prev_seal_hash.clone(),
            });
            report.chain_intact = false;
        }
    }

    if !report.missing_fields.is_empty() {
        report.chain_intact = false;
    }
    report
}
