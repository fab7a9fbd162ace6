//! Digest, delta, and replay-safe apply over JSON record sets.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use credmesh_crypto::{canonical_bytes, sha256_hex, sha256_trunc_hex};

/// Identity of a record for reconciliation.
///
/// Tries `id`, `envelope_id`, then `record_id`; records without any id
/// field get a content-derived `anon:<16 hex>` identity so they still
/// reconcile deterministically.
pub fn record_id(record: &Value) -> String {
    for field in ["id", "envelope_id", "record_id"] {
        if let Some(id) = record.get(field).and_then(Value::as_str) {
            if !id.is_empty() {
                return id.to_string();
            }
        }
    }
    let raw = canonical_bytes(record).unwrap_or_default();
    format!("anon:{}", sha256_trunc_hex(&raw, 16))
}

/// Deterministic content hash of one record.
pub fn record_hash(record: &Value) -> String {
    let raw = canonical_bytes(record).unwrap_or_default();
    sha256_hex(&raw)
}

fn record_ts(record: &Value) -> String {
    for field in ["timestamp", "ts"] {
        if let Some(ts) = record.get(field).and_then(Value::as_str) {
            if !ts.is_empty() {
                return ts.to_string();
            }
        }
    }
    String::new()
}

/// Order-independent fingerprint of a record set.
///
/// Equal digests mean the sets hold identical records regardless of
/// log order.
pub fn digest(records: &[Value]) -> String {
    let mut pairs: Vec<(String, String)> = records
        .iter()
        .map(|r| (record_id(r), record_hash(r)))
        .collect();
    pairs.sort();
    let raw = canonical_bytes(&pairs).unwrap_or_default();
    sha256_hex(&raw)
}

/// Cursor state for replay-safe delta synchronization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DeltaCursor {
    pub last_timestamp: String,
    pub seen_ids: BTreeSet<String>,
}

/// Result of applying a delta batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    pub applied: Vec<Value>,
    pub skipped_replay: Vec<Value>,
    pub cursor: DeltaCursor,
}

/// Records the remote does not already hold, newer than `since`.
///
/// Sorted by `(timestamp, id)` so the receiver applies them in a stable
/// order.
pub fn build_delta_offer(
    local_records: &[Value],
    remote_known_ids: &BTreeSet<String>,
    since: &str,
) -> Vec<Value> {
    let mut offer: Vec<Value> = local_records
        .iter()
        .filter(|record| {
            let rid = record_id(record);
            if remote_known_ids.contains(&rid) {
                return false;
            }
            let rts = record_ts(record);
            !(!since.is_empty() && !rts.is_empty() && rts.as_str() <= since)
        })
        .cloned()
        .collect();
    offer.sort_by_key(|r| (record_ts(r), record_id(r)));
    offer
}

/// Apply a delta batch, skipping any record whose id the cursor has
/// already seen.
///
/// Idempotent: re-applying the same batch against the returned cursor
/// applies nothing and leaves the cursor unchanged.
pub fn apply_delta_replay_safe(incoming: &[Value], cursor: &DeltaCursor) -> ApplyOutcome {
    let mut applied = Vec::new();
    let mut skipped = Vec::new();
    let mut last_timestamp = cursor.last_timestamp.clone();
    let mut seen_ids = cursor.seen_ids.clone();

    for record in incoming {
        let rid = record_id(record);
        if seen_ids.contains(&rid) {
            skipped.push(record.clone());
            continue;
        }
        seen_ids.insert(rid);
        let rts = record_ts(record);
        if !rts.is_empty() && rts > last_timestamp {
            last_timestamp = rts;
        }
        applied.push(record.clone());
    }

    ApplyOutcome {
        applied,
        skipped_replay: skipped,
        cursor: DeltaCursor {
            last_timestamp,
            seen_ids,
        },
    }
}

/// Divergence report between two record sets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileReport {
    pub local_digest: String,
    pub remote_digest: String,
    pub in_sync: bool,
    pub missing_on_local: Vec<String>,
    pub missing_on_remote: Vec<String>,
    /// Ids present on both sides with differing content
    pub mismatched_records: Vec<String>,
}

/// Reconcile local and remote sets by id and content hash.
pub fn reconcile_sets(local: &[Value], remote: &[Value]) -> ReconcileReport {
    let local_map: BTreeMap<String, String> = local
        .iter()
        .map(|r| (record_id(r), record_hash(r)))
        .collect();
    let remote_map: BTreeMap<String, String> = remote
        .iter()
        .map(|r| (record_id(r), record_hash(r)))
        .collect();

    let missing_on_local: Vec<String> = remote_map
        .keys()
        .filter(|id| !local_map.contains_key(*id))
        .cloned()
        .collect();
    let missing_on_remote: Vec<String> = local_map
        .keys()
        .filter(|id| !remote_map.contains_key(*id))
        .cloned()
        .collect();
    let mismatched_records: Vec<String> = local_map
        .iter()
        .filter(|(id, hash)| remote_map.get(*id).is_some_and(|h| h != *hash))
        .map(|(id, _)| id.clone())
        .collect();

    ReconcileReport {
        local_digest: digest(local),
        remote_digest: digest(remote),
        in_sync: missing_on_local.is_empty()
            && missing_on_remote.is_empty()
            && mismatched_records.is_empty(),
        missing_on_local,
        missing_on_remote,
        mismatched_records,
    }
}

/// Transfer-size comparison between full replication and delta sync.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BandwidthProfile {
    pub full_bytes: u64,
    pub delta_bytes: u64,
    pub saved_percent: f64,
}

/// Estimate bytes for full-log replication vs delta sync.
pub fn estimate_bandwidth_profile(
    full_records: usize,
    delta_records: usize,
    avg_record_bytes: usize,
) -> BandwidthProfile {
    let per_record = avg_record_bytes.max(1) as u64;
    let full_bytes = full_records as u64 * per_record;
    let delta_bytes = delta_records as u64 * per_record;
    let saved_percent = if full_bytes == 0 {
        0.0
    } else {
        let saved = 100.0 * (1.0 - delta_bytes as f64 / full_bytes as f64);
        (saved.max(0.0) * 100.0).round() / 100.0
    };
    BandwidthProfile {
        full_bytes,
        delta_bytes,
        saved_percent,
    }
}
