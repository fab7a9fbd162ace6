//! Envelope-signature sweep over replicated logs.

use serde::{Deserialize, Serialize};

use credmesh_domain::EvidenceEnvelope;

/// Detail cap on reported failures, matching the bounded detail of
/// status rollups.
const FAILURE_DETAIL_CAP: usize = 20;

/// Pass/fail report from sweeping stored envelopes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EnvelopeSweepReport {
    pub envelopes_checked: usize,
    pub passed: usize,
    pub failed: usize,
    /// Envelope ids that failed, `<id>:payload_hash` for hash-binding
    /// failures; capped at 20 entries
    pub failures: Vec<String>,
}

impl EnvelopeSweepReport {
    /// True when every checked envelope passed both checks.
    pub fn clean(&self) -> bool {
        self.failed == 0
    }
}

/// Verify signatures and payload-hash bindings across a set of
/// envelopes.
///
/// Each envelope contributes up to two failures: a bad signature and a
/// payload-hash mismatch are reported separately, the way a validator
/// would reject them. The sweep never mutates or drops records.
pub fn sweep_envelopes(envelopes: &[EvidenceEnvelope]) -> EnvelopeSweepReport {
    let mut report = EnvelopeSweepReport {
        envelopes_checked: envelopes.len(),
        ..EnvelopeSweepReport::default()
    };

    for env in envelopes {
        if env.verify_signature() {
            report.passed += 1;
        } else {
            report.failed += 1;
            if report.failures.len() < FAILURE_DETAIL_CAP {
                report.failures.push(env.envelope_id.clone());
            }
        }

        let hash_ok = env
            .recompute_payload_hash()
            .map(|h| h == env.payload_hash)
            .unwrap_or(false);
        if !hash_ok {
            report.failed += 1;
            if report.failures.len() < FAILURE_DETAIL_CAP {
                report
                    .failures
                    .push(format!("{}:payload_hash", env.envelope_id));
            }
        }
    }

    report
}
