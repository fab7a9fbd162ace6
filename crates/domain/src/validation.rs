//! Validation records: one validator's verdict on one envelope.

use serde::{Deserialize, Serialize};

use credmesh_crypto::{canonical_bytes, sign, verify, Keypair};

use crate::{ids, time, DomainError};

/// Validator verdict on an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    #[default]
    Accept,
    Reject,
}

/// A signed validation verdict.
///
/// At most one per (validator, envelope) is meaningful; later duplicates
/// are ignored by id-dedup at read time, never rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationRecord {
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub validation_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub validator_id: String,
    #[serde(default)]
    pub region_id: String,
    #[serde(default)]
    pub envelope_id: String,
    #[serde(default)]
    pub verdict: Verdict,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub public_key: String,
}

/// Fields covered by the validation signature.
#[derive(Serialize)]
struct SignableValidation<'a> {
    tenant_id: &'a str,
    validation_id: &'a str,
    timestamp: &'a str,
    validator_id: &'a str,
    envelope_id: &'a str,
    verdict: Verdict,
}

impl ValidationRecord {
    /// Create and sign a validation record.
    pub fn signed(
        tenant_id: impl Into<String>,
        validator_id: impl Into<String>,
        region_id: impl Into<String>,
        envelope_id: impl Into<String>,
        verdict: Verdict,
        reasons: Vec<String>,
        keypair: &Keypair,
    ) -> Result<Self, DomainError> {
        let mut record = Self {
            tenant_id: tenant_id.into(),
            validation_id: ids::new_id("VAL"),
            timestamp: time::now_iso(),
            validator_id: validator_id.into(),
            region_id: region_id.into(),
            envelope_id: envelope_id.into(),
            verdict,
            reasons,
            signature: String::new(),
            public_key: String::new(),
        };
        record.public_key = keypair.public_key.clone();
        let message = canonical_bytes(&record.signable())?;
        record.signature = sign(keypair, &message)?;
        Ok(record)
    }

    /// Verify the signature against the embedded public key.
    pub fn verify_signature(&self) -> bool {
        match canonical_bytes(&self.signable()) {
            Ok(message) => verify(&self.public_key, &message, &self.signature),
            Err(_) => false,
        }
    }

    fn signable(&self) -> SignableValidation<'_> {
        SignableValidation {
            tenant_id: &self.tenant_id,
            validation_id: &self.validation_id,
            timestamp: &self.timestamp,
            validator_id: &self.validator_id,
            envelope_id: &self.envelope_id,
            verdict: self.verdict,
        }
    }
}
