//! Evidence envelopes: signed observations from edge producers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use credmesh_crypto::{canonical_bytes, sha256_trunc_hex, sign, verify, Keypair};

use crate::{ids, time, DomainError};

/// Open extension map carried by an envelope.
///
/// This is the only schemaless part of a record; everything else has a
/// fixed field set.
pub type PayloadMap = serde_json::Map<String, Value>;

/// Hex length of the truncated SHA-256 payload and snapshot hashes.
pub(crate) const CONTENT_HASH_LEN: usize = 40;

/// One signed evidence observation from a producer node.
///
/// Immutable after signing: the signature covers the signable field set
/// and `payload_hash` binds the payload content. Replication copies
/// envelopes verbatim; they are never mutated downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceEnvelope {
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub envelope_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub producer_id: String,
    #[serde(default)]
    pub region_id: String,
    #[serde(default)]
    pub correlation_group: String,
    #[serde(default)]
    pub signal_type: String,
    #[serde(default)]
    pub payload: PayloadMap,
    #[serde(default)]
    pub payload_hash: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub public_key: String,
    /// Source-reported observation time (may differ from `timestamp`)
    #[serde(default)]
    pub event_time: String,
    /// Monotonic per-source sequence
    #[serde(default)]
    pub sequence_number: u64,
}

/// Fields covered by the envelope signature.
#[derive(Serialize)]
struct SignableEnvelope<'a> {
    tenant_id: &'a str,
    envelope_id: &'a str,
    timestamp: &'a str,
    producer_id: &'a str,
    region_id: &'a str,
    correlation_group: &'a str,
    signal_type: &'a str,
    payload_hash: &'a str,
}

impl EvidenceEnvelope {
    /// Create an unsigned envelope with a fresh id and timestamp.
    pub fn new(
        tenant_id: impl Into<String>,
        producer_id: impl Into<String>,
        region_id: impl Into<String>,
        correlation_group: impl Into<String>,
        payload: PayloadMap,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            envelope_id: ids::new_id("ENV"),
            timestamp: time::now_iso(),
            producer_id: producer_id.into(),
            region_id: region_id.into(),
            correlation_group: correlation_group.into(),
            signal_type: "evidence".to_string(),
            payload,
            payload_hash: String::new(),
            signature: String::new(),
            public_key: String::new(),
            event_time: String::new(),
            sequence_number: 0,
        }
    }

    /// Create, hash, and sign an envelope in one step.
    pub fn signed(
        tenant_id: impl Into<String>,
        producer_id: impl Into<String>,
        region_id: impl Into<String>,
        correlation_group: impl Into<String>,
        payload: PayloadMap,
        keypair: &Keypair,
    ) -> Result<Self, DomainError> {
        let mut envelope = Self::new(tenant_id, producer_id, region_id, correlation_group, payload);
        envelope.sign(keypair)?;
        Ok(envelope)
    }

    /// Truncated SHA-256 over the canonical payload bytes.
    pub fn recompute_payload_hash(&self) -> Result<String, DomainError> {
        let raw = canonical_bytes(&self.payload)?;
        Ok(sha256_trunc_hex(&raw, CONTENT_HASH_LEN))
    }

    /// Compute and sign: sets `payload_hash`, `public_key`, `signature`.
    pub fn sign(&mut self, keypair: &Keypair) -> Result<(), DomainError> {
        self.payload_hash = self.recompute_payload_hash()?;
        self.public_key = keypair.public_key.clone();
        let message = canonical_bytes(&self.signable())?;
        self.signature = sign(keypair, &message)?;
        Ok(())
    }

    /// Verify the signature against the embedded public key.
    ///
    /// Returns `false` for any malformed envelope; callers separately
    /// check `payload_hash` against [`Self::recompute_payload_hash`].
    pub fn verify_signature(&self) -> bool {
        match canonical_bytes(&self.signable()) {
            Ok(message) => verify(&self.public_key, &message, &self.signature),
            Err(_) => false,
        }
    }

    fn signable(&self) -> SignableEnvelope<'_> {
        SignableEnvelope {
            tenant_id: &self.tenant_id,
            envelope_id: &self.envelope_id,
            timestamp: &self.timestamp,
            producer_id: &self.producer_id,
            region_id: &self.region_id,
            correlation_group: &self.correlation_group,
            signal_type: &self.signal_type,
            payload_hash: &self.payload_hash,
        }
    }
}
