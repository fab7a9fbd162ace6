//! Peer identities for mutual authentication.

use serde::{Deserialize, Serialize};

/// Pinned identity of one peer under mutual auth.
///
/// A response from the peer must present a certificate fingerprint
/// matching `cert_fingerprint`; a mismatch is an immediate hard
/// failure, never retried.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NodeIdentity {
    pub node_id: String,
    /// SPIFFE trust domain, e.g. `trust.local`
    #[serde(default)]
    pub trust_domain: String,
    /// Expected peer certificate fingerprint (hex)
    #[serde(default)]
    pub cert_fingerprint: String,
}

impl NodeIdentity {
    /// SPIFFE-style identity URI: `spiffe://<domain>/node/<id>`.
    pub fn spiffe_id(&self) -> String {
        format!("spiffe://{}/node/{}", self.trust_domain, self.node_id)
    }
}
