//! Keypair generation and key identifiers.

use ed25519_dalek::SigningKey;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Signing backend carried by a keypair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CryptoBackend {
    /// Real asymmetric signatures (ed25519-dalek).
    Ed25519,
    /// Keyed-hash stand-in. NOT cryptographically verifiable from the
    /// public key; signatures are accepted by form only. Demos and
    /// tests only.
    Demo,
}

impl CryptoBackend {
    /// Label reported in node status documents.
    pub fn label(&self) -> &'static str {
        match self {
            CryptoBackend::Ed25519 => "Ed25519",
            CryptoBackend::Demo => "DEMO",
        }
    }
}

/// A signing keypair, hex-encoded.
///
/// Private key material is zeroized on drop.
#[derive(Debug, Clone)]
pub struct Keypair {
    /// Backend this keypair was generated for
    pub backend: CryptoBackend,
    /// Public key, lowercase hex
    pub public_key: String,
    /// Private key, lowercase hex
    pub private_key: String,
}

impl Drop for Keypair {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

/// Generate a keypair for the given backend.
///
/// Returns hex-encoded public and private key material. The demo backend
/// derives its public key from the secret with a domain-separated hash,
/// mirroring the production key shape without any asymmetric guarantee.
pub fn generate_keypair(backend: CryptoBackend) -> Keypair {
    let mut secret = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);

    let keypair = match backend {
        CryptoBackend::Ed25519 => {
            let signing_key = SigningKey::from_bytes(&secret);
            Keypair {
                backend,
                public_key: hex::encode(signing_key.verifying_key().to_bytes()),
                private_key: hex::encode(secret),
            }
        }
        CryptoBackend::Demo => {
            use sha2::{Digest, Sha256};
            let mut hasher = Sha256::new();
            hasher.update(secret);
            hasher.update(b"public-key-derivation");
            Keypair {
                backend,
                public_key: hex::encode(hasher.finalize()),
                private_key: hex::encode(secret),
            }
        }
    };

    secret.zeroize();
    keypair
}

/// Stable short identifier for a public key.
///
/// First 16 bytes of the BLAKE3 hash of the raw key bytes, hex-encoded.
pub fn key_id(public_key_hex: &str) -> String {
    let raw = hex::decode(public_key_hex).unwrap_or_else(|_| public_key_hex.as_bytes().to_vec());
    let hash = blake3::hash(&raw);
    hex::encode(&hash.as_bytes()[..16])
}
