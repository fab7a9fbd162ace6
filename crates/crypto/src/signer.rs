//! Sign and verify over canonical message bytes.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::keys::{CryptoBackend, Keypair};
use crate::CryptoError;

/// Prefix marking a demo-backend signature.
const DEMO_PREFIX: &str = "demo:";

/// Sign message bytes with the keypair's backend.
///
/// Ed25519 signatures are 64 bytes hex-encoded; demo signatures are
/// `demo:<keyed SHA-256 hex>`.
pub fn sign(keypair: &Keypair, message: &[u8]) -> Result<String, CryptoError> {
    match keypair.backend {
        CryptoBackend::Ed25519 => {
            let raw = hex::decode(&keypair.private_key)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
            let key_bytes: [u8; 32] = raw
                .try_into()
                .map_err(|_| CryptoError::InvalidKey("expected 32-byte private key".into()))?;
            let signing_key = SigningKey::from_bytes(&key_bytes);
            Ok(hex::encode(signing_key.sign(message).to_bytes()))
        }
        CryptoBackend::Demo => {
            let raw = hex::decode(&keypair.private_key)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
            let mut hasher = Sha256::new();
            hasher.update(&raw);
            hasher.update(message);
            Ok(format!("{DEMO_PREFIX}{}", hex::encode(hasher.finalize())))
        }
    }
}

/// Verify a signature against a public key and message.
///
/// Never panics and never errors: any malformed public key, signature,
/// or encoding yields `false`. Demo signatures (prefix `demo:`) verify
/// by form only; the demo backend cannot be checked from the public
/// key alone.
pub fn verify(public_key_hex: &str, message: &[u8], signature: &str) -> bool {
    if let Some(body) = signature.strip_prefix(DEMO_PREFIX) {
        return !body.is_empty();
    }

    let Ok(pub_raw) = hex::decode(public_key_hex) else {
        return false;
    };
    let Ok(pub_bytes) = <[u8; 32]>::try_from(pub_raw.as_slice()) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&pub_bytes) else {
        return false;
    };
    let Ok(sig_raw) = hex::decode(signature) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(sig_raw.as_slice()) else {
        return false;
    };
    verifying_key
        .verify(message, &Signature::from_bytes(&sig_bytes))
        .is_ok()
}
