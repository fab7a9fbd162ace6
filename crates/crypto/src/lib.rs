//! Signing layer for CredMesh records.
//!
//! Every hash and signature in the mesh is computed over the canonical
//! byte encoding produced by [`canonical_bytes`], so two nodes serializing
//! the same record always sign the same bytes.
//!
//! Two backends share one call surface:
//!
//! - **Ed25519** (`ed25519-dalek`), the production backend.
//! - **Demo**, a keyed-hash stand-in for environments without key
//!   provisioning. Demo signatures carry a `demo:` prefix and are NOT
//!   cryptographically verifiable from the public key alone; [`verify`]
//!   accepts them by form only. Never use outside demos and tests.

pub mod canonical;
pub mod keys;
pub mod signer;

pub use canonical::{canonical_bytes, sha256_hex, sha256_trunc_hex};
pub use keys::{generate_keypair, key_id, CryptoBackend, Keypair};
pub use signer::{sign, verify};

use thiserror::Error;

/// Errors raised while producing signatures or canonical bytes.
///
/// Verification never returns an error: [`verify`] maps every failure,
/// malformed input included, to `false`.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Canonical serialization failed
    #[error("canonical serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key material was not valid for the selected backend
    #[error("invalid key material: {0}")]
    InvalidKey(String),
}
