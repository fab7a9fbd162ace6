//! Read-side ledger verification.
//!
//! Any holder of a seal-chain log (or a replicated envelope log) can
//! verify it independently: chain continuity, required fields, and
//! envelope signatures. Verification is reporting-only: breaks are
//! never repaired, and a verifier walks the entire input rather than
//! halting at the first failure.

pub mod sweep;
pub mod verify;

pub use sweep::{sweep_envelopes, EnvelopeSweepReport};
pub use verify::{verify_seal_chain, ChainBreak, ChainReport};
