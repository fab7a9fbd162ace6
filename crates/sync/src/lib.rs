//! Anti-entropy reconciliation between two record collections.
//!
//! Stateless helpers for periodic replica repair without a central
//! coordinator: digest exchange for quick divergence checks, cursor and
//! id-based delta sync instead of full-log replay, and replay-safe
//! application keyed on seen record ids.

pub mod anti_entropy;

pub use anti_entropy::{
    apply_delta_replay_safe, build_delta_offer, digest, estimate_bandwidth_profile,
    reconcile_sets, record_hash, record_id, ApplyOutcome, BandwidthProfile, DeltaCursor,
    ReconcileReport,
};
