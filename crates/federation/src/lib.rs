//! Federated quorum and correlation computation.
//!
//! Pure functions turning a batch of envelopes and validations plus the
//! known sync regions and policy into a claim state, correlation
//! clusters, and updated region health. Claims cannot become VERIFIED
//! without multi-region, multi-group consensus; a partition yields
//! UNKNOWN, because the honest answer beats an optimistic wrong VERIFIED.
//!
//! Everything here is recomputed from scratch each aggregation cycle,
//! which is what makes aggregation idempotent given the same inputs.

pub mod correlation;
pub mod engine;
pub mod index;

pub use correlation::{build_clusters, correlation_coefficient};
pub use engine::{compute_federated_state, ComponentMetrics, FederatedState};
pub use index::compute_credibility_index;
