//! Append-only log storage for mesh nodes.
//!
//! One logical store per `(tenant, node)`: five append-only JSONL logs
//! plus a single status document. Tenant and node identifiers come from
//! untrusted peers, so they are validated and hashed into fixed-width
//! slugs before ever touching the filesystem.
//!
//! Each node is the sole writer of its own logs; replication copies
//! records into the receiver's logs, it never shares files. Within one
//! log, append order is the only ordering guarantee.

pub mod logstore;

pub use logstore::{dedupe_by_id, LogName, LogStore, NODE_STATUS_FILE};

use thiserror::Error;

/// Storage-layer errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Tenant or node identifier failed validation
    #[error("invalid {field} identifier: {value:?}")]
    InvalidId { field: &'static str, value: String },

    /// Filesystem failure
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be serialized
    #[error("record serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}
