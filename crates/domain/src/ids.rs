//! Record identifier generation.

use uuid::Uuid;

/// Generate a prefixed record id, e.g. `ENV-3f9a1c0b72de`.
///
/// The suffix is the first 12 hex characters of a v4 UUID.
pub fn new_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &hex[..12])
}
