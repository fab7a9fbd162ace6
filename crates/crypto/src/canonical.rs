//! Canonical byte encoding and content hashing.
//!
//! Canonical form is compact JSON with object keys in sorted order.
//! `serde_json`'s map type is BTreeMap-backed, so round-tripping any
//! serializable value through `serde_json::Value` yields key-sorted
//! output; `to_vec` emits it without whitespace.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::CryptoError;

/// Serialize a value to its canonical bytes.
///
/// This is the sole input format for every hash and signature in the
/// mesh. Deterministic: equal values produce equal bytes regardless of
/// struct field order or map insertion order.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CryptoError> {
    let normalized = serde_json::to_value(value)?;
    Ok(serde_json::to_vec(&normalized)?)
}

/// Full SHA-256 digest as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Truncated SHA-256 digest: the first `len` hex characters.
///
/// Record formats pin specific truncations (40 for payload and snapshot
/// hashes, 16 for policy hashes); callers pass the length their field
/// requires.
pub fn sha256_trunc_hex(data: &[u8], len: usize) -> String {
    let mut digest = sha256_hex(data);
    digest.truncate(len);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_bytes_sorts_keys() {
        let value = json!({"zebra": 1, "alpha": 2, "nested": {"z": 0, "a": 1}});
        let bytes = canonical_bytes(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"alpha":2,"nested":{"a":1,"z":0},"zebra":1}"#
        );
    }

    #[test]
    fn test_canonical_bytes_deterministic() {
        let a = json!({"value": 42, "confidence": 0.9});
        let b = json!({"confidence": 0.9, "value": 42});
        assert_eq!(
            canonical_bytes(&a).unwrap(),
            canonical_bytes(&b).unwrap()
        );
    }

    #[test]
    fn test_canonical_bytes_compact() {
        let bytes = canonical_bytes(&json!({"a": [1, 2, 3]})).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains(' '));
        assert_eq!(text, r#"{"a":[1,2,3]}"#);
    }

    #[test]
    fn test_sha256_trunc_hex_length() {
        let digest = sha256_trunc_hex(b"payload", 40);
        assert_eq!(digest.len(), 40);
        assert!(sha256_hex(b"payload").starts_with(&digest));
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
