//! Wire payload codec.
//!
//! JSON is the default and always-available format. With the
//! `dense-codec` feature a MessagePack encoding is offered; encoding
//! falls back to JSON automatically when the feature is absent, and
//! decoding dispatches on the response content type, so mixed fleets
//! interoperate.

use serde_json::Value;

use crate::TransportError;

/// JSON content type.
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// Dense codec content type.
pub const CONTENT_TYPE_DENSE: &str = "application/msgpack";

/// Encode a payload. Returns the bytes and their content type.
pub fn encode_payload(value: &Value, prefer_dense: bool) -> Result<(Vec<u8>, &'static str), TransportError> {
    #[cfg(feature = "dense-codec")]
    if prefer_dense {
        let bytes = rmp_serde::to_vec_named(value).map_err(|e| TransportError::Codec(e.to_string()))?;
        return Ok((bytes, CONTENT_TYPE_DENSE));
    }
    #[cfg(not(feature = "dense-codec"))]
    let _ = prefer_dense;

    let bytes = serde_json::to_vec(value).map_err(|e| TransportError::Codec(e.to_string()))?;
    Ok((bytes, CONTENT_TYPE_JSON))
}

/// Decode a payload by content type.
pub fn decode_payload(raw: &[u8], content_type: &str) -> Result<Value, TransportError> {
    #[cfg(feature = "dense-codec")]
    if content_type.contains("msgpack") {
        return rmp_serde::from_slice(raw).map_err(|e| TransportError::Codec(e.to_string()));
    }
    let _ = content_type;

    serde_json::from_slice(raw).map_err(|e| TransportError::Codec(e.to_string()))
}
