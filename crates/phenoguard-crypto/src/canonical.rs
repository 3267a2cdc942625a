//! Canonical JSON: sorted keys, no whitespace.
//!
//! Gives records a deterministic byte form regardless of field order, so
//! signatures and digests computed over it are reproducible.

use serde::Serialize;
use serde_json::Value;

use crate::error::CryptoError;

fn encode_scalar<T: Serialize + ?Sized>(value: &T) -> Result<String, CryptoError> {
    serde_json::to_string(value).map_err(|e| CryptoError::SerializationError(e.to_string()))
}

/// Canonical JSON serialization of a `serde_json::Value`.
pub fn canonical_json(value: &Value) -> Result<String, CryptoError> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
        Value::Number(n) => {
            if n.as_f64().is_some_and(|f| !f.is_finite()) {
                return Err(CryptoError::NonFiniteNumber);
            }
            encode_scalar(n)
        }
        Value::String(s) => encode_scalar(s),
        Value::Array(arr) => {
            let items: Result<Vec<String>, _> = arr.iter().map(canonical_json).collect();
            Ok(format!("[{}]", items?.join(",")))
        }
        Value::Object(obj) => {
            let mut keys: Vec<&String> = obj.keys().collect();
            keys.sort();
            let pairs: Result<Vec<String>, CryptoError> = keys
                .iter()
                .map(|k| Ok(format!("{}:{}", encode_scalar(*k)?, canonical_json(&obj[*k])?)))
                .collect();
            Ok(format!("{{{}}}", pairs?.join(",")))
        }
    }
}

/// Canonical byte form of any serializable value.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CryptoError> {
    let value =
        serde_json::to_value(value).map_err(|e| CryptoError::SerializationError(e.to_string()))?;
    Ok(canonical_json(&value)?.into_bytes())
}
