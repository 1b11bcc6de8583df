//! Fingerprint Module
//!
//! Deterministic content hashes for cached values. Values are encoded as
//! compact JSON with object keys sorted at every depth, then digested with
//! SHA-256, so structurally equal values always share a fingerprint.

use std::fmt::Debug;

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

// == Fingerprint ==
/// Returns the hex SHA-256 fingerprint of a JSON value.
pub fn fingerprint(value: &Value) -> String {
    digest(canonical_json(value).as_bytes())
}

/// Fingerprints any serializable value.
///
/// Values that cannot be represented as JSON (e.g. maps with non-string keys)
/// are fingerprinted from their `Debug` text instead. This never fails.
pub fn fingerprint_of<T: Serialize + Debug + ?Sized>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(json) => fingerprint(&json),
        Err(_) => digest(format!("{:?}", value).as_bytes()),
    }
}

// == Canonical Encoding ==
/// Compact JSON text with recursively sorted object keys.
pub fn canonical_json(value: &Value) -> String {
    sorted(value).to_string()
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), sorted(&map[key]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
