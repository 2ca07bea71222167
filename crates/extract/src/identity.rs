//! Content identity hashing.
//!
//! Two values that serialize to the same JSON *data* must hash the same,
//! however their maps happened to be ordered, so JSON is canonicalized
//! (keys sorted recursively, compact separators) before hashing.

use exn::ResultExt;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ErrorKind, Result};

/// Hash of the canonical JSON form of `value`.
pub fn content_hash(value: &impl Serialize) -> Result<String> {
    let value = serde_json::to_value(value).or_raise(|| ErrorKind::Serialization)?;
    Ok(value_hash(value))
}

/// Hash of an already-parsed JSON value.
pub fn value_hash(value: Value) -> String {
    bytes_hash(canonical_json(value).as_bytes())
}

/// Hash of raw bytes, for content that isn't structured.
pub fn bytes_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_string()
}

/// Compact JSON with object keys sorted at every depth.
pub fn canonical_json(value: Value) -> String {
    canonicalize(value).to_string()
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (key, value) in entries {
                sorted.insert(key, canonicalize(value));
            }
            Value::Object(sorted)
        },
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        scalar => scalar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_affect_hash() {
        let a = json!({"b": 1, "a": {"y": [1, 2], "x": null}});
        let b = json!({"a": {"x": null, "y": [1, 2]}, "b": 1});
        assert_eq!(value_hash(a), value_hash(b));
    }

    #[test]
    fn array_order_does_affect_hash() {
        assert_ne!(value_hash(json!([1, 2])), value_hash(json!([2, 1])));
    }

    #[test]
    fn canonical_form_is_compact_and_sorted() {
        assert_eq!(canonical_json(json!({"b": [true], "a": "x"})), r#"{"a":"x","b":[true]}"#);
    }

    #[test]
    fn structs_hash_like_their_json() {
        #[derive(Serialize)]
        struct Marker<'a> {
            zeta: &'a str,
            alpha: u8,
        }
        let hashed = content_hash(&Marker { zeta: "z", alpha: 1 }).unwrap();
        assert_eq!(hashed, value_hash(json!({"alpha": 1, "zeta": "z"})));
        assert_eq!(hashed.len(), 64);
    }
}
