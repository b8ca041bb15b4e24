use serde_json::{Map, Value};

/// Serialize a [`Value`] to canonical JSON: object keys are sorted
/// alphabetically at every nesting level, array element order is preserved
/// verbatim. This is the property the digest stability invariant in
/// `spec.md` §8 depends on — reordering object keys must not change the
/// digest, but reordering array elements (actions within a tx, txs within a
/// batch) must.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted = Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Canonical JSON string for a value, suitable for hashing.
///
/// `serde_json::to_string` on a `Map` built with sorted keys preserves
/// insertion order (serde_json's default `Map` is an ordered map unless the
/// `preserve_order` feature is disabled and `BTreeMap` is used instead), so
/// canonicalizing before serializing is sufficient; no custom writer needed.
pub fn canonical_json_string(value: &Value) -> String {
    serde_json::to_string(&canonicalize(value)).expect("Value serialization cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_key_order_does_not_affect_canonical_string() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonical_json_string(&a), canonical_json_string(&b));
    }

    #[test]
    fn array_order_is_preserved_and_significant() {
        let a = json!([1, 2, 3]);
        let b = json!([3, 2, 1]);
        assert_ne!(canonical_json_string(&a), canonical_json_string(&b));
    }

    #[test]
    fn nested_objects_are_sorted_recursively() {
        let a = json!({"outer": {"z": 1, "a": {"y": 2, "x": 3}}});
        let expected = r#"{"outer":{"a":{"x":3,"y":2},"z":1}}"#;
        assert_eq!(canonical_json_string(&a), expected);
    }
}
