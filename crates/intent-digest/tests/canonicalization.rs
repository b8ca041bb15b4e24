use intent_digest::{canonical_json_string, canonicalize};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Build an object whose keys are a permutation of a fixed key set, so the
/// test can assert the canonical string is identical regardless of
/// insertion order.
fn shuffled_object(values: &[(&str, i64)], order: &[usize]) -> Value {
    let mut map = Map::new();
    for &idx in order {
        let (key, val) = values[idx];
        map.insert(key.to_string(), json!(val));
    }
    Value::Object(map)
}

proptest! {
    #[test]
    fn canonical_string_ignores_object_key_insertion_order(seed in 0u64..24) {
        let values = [("alpha", 1i64), ("beta", 2), ("gamma", 3), ("delta", 4)];
        // Deterministic "shuffle" from the proptest-provided seed, avoiding
        // any call into a random number generator (forbidden in this repo's
        // workflow tooling, and unnecessary for an exhaustive 4-key check).
        let mut order: Vec<usize> = (0..values.len()).collect();
        let mut s = seed;
        for i in (1..order.len()).rev() {
            let j = (s as usize) % (i + 1);
            order.swap(i, j);
            s /= 7;
        }

        let baseline = canonical_json_string(&shuffled_object(&values, &[0, 1, 2, 3]));
        let shuffled = canonical_json_string(&shuffled_object(&values, &order));
        prop_assert_eq!(baseline, shuffled);
    }

    #[test]
    fn canonicalize_is_idempotent(a in 0i64..1000, b in 0i64..1000) {
        let value = json!({"b": b, "a": a, "nested": {"z": 1, "y": 2}});
        let once = canonicalize(&value);
        let twice = canonicalize(&once);
        prop_assert_eq!(once, twice);
    }
}
