//! Deterministic JSON serialization for signing.
//!
//! `serde_json::Map` is a `BTreeMap` (the `preserve_order` feature stays
//! off), so keys come out in byte order at every depth and the compact
//! writer adds no whitespace. The tests below pin that output.

use serde_json::Value;

/// Serializes `value` canonically.
pub fn to_canonical_string(value: &Value) -> String {
    value.to_string()
}

/// Same as [`to_canonical_string`], as bytes ready for a signature.
pub fn to_canonical_bytes(value: &Value) -> Vec<u8> {
    to_canonical_string(value).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted_at_every_level() {
        let value = json!({"b": 1, "a": {"z": true, "y": null}});
        assert_eq!(to_canonical_string(&value), r#"{"a":{"y":null,"z":true},"b":1}"#);
    }

    #[test]
    fn arrays_keep_their_order() {
        let value = json!(["b", "a", 3]);
        assert_eq!(to_canonical_string(&value), r#"["b","a",3]"#);
    }

    #[test]
    fn objects_inside_arrays_are_sorted_too() {
        let value = json!([{"b": 2, "a": 1}]);
        assert_eq!(to_canonical_string(&value), r#"[{"a":1,"b":2}]"#);
    }

    #[test]
    fn strings_are_escaped() {
        let value = json!({"q": "say \"hi\"\n"});
        assert_eq!(to_canonical_string(&value), r#"{"q":"say \"hi\"\n"}"#);
    }

    #[test]
    fn equal_values_produce_equal_bytes() {
        let a: Value = serde_json::from_str(r#"{"x":1,"y":[1,2],"z":"s"}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{ "z" : "s", "y" : [1, 2], "x" : 1 }"#).unwrap();
        assert_eq!(to_canonical_bytes(&a), to_canonical_bytes(&b));
    }
}
