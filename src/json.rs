// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! JSON values as replicated elements, keys and register values.
//!
//! A [`serde_json::Value`] is encoded as its compact JSON text under the
//! [`JSON_TYPE_URL`]. Object keys are written in sorted order at every level of nesting,
//! regardless of the order the value keeps them in, so equal values always produce the same
//! bytes. That makes the encoding usable as a comparable key:
//!
//! ```json
//! {"name":"John Doe","phones":["+44 1234567"]}
//! ```
use crate::support::{AnyValue, SerializedAny, SupportError};
use serde::Serializer;
use serde_json::Value;

/// Type url of JSON encoded values.
pub const JSON_TYPE_URL: &str = "json.akkaserverless.com/value";

/// Serializes a value with the keys of every object sorted.
///
/// `serde_json` only keeps objects sorted as long as its `preserve_order` feature is off,
/// which any crate in the dependency graph can turn on.
struct Canonical<'a>(&'a Value);

impl serde::Serialize for Canonical<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            Value::Array(items) => serializer.collect_seq(items.iter().map(Canonical)),
            Value::Object(entries) => {
                let mut sorted: Vec<_> = entries.iter().collect();
                sorted.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
                serializer.collect_map(sorted.into_iter().map(|(k, v)| (k, Canonical(v))))
            }
            other => serde::Serialize::serialize(other, serializer),
        }
    }
}

impl AnyValue for Value {
    fn serialize(&self) -> SerializedAny {
        SerializedAny::new(
            JSON_TYPE_URL,
            // NOTE: cannot fail, the object keys of a `Value` are always strings.
            serde_json::to_vec(&Canonical(self))
                .expect("serde_json::Value is always serializable"),
        )
    }

    fn deserialize(any: &SerializedAny) -> Result<Self, SupportError> {
        let bytes = any.expect_type(JSON_TYPE_URL)?;
        serde_json::from_slice(bytes).map_err(|e| SupportError::Json(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_keys_do_not_affect_comparable_key() {
        let a: Value = serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b": 2, "a": 1}"#).unwrap();
        assert_eq!(a.to_comparable(), b.to_comparable());
    }

    #[test]
    fn nested_objects_are_encoded_with_sorted_keys() {
        let v = json!([{"b": 1, "a": {"d": 2, "c": [{"z": null, "y": true}]}}]);
        assert_eq!(
            std::str::from_utf8(&v.serialize().value).unwrap(),
            r#"[{"a":{"c":[{"y":true,"z":null}],"d":2},"b":1}]"#
        );
        let reordered = json!([{"a": {"c": [{"y": true, "z": null}], "d": 2}, "b": 1}]);
        assert_eq!(v.to_comparable(), reordered.to_comparable());
    }

    #[test]
    fn wire_roundtrip_preserves_value() {
        let v = json!({"name": "John Doe", "age": 43, "phones": ["+44 1234567"]});
        assert_eq!(Value::deserialize(&v.serialize()).unwrap(), v);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let any = SerializedAny::new(JSON_TYPE_URL, b"{".to_vec());
        assert!(matches!(
            Value::deserialize(&any),
            Err(SupportError::Json(_))
        ));
    }
}
