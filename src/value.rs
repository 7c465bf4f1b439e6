//! # Value
//!
//! The interchange type between request/session sources and the resolver.
//!
//! Sources hand the resolver a [`Value`]: query, form and path lookups produce
//! [`Value::String`], the JSON body and session tokens produce whatever typed
//! value was encoded. Coercion in [`crate::resolve`] matches on this enum, so
//! every source/target pairing is handled exhaustively.

use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::collections::BTreeMap;
use std::fmt;

/// Field-name → value mapping carried by session tokens and `to_map`.
pub type Map = BTreeMap<String, Value>;

/// A loosely-typed value supplied by a lookup function.
///
/// Serializes to (and deserializes from) the natural JSON shape: `null`,
/// booleans, numbers, strings, arrays and objects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer or floating point number.
    Number(Number),
    /// A string, as produced by every plain-text source.
    String(String),
    /// An ordered list.
    List(Vec<Value>),
    /// A string-keyed mapping.
    Map(Map),
}

impl Value {
    /// Whether the resolver treats this value as "not supplied".
    ///
    /// Null and the empty string both mean absent; the target field keeps
    /// its current value.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Name of the variant, used in coercion error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Borrow the inner string, if this is a [`Value::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Build a number value from a float.
    ///
    /// JSON has no representation for infinities or NaN, so non-finite floats
    /// become their text form (`"inf"`, `"-inf"`, `"NaN"`), which the float
    /// coercions parse back.
    #[must_use]
    pub fn from_f64(f: f64) -> Value {
        match Number::from_f64(f) {
            Some(n) => Value::Number(n),
            None => Value::String(f.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            other => {
                let json = serde_json::to_string(other).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Value::Number(n),
            Value::String(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_values() {
        assert!(Value::Null.is_absent());
        assert!(Value::from("").is_absent());
        assert!(!Value::from("0").is_absent());
        assert!(!Value::Bool(false).is_absent());
        assert!(!Value::List(Vec::new()).is_absent());
    }

    #[test]
    fn test_json_conversion_preserves_shape() {
        let raw = json!({"a": [1, 2.5, "x"], "b": {"c": null, "d": true}});
        let value = Value::from(raw.clone());
        match &value {
            Value::Map(map) => {
                assert!(matches!(map.get("a"), Some(Value::List(items)) if items.len() == 3));
                assert!(matches!(map.get("b"), Some(Value::Map(_))));
            }
            other => panic!("expected map, got {other:?}"),
        }
        assert_eq!(serde_json::Value::from(value), raw);
    }

    #[test]
    fn test_untagged_serde_shape() {
        let mut map = Map::new();
        map.insert("n".to_string(), Value::from(7i64));
        map.insert("s".to_string(), Value::from("hi"));
        map.insert("z".to_string(), Value::Null);
        let text = serde_json::to_string(&map).unwrap();
        assert_eq!(text, r#"{"n":7,"s":"hi","z":null}"#);
        let back: Map = serde_json::from_str(&text).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_non_finite_float_is_text() {
        assert_eq!(Value::from_f64(f64::INFINITY), Value::from("inf"));
        assert_eq!(Value::from_f64(f64::NEG_INFINITY), Value::from("-inf"));
        assert_eq!(Value::from_f64(f64::NAN), Value::from("NaN"));
        assert_eq!(Value::from_f64(1.5).kind(), "number");
    }

    #[test]
    fn test_display_quotes_strings() {
        assert_eq!(Value::from("x").to_string(), "\"x\"");
        assert_eq!(Value::from(3i64).to_string(), "3");
    }
}
