use crate::value::{Map, Value};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Why a value could not be coerced into a field's declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum CoerceError {
    /// The value's variant cannot represent the target type at all
    /// (e.g. a list for a `String`, or a string for a `Vec<T>`).
    Mismatch {
        /// Rust type the field was declared with
        expected: &'static str,
        /// Variant of the value that was supplied
        found: &'static str,
    },
    /// The value had a compatible shape but its content did not parse
    /// (e.g. `"x"` for an `i64`, or `300` for a `u8`).
    Invalid {
        /// Rust type the field was declared with
        expected: &'static str,
        /// Parser or range message
        reason: String,
    },
}

impl CoerceError {
    fn mismatch(expected: &'static str, value: &Value) -> Self {
        CoerceError::Mismatch {
            expected,
            found: value.kind(),
        }
    }

    fn invalid(expected: &'static str, reason: impl fmt::Display) -> Self {
        CoerceError::Invalid {
            expected,
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for CoerceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoerceError::Mismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            CoerceError::Invalid { expected, reason } => {
                write!(f, "invalid {expected}: {reason}")
            }
        }
    }
}

impl std::error::Error for CoerceError {}

/// Types a bound field may be declared with.
///
/// Scalars accept either an already-typed value or a string to parse.
/// Compound types (`Vec`, maps) only accept already-typed values.
pub trait FromValue: Sized {
    /// Coerce a non-absent value into `Self`.
    fn from_value(value: &Value) -> Result<Self, CoerceError>;
}

/// Reverse of [`FromValue`], used when a record is written out (session save).
pub trait IntoValue {
    /// Render `self` as a [`Value`].
    fn to_value(&self) -> Value;
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(CoerceError::mismatch("String", other)),
        }
    }
}

impl IntoValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

/// Boolean spellings accepted from text sources.
fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => {
                parse_bool(s).ok_or_else(|| CoerceError::invalid("bool", format!("{s:?} is not a boolean")))
            }
            other => Err(CoerceError::mismatch("bool", other)),
        }
    }
}

impl IntoValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! signed_value {
    ($($ty:ty),*) => {$(
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self, CoerceError> {
                match value {
                    Value::Number(n) => {
                        let wide = n.as_i64().ok_or_else(|| {
                            CoerceError::invalid(stringify!($ty), format!("{n} is not an integer in range"))
                        })?;
                        <$ty>::try_from(wide).map_err(|e| CoerceError::invalid(stringify!($ty), e))
                    }
                    Value::String(s) => s
                        .parse::<$ty>()
                        .map_err(|e| CoerceError::invalid(stringify!($ty), e)),
                    other => Err(CoerceError::mismatch(stringify!($ty), other)),
                }
            }
        }

        impl IntoValue for $ty {
            fn to_value(&self) -> Value {
                Value::Number(i64::from(*self).into())
            }
        }
    )*};
}

macro_rules! unsigned_value {
    ($($ty:ty),*) => {$(
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self, CoerceError> {
                match value {
                    Value::Number(n) => {
                        let wide = n.as_u64().ok_or_else(|| {
                            CoerceError::invalid(stringify!($ty), format!("{n} is not an unsigned integer in range"))
                        })?;
                        <$ty>::try_from(wide).map_err(|e| CoerceError::invalid(stringify!($ty), e))
                    }
                    Value::String(s) => s
                        .parse::<$ty>()
                        .map_err(|e| CoerceError::invalid(stringify!($ty), e)),
                    other => Err(CoerceError::mismatch(stringify!($ty), other)),
                }
            }
        }

        impl IntoValue for $ty {
            fn to_value(&self) -> Value {
                Value::Number(u64::from(*self).into())
            }
        }
    )*};
}

signed_value!(i8, i16, i32, i64);
unsigned_value!(u8, u16, u32, u64);

impl FromValue for isize {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        let wide = i64::from_value(value)?;
        isize::try_from(wide).map_err(|e| CoerceError::invalid("isize", e))
    }
}

impl IntoValue for isize {
    fn to_value(&self) -> Value {
        // isize is at most 64 bits on every supported target
        Value::Number((*self as i64).into())
    }
}

impl FromValue for usize {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        let wide = u64::from_value(value)?;
        usize::try_from(wide).map_err(|e| CoerceError::invalid("usize", e))
    }
}

impl IntoValue for usize {
    fn to_value(&self) -> Value {
        Value::Number((*self as u64).into())
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| CoerceError::invalid("f64", format!("{n} is not representable"))),
            Value::String(s) => s.parse::<f64>().map_err(|e| CoerceError::invalid("f64", e)),
            other => Err(CoerceError::mismatch("f64", other)),
        }
    }
}

impl IntoValue for f64 {
    fn to_value(&self) -> Value {
        Value::from_f64(*self)
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::String(s) => s.parse::<f32>().map_err(|e| CoerceError::invalid("f32", e)),
            other => f64::from_value(other)
                .map(|f| f as f32)
                .map_err(|_| CoerceError::mismatch("f32", other)),
        }
    }
}

impl IntoValue for f32 {
    fn to_value(&self) -> Value {
        Value::from_f64(f64::from(*self))
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        T::from_value(value).map(Some)
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map(IntoValue::to_value).unwrap_or(Value::Null)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            other => Err(CoerceError::mismatch("Vec", other)),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(IntoValue::to_value).collect())
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k.clone(), v)))
                .collect(),
            other => Err(CoerceError::mismatch("BTreeMap", other)),
        }
    }
}

impl<T: IntoValue> IntoValue for BTreeMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }
}

impl<T: FromValue> FromValue for HashMap<String, T> {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k.clone(), v)))
                .collect(),
            other => Err(CoerceError::mismatch("HashMap", other)),
        }
    }
}

impl<T: IntoValue> IntoValue for HashMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect::<Map>())
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        Ok(value.clone())
    }
}

impl IntoValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> Result<Self, CoerceError> {
        Ok(value.clone().into())
    }
}

impl IntoValue for serde_json::Value {
    fn to_value(&self) -> Value {
        self.clone().into()
    }
}

/// Setter used by `#[bind(serde)]` fields: any typed value the type's
/// `Deserialize` impl accepts. Plain strings are only accepted when the
/// type itself deserializes from a string.
pub fn from_serde<T: DeserializeOwned>(value: &Value) -> Result<T, CoerceError> {
    serde_json::from_value(value.clone().into()).map_err(|e| CoerceError::Invalid {
        expected: std::any::type_name::<T>(),
        reason: e.to_string(),
    })
}

/// Getter used by `#[bind(serde)]` fields.
///
/// # Errors
///
/// [`CoerceError::Invalid`] when the type's `Serialize` impl fails or
/// produces something JSON cannot hold (e.g. a map with non-string keys).
pub fn to_serde<T: Serialize>(source: &T) -> Result<Value, CoerceError> {
    serde_json::to_value(source)
        .map(Value::from)
        .map_err(|e| CoerceError::invalid(std::any::type_name::<T>(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_from_strings_and_numbers() {
        assert_eq!(i64::from_value(&Value::from("42")).unwrap(), 42);
        assert_eq!(i32::from_value(&Value::from(-7i64)).unwrap(), -7);
        assert_eq!(u16::from_value(&Value::from(9u64)).unwrap(), 9);
        assert_eq!(usize::from_value(&Value::from("12")).unwrap(), 12);
    }

    #[test]
    fn test_integer_rejections() {
        assert!(matches!(
            i64::from_value(&Value::from("x")),
            Err(CoerceError::Invalid { expected: "i64", .. })
        ));
        assert!(u8::from_value(&Value::from(300u64)).is_err());
        assert!(u32::from_value(&Value::from(-1i64)).is_err());
        assert!(i64::from_value(&Value::from_f64(1.5)).is_err());
        assert!(matches!(
            i64::from_value(&Value::Bool(true)),
            Err(CoerceError::Mismatch { expected: "i64", found: "bool" })
        ));
    }

    #[test]
    fn test_bool_spellings() {
        for s in ["1", "t", "T", "TRUE", "true", "True"] {
            assert!(bool::from_value(&Value::from(s)).unwrap(), "{s}");
        }
        for s in ["0", "f", "F", "FALSE", "false", "False"] {
            assert!(!bool::from_value(&Value::from(s)).unwrap(), "{s}");
        }
        assert!(bool::from_value(&Value::from("yes")).is_err());
    }

    #[test]
    fn test_floats() {
        assert_eq!(f64::from_value(&Value::from("2.5")).unwrap(), 2.5);
        assert_eq!(f64::from_value(&Value::from(3i64)).unwrap(), 3.0);
        assert_eq!(f32::from_value(&Value::from_f64(0.5)).unwrap(), 0.5);
        assert!(f32::from_value(&Value::Bool(true)).is_err());
    }

    #[test]
    fn test_non_finite_floats_survive_rendering() {
        for f in [f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(f64::from_value(&f.to_value()).unwrap(), f);
        }
        assert!(f64::from_value(&f64::NAN.to_value()).unwrap().is_nan());
        assert_eq!(f32::from_value(&f32::NEG_INFINITY.to_value()).unwrap(), f32::NEG_INFINITY);
    }

    #[test]
    fn test_string_requires_string() {
        assert_eq!(String::from_value(&Value::from("a")).unwrap(), "a");
        assert!(String::from_value(&Value::from(1i64)).is_err());
    }

    #[test]
    fn test_compound_types_reject_strings() {
        assert!(Vec::<i64>::from_value(&Value::from("1 2")).is_err());
        assert!(BTreeMap::<String, i64>::from_value(&Value::from("a=1")).is_err());

        let list = Value::List(vec![Value::from(1i64), Value::from("2")]);
        assert_eq!(Vec::<i64>::from_value(&list).unwrap(), vec![1, 2]);

        let mut map = Map::new();
        map.insert("k".to_string(), Value::Bool(true));
        let parsed = HashMap::<String, bool>::from_value(&Value::Map(map)).unwrap();
        assert_eq!(parsed.get("k"), Some(&true));
    }

    #[test]
    fn test_option_wraps_inner() {
        assert_eq!(Option::<u8>::from_value(&Value::from("5")).unwrap(), Some(5));
        assert_eq!(Option::<u8>::None.to_value(), Value::Null);
    }

    #[test]
    fn test_serde_helpers() {
        #[derive(Debug, PartialEq, serde::Deserialize, serde::Serialize)]
        struct Point {
            x: i32,
            y: i32,
        }
        let value = Value::from(serde_json::json!({"x": 1, "y": 2}));
        let point: Point = from_serde(&value).unwrap();
        assert_eq!(point, Point { x: 1, y: 2 });
        assert_eq!(to_serde(&point).unwrap(), value);
        assert!(from_serde::<Point>(&Value::from("1,2")).is_err());

        let tuple_keys = HashMap::from([((1u8, 2u8), 3u8)]);
        assert!(matches!(to_serde(&tuple_keys), Err(CoerceError::Invalid { .. })));
    }
}
