//! # Resolve Module
//!
//! Tag-driven field resolution shared by the request binder and the session
//! store.
//!
//! ## Overview
//!
//! A record type declares, per field, which *namespaces* it participates in
//! and under which key:
//!
//! ```rust
//! use fieldbind::Bind;
//!
//! #[derive(Bind, Default)]
//! struct CreateItem {
//!     #[bind(param = "id")]
//!     id: String,
//!     #[bind(json = "count", form = "count")]
//!     count: i64,
//!     #[bind(json = "-")]
//!     internal: bool,
//! }
//! ```
//!
//! `#[derive(Bind)]` compiles those tags into a [`Descriptor`]: a table of
//! typed setters/getters built on first use and cached for the life of the
//! process. [`resolve`] walks the bindings of one namespace, asks a lookup
//! function for each key and coerces the returned [`Value`] into the field.
//!
//! ## Strictness
//!
//! | Mode | Absent value | Coercion failure |
//! |------|--------------|------------------|
//! | strict | field untouched | [`ResolveError`] |
//! | lenient | field untouched | field untouched, recorded in [`Report`] |
//!
//! The request binder resolves JSON bodies strictly and every plain-text
//! source (path, query, form) leniently.

mod coerce;
mod descriptor;

pub use coerce::{from_serde, to_serde, CoerceError, FromValue, IntoValue};
pub use descriptor::{Bind, Descriptor, FieldBinding, Getter, Setter};

use crate::value::{Map, Value};
use std::fmt;
use tracing::debug;

/// A strict-mode coercion failure for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveError {
    /// Rust field name
    pub field: &'static str,
    /// Namespace being resolved
    pub namespace: &'static str,
    /// Lookup key of the field in that namespace
    pub key: &'static str,
    /// Rendering of the offending value
    pub value: String,
    /// Underlying coercion failure
    pub source: CoerceError,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field `{}` ({} key {:?}): cannot use {}: {}",
            self.field, self.namespace, self.key, self.value, self.source
        )
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Outcome of a resolution pass.
///
/// `skipped` lists lenient-mode coercion failures: the fields kept their
/// previous value exactly as if the source had not supplied them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    /// Number of fields set from the source
    pub resolved: usize,
    /// Lenient coercion failures, in field order
    pub skipped: Vec<ResolveError>,
}

impl Report {
    /// Append another pass's results.
    pub fn merge(&mut self, other: Report) {
        self.resolved += other.resolved;
        self.skipped.extend(other.skipped);
    }
}

/// Populate `target`'s fields tagged for `namespace` from `lookup`.
///
/// `lookup` is called once per binding with its key. Absent results
/// ([`Value::is_absent`]) leave the field untouched. In strict mode the first
/// coercion failure aborts; fields resolved before it stay set, so callers
/// must discard `target` on error.
pub fn resolve<T, F>(target: &mut T, strict: bool, namespace: &str, mut lookup: F) -> Result<Report, ResolveError>
where
    T: Bind,
    F: FnMut(&str) -> Option<Value>,
{
    let mut report = Report::default();

    for binding in T::descriptor().bindings_in(namespace) {
        let Some(value) = lookup(binding.key()) else {
            continue;
        };
        if value.is_absent() {
            continue;
        }

        match binding.set(target, &value) {
            Ok(()) => report.resolved += 1,
            Err(source) => {
                let err = ResolveError {
                    field: binding.field(),
                    namespace: binding.namespace(),
                    key: binding.key(),
                    value: value.to_string(),
                    source,
                };
                if strict {
                    debug!(namespace = %namespace, field = err.field, error = %err, "Strict field rejected");
                    return Err(err);
                }
                debug!(namespace = %namespace, field = err.field, error = %err, "Lenient field skipped");
                report.skipped.push(err);
            }
        }
    }

    Ok(report)
}

/// Render `source`'s fields tagged for `namespace` as a key → value map.
///
/// Every binding produces an entry, including ones whose value is null.
///
/// # Errors
///
/// A [`ResolveError`] for the first field whose value cannot be rendered
/// (a `#[bind(serde)]` field whose `Serialize` impl fails).
pub fn to_map<T: Bind>(source: &T, namespace: &str) -> Result<Map, ResolveError> {
    T::descriptor()
        .bindings_in(namespace)
        .map(|binding| {
            binding
                .get(source)
                .map(|value| (binding.key().to_string(), value))
                .map_err(|err| ResolveError {
                    field: binding.field(),
                    namespace: binding.namespace(),
                    key: binding.key(),
                    value: "<unserializable>".to_string(),
                    source: err,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bind;
    use std::collections::HashMap;

    #[derive(Debug, Default, PartialEq, Bind)]
    struct Sample {
        #[bind(query = "name", json)]
        name: String,
        #[bind(query, json = "age")]
        age: u32,
        #[bind(json = "-", query = "active")]
        active: bool,
        #[bind(json)]
        tags: Vec<String>,
        untagged: i32,
    }

    fn lookup_from(pairs: &[(&str, Value)]) -> impl FnMut(&str) -> Option<Value> {
        let map: HashMap<String, Value> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_descriptor_is_cached() {
        let a = Sample::descriptor() as *const Descriptor<Sample>;
        let b = Sample::descriptor() as *const Descriptor<Sample>;
        assert_eq!(a, b);
        let namespaces: Vec<_> = Sample::descriptor().namespaces().collect();
        assert_eq!(namespaces, ["json", "query"]);
    }

    #[test]
    fn test_only_namespace_fields_are_looked_up() {
        let mut asked = Vec::new();
        let mut target = Sample::default();
        resolve(&mut target, false, "query", |key| {
            asked.push(key.to_string());
            None
        })
        .unwrap();
        assert_eq!(asked, ["name", "age", "active"]);

        asked.clear();
        resolve(&mut target, false, "json", |key| {
            asked.push(key.to_string());
            None
        })
        .unwrap();
        assert_eq!(asked, ["name", "age", "tags"]);
    }

    #[test]
    fn test_absent_values_keep_existing() {
        let mut target = Sample {
            name: "keep".to_string(),
            age: 3,
            ..Sample::default()
        };
        let report = resolve(
            &mut target,
            true,
            "query",
            lookup_from(&[("name", Value::from("")), ("age", Value::Null)]),
        )
        .unwrap();
        assert_eq!(report.resolved, 0);
        assert_eq!(target.name, "keep");
        assert_eq!(target.age, 3);
    }

    #[test]
    fn test_lenient_failures_are_reported_not_raised() {
        let mut target = Sample::default();
        let report = resolve(
            &mut target,
            false,
            "query",
            lookup_from(&[
                ("name", Value::from("bob")),
                ("age", Value::from("old")),
                ("active", Value::from("true")),
            ]),
        )
        .unwrap();
        assert_eq!(target.name, "bob");
        assert_eq!(target.age, 0);
        assert!(target.active);
        assert_eq!(report.resolved, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].field, "age");
    }

    #[test]
    fn test_strict_failure_names_field_and_value() {
        let mut target = Sample::default();
        let err = resolve(
            &mut target,
            true,
            "json",
            lookup_from(&[("age", Value::from("x"))]),
        )
        .unwrap_err();
        assert_eq!(err.field, "age");
        assert_eq!(err.namespace, "json");
        let msg = err.to_string();
        assert!(msg.contains("age"), "{msg}");
        assert!(msg.contains("\"x\""), "{msg}");
    }

    #[test]
    fn test_compound_field_from_typed_value() {
        let mut target = Sample::default();
        let tags = Value::List(vec![Value::from("a"), Value::from("b")]);
        resolve(&mut target, true, "json", lookup_from(&[("tags", tags)])).unwrap();
        assert_eq!(target.tags, ["a", "b"]);

        let err = resolve(
            &mut target,
            true,
            "json",
            lookup_from(&[("tags", Value::from("a b"))]),
        )
        .unwrap_err();
        assert_eq!(err.field, "tags");
    }

    #[test]
    fn test_to_map_covers_namespace() {
        let sample = Sample {
            name: "n".to_string(),
            age: 4,
            active: true,
            tags: vec!["t".to_string()],
            untagged: 9,
        };
        let map = to_map(&sample, "query").unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("active"), Some(&Value::Bool(true)));
        assert_eq!(map.get("age"), Some(&Value::from(4u64)));
        assert!(to_map(&sample, "session").unwrap().is_empty());
    }
}
