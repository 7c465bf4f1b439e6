//! # Binder Module
//!
//! Fills a typed record from an incoming [`http::Request`].
//!
//! ## Sources
//!
//! | Namespace | Source | Strict | Multi-valued keys |
//! |-----------|--------|--------|-------------------|
//! | `param` | [`PathParams`] request extension | no | n/a |
//! | `query` | URI query string | no | joined with `" "` |
//! | `json` | `application/json` body object | yes | n/a |
//! | `form` | `application/x-www-form-urlencoded` body, then query | no | joined with `" "` |
//!
//! ## Dispatch
//!
//! ```text
//! param + query ─┬─ GET / HEAD ─────────────────────────────▶ record
//!                ├─ POST / PUT / DELETE / PATCH
//!                │     ├─ application/json ──────── json ──▶ record
//!                │     ├─ x-www-form-urlencoded ─── form ──▶ record
//!                │     └─ other ──────────▶ UnsupportedMediaType
//!                └─ other ────────────────▶ UnsupportedMethod
//! ```
//!
//! The body is read at most once and only on the JSON and form paths.
//!
//! ## Usage
//!
//! ```rust
//! use fieldbind::{binder::{self, PathParams}, Bind};
//!
//! #[derive(Bind, Default)]
//! struct GetItem {
//!     #[bind(param = "id")]
//!     id: String,
//!     #[bind(query = "tag")]
//!     tag: String,
//! }
//!
//! let mut req = http::Request::get("/items/42?tag=red&tag=blue")
//!     .body(std::io::empty())
//!     .unwrap();
//! req.extensions_mut().insert(PathParams::from_iter([("id", "42")]));
//!
//! let item: GetItem = binder::bind(req).unwrap();
//! assert_eq!(item.id, "42");
//! assert_eq!(item.tag, "red blue");
//! ```

mod error;
mod source;

pub use error::BindError;
pub use source::{FormValues, ParamVec, PathParams, MAX_INLINE_PARAMS};

use crate::resolve::{resolve, Bind, Report};
use crate::runtime_config::RuntimeConfig;
use crate::value::Value;
use http::header::CONTENT_TYPE;
use http::{Method, Request};
use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::{debug, info_span};

/// Path parameter namespace
pub const NS_PARAM: &str = "param";
/// Query string namespace
pub const NS_QUERY: &str = "query";
/// JSON body namespace
pub const NS_JSON: &str = "json";
/// Form body namespace
pub const NS_FORM: &str = "form";

/// `Content-Type` of JSON bodies
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// `Content-Type` of URL-encoded form bodies
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// Binder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinderConfig {
    /// Largest body the binder will read, in bytes
    pub max_body_bytes: usize,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: RuntimeConfig::DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl From<&RuntimeConfig> for BinderConfig {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            max_body_bytes: config.max_body_bytes,
        }
    }
}

enum BodyKind {
    Json,
    Form,
}

/// Media type of a `Content-Type` value: parameters dropped, lowercased.
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Request binder. Holds only configuration; one instance serves every request.
#[derive(Debug, Clone, Default)]
pub struct Binder {
    config: BinderConfig,
}

impl Binder {
    /// Create a binder with the given configuration
    #[must_use]
    pub fn new(config: BinderConfig) -> Self {
        Self { config }
    }

    /// Binder configured from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(BinderConfig::from(&RuntimeConfig::from_env()))
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    /// Bind `request` into a freshly allocated `T`.
    ///
    /// # Errors
    ///
    /// Returns a [`BindError`] (always a bad request) for a mistyped JSON
    /// field, malformed JSON, an unsupported content type or method, or an
    /// unreadable/oversized body.
    pub fn bind<T, B>(&self, request: Request<B>) -> Result<T, BindError>
    where
        T: Bind + Default,
        B: Read,
    {
        self.bind_with_report(request).map(|(target, _)| target)
    }

    /// Like [`Binder::bind`], also returning the lenient-source [`Report`]
    /// so callers can see which path/query/form values were ignored.
    ///
    /// # Errors
    ///
    /// See [`Binder::bind`].
    pub fn bind_with_report<T, B>(&self, request: Request<B>) -> Result<(T, Report), BindError>
    where
        T: Bind + Default,
        B: Read,
    {
        let (parts, body) = request.into_parts();
        let span = info_span!("bind", method = %parts.method, path = %parts.uri.path());
        let _guard = span.enter();

        let mut target = T::default();
        let mut report = Report::default();

        let params = parts.extensions.get::<PathParams>();
        report.merge(resolve(&mut target, false, NS_PARAM, |key| {
            params.and_then(|p| p.get(key)).map(Value::from)
        })?);

        let query = FormValues::from_query(parts.uri.query());
        debug!(param_count = query.len(), "Query params parsed");
        report.merge(resolve(&mut target, false, NS_QUERY, |key| {
            query.joined(key).map(Value::String)
        })?);

        match parts.method {
            Method::GET | Method::HEAD => {}
            Method::POST | Method::PUT | Method::DELETE | Method::PATCH => {
                let content_type = parts
                    .headers
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                let kind = match media_type(content_type).as_str() {
                    CONTENT_TYPE_JSON => BodyKind::Json,
                    CONTENT_TYPE_FORM => BodyKind::Form,
                    _ => {
                        debug!(content_type = %content_type, "Unsupported content type");
                        return Err(BindError::UnsupportedMediaType(content_type.to_string()));
                    }
                };

                let bytes = source::read_body(body, self.config.max_body_bytes)?;
                match kind {
                    BodyKind::Json => {
                        let json = source::parse_json_object(&bytes)?;
                        report.merge(resolve(&mut target, true, NS_JSON, |key| {
                            json.get(key).cloned().map(Value::from)
                        })?);
                    }
                    BodyKind::Form => {
                        let mut form = FormValues::parse(&bytes);
                        form.append(&query);
                        debug!(field_count = form.len(), "Form body parsed");
                        report.merge(resolve(&mut target, false, NS_FORM, |key| {
                            form.joined(key).map(Value::String)
                        })?);
                    }
                }
            }
            other => {
                debug!(method = %other, "Unsupported method");
                return Err(BindError::UnsupportedMethod(other));
            }
        }

        debug!(
            resolved = report.resolved,
            skipped = report.skipped.len(),
            "Request bound"
        );
        Ok((target, report))
    }
}

/// Bind `request` into `T` with the default [`BinderConfig`].
///
/// # Errors
///
/// See [`Binder::bind`].
pub fn bind<T, B>(request: Request<B>) -> Result<T, BindError>
where
    T: Bind + Default,
    B: Read,
{
    Binder::default().bind(request)
}
