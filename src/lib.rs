//! # fieldbind
//!
//! **fieldbind** fills typed Rust records from the sources of an HTTP request
//! and persists typed session payloads in tamper-evident cookie tokens, both
//! driven by declarative `#[bind(...)]` field tags.
//!
//! ## Architecture
//!
//! - **[`value`]** - [`Value`], the tagged union every source hands to the resolver
//! - **[`resolve`]** - compiled per-type binding descriptors and strict/lenient coercion
//! - **[`binder`]** - method/content-type dispatch over path, query, JSON and form sources
//! - **[`session`]** - [`session::CookieStore`] and the HMAC/AES-GCM cookie codec
//! - **[`runtime_config`]** - environment configuration
//! - **[`cli`]** - token inspection commands behind the `fieldbind` binary
//!
//! ### Request Binding Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Handler
//!     participant Binder
//!     participant Resolver as resolve()
//!     participant Descriptor as T::descriptor()
//!
//!     Handler->>Binder: bind::<T>(request)
//!     Binder->>Resolver: "param" (lenient, PathParams)
//!     Resolver->>Descriptor: bindings in "param"
//!     Binder->>Resolver: "query" (lenient, space-joined)
//!
//!     alt GET / HEAD
//!         Binder-->>Handler: T
//!     else POST / PUT / DELETE / PATCH
//!         alt application/json
//!             Binder->>Binder: read + parse body object
//!             Binder->>Resolver: "json" (strict)
//!         else application/x-www-form-urlencoded
//!             Binder->>Binder: read + parse form
//!             Binder->>Resolver: "form" (lenient, space-joined)
//!         else other
//!             Binder-->>Handler: 400 unsupported content type
//!         end
//!         Binder-->>Handler: T or 400
//!     else other method
//!         Binder-->>Handler: 400 unsupported method
//!     end
//! ```
//!
//! ### Session Flow
//!
//! ```text
//! save:  T ──to_map("session")──▶ Map ──SecureCookie::encode──▶ token ──▶ Session::set_id
//! load:  Session::id ──SecureCookie::decode──▶ Map ──resolve("session")──▶ T
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use fieldbind::{binder::PathParams, Bind, Binder};
//!
//! #[derive(Bind, Debug, Default)]
//! struct UpdateItem {
//!     #[bind(param = "id")]
//!     id: u64,
//!     #[bind(json = "count")]
//!     count: i64,
//!     #[bind(query = "dry_run")]
//!     dry_run: bool,
//! }
//!
//! let mut req = http::Request::put("/items/42?dry_run=true")
//!     .header("content-type", "application/json")
//!     .body(&br#"{"count": 3}"#[..])
//!     .unwrap();
//! req.extensions_mut().insert(PathParams::from_iter([("id", "42")]));
//!
//! let item: UpdateItem = Binder::default().bind(req).unwrap();
//! assert_eq!((item.id, item.count, item.dry_run), (42, 3, true));
//! ```
//!
//! ## Strictness
//!
//! JSON bodies are expected to match the record's schema, so a mistyped
//! JSON field is a `400 Bad Request`. Path, query and form values are
//! loosely typed web input: a value that does not coerce leaves the field at
//! its default and is listed in the [`Report`] returned by
//! [`Binder::bind_with_report`].

extern crate self as fieldbind;

pub mod binder;
pub mod cli;
pub mod resolve;
pub mod runtime_config;
pub mod session;
pub mod value;

pub use binder::{bind, BindError, Binder, BinderConfig, PathParams};
pub use fieldbind_macros::Bind;
pub use resolve::{
    resolve, to_map, Bind, CoerceError, Descriptor, FieldBinding, FromValue, IntoValue, Report,
    ResolveError,
};
pub use runtime_config::RuntimeConfig;
pub use session::{CookieStore, Session, SessionError, SessionStore};
pub use value::{Map, Value};
