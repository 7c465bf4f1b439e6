//! # Session Module
//!
//! Typed session payloads persisted in a tamper-evident cookie token.
//!
//! ## Overview
//!
//! A [`Session`] carries one opaque identifier string. [`CookieStore`] stores
//! the entire payload in that identifier: the payload's `session`-tagged
//! fields become a field map, the map is authenticated (and optionally
//! encrypted) by a [`SecureCookie`] codec, and the resulting token replaces
//! the identifier. Loading reverses the process.
//!
//! ```rust
//! use fieldbind::session::{CookieStore, Session, SessionStore};
//! use fieldbind::Bind;
//!
//! #[derive(Bind, Debug, Default, PartialEq)]
//! struct Visitor {
//!     #[bind(session = "uid")]
//!     user_id: u64,
//!     #[bind(session)]
//!     theme: String,
//! }
//!
//! let store = CookieStore::<Visitor>::new(b"an authentication key of 32 byte", None).unwrap();
//! let mut session = Session::new();
//!
//! // No data yet: a zero-valued payload, not an error
//! assert_eq!(store.load(&session).unwrap(), Visitor::default());
//!
//! let visitor = Visitor { user_id: 7, theme: "dark".into() };
//! store.save(&mut session, &visitor).unwrap();
//! assert_eq!(store.load(&session).unwrap(), visitor);
//! ```
//!
//! ## Failure Semantics
//!
//! - Empty identifier → `T::default()`, no error.
//! - Forged, tampered, expired or undecodable token → [`SessionError::Codec`].
//!   Treat the session as absent and issue a fresh one; retrying cannot help.
//! - Stored values that no longer fit a field → that field keeps its default.
//! - A field that cannot be serialized on save → [`SessionError::InvalidPayload`];
//!   the session identifier is left unchanged.

mod codec;
mod store;

pub use codec::{Codec, CodecError, CodecSet, SecureCookie};
pub use store::CookieStore;

use crate::resolve::ResolveError;
use std::fmt;

/// Name the payload map is encoded under; tokens issued under any other
/// name fail authentication.
pub const SESSION_ID_KEY: &str = "session_id";

/// Namespace of session payload fields
pub const NS_SESSION: &str = "session";

/// A session as seen by a store: an opaque identifier string.
///
/// An empty identifier means the session has no data yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    id: String,
}

impl Session {
    /// A session without data
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session restored from a cookie value
    #[must_use]
    pub fn from_id(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Current identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replace the identifier
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Whether the identifier is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

/// Session load/save failure.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The token could not be encoded, or failed authentication/decoding
    Codec(CodecError),
    /// A payload field could not be rendered into the token on save
    /// (a `#[bind(serde)]` field whose `Serialize` impl fails)
    InvalidPayload(ResolveError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Codec(err) => write!(f, "session: {err}"),
            SessionError::InvalidPayload(err) => write!(f, "session: invalid payload: {err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Codec(err) => Some(err),
            SessionError::InvalidPayload(err) => Some(err),
        }
    }
}

impl From<CodecError> for SessionError {
    fn from(err: CodecError) -> Self {
        SessionError::Codec(err)
    }
}

impl From<ResolveError> for SessionError {
    fn from(err: ResolveError) -> Self {
        SessionError::InvalidPayload(err)
    }
}

/// Loads and saves a typed payload through a [`Session`].
pub trait SessionStore<T> {
    /// Load the payload held by `session`.
    ///
    /// # Errors
    ///
    /// Fails when a non-empty identifier cannot be decoded.
    fn load(&self, session: &Session) -> Result<T, SessionError>;

    /// Replace `session`'s identifier with a token holding `payload`.
    ///
    /// # Errors
    ///
    /// Fails when the payload cannot be encoded.
    fn save(&self, session: &mut Session, payload: &T) -> Result<(), SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bind;

    #[derive(Debug, Default, PartialEq, Bind)]
    struct Cart {
        #[bind(session = "uid")]
        user_id: u64,
        #[bind(session)]
        items: Vec<String>,
        #[bind(session)]
        coupon: Option<String>,
        #[bind(query)]
        not_persisted: String,
    }

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn test_session_id_accessors() {
        let mut session = Session::new();
        assert!(session.is_empty());
        session.set_id("abc");
        assert_eq!(session.id(), "abc");
        assert_eq!(Session::from_id("abc"), session);
    }

    #[test]
    fn test_save_replaces_identifier() {
        let store = CookieStore::<Cart>::new(KEY, None).unwrap();
        let mut session = Session::from_id("stale");
        store.save(&mut session, &Cart::default()).unwrap();
        assert_ne!(session.id(), "stale");
        assert_eq!(store.load(&session).unwrap(), Cart::default());
    }

    #[test]
    fn test_only_session_fields_persist() {
        let store = CookieStore::<Cart>::new(KEY, Some(&KEY[..16])).unwrap();
        let cart = Cart {
            user_id: 5,
            items: vec!["apple".to_string(), "pear".to_string()],
            coupon: Some("SAVE10".to_string()),
            not_persisted: "dropped".to_string(),
        };
        let mut session = Session::new();
        store.save(&mut session, &cart).unwrap();

        let loaded = store.load(&session).unwrap();
        assert_eq!(loaded.user_id, 5);
        assert_eq!(loaded.items, ["apple", "pear"]);
        assert_eq!(loaded.coupon.as_deref(), Some("SAVE10"));
        assert_eq!(loaded.not_persisted, "");
    }

    #[test]
    fn test_foreign_token_is_an_error() {
        let store = CookieStore::<Cart>::new(KEY, None).unwrap();
        let err = store.load(&Session::from_id("garbage")).unwrap_err();
        assert!(matches!(err, SessionError::Codec(_)));
        assert!(err.to_string().starts_with("session: "));
    }

    #[test]
    fn test_store_is_shareable() {
        fn assert_send_sync<S: Send + Sync>() {}
        assert_send_sync::<CookieStore<Cart>>();
        assert_send_sync::<CookieStore<std::rc::Rc<u8>>>();
    }
}
