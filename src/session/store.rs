use super::codec::{CodecError, CodecSet, SecureCookie};
use super::{Session, SessionError, SessionStore, NS_SESSION, SESSION_ID_KEY};
use crate::resolve::{resolve, to_map, Bind};
use crate::runtime_config::RuntimeConfig;
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, warn};

/// Session store keeping the whole payload inside the session identifier.
///
/// The payload's `session`-tagged fields are encoded into an authenticated
/// (and, with an encryption key, encrypted) token that replaces the
/// identifier on every save. The store's only state is its immutable codec
/// set, so one instance can serve every request concurrently.
pub struct CookieStore<T> {
    codecs: CodecSet,
    _payload: PhantomData<fn() -> T>,
}

impl<T> CookieStore<T> {
    /// Store with a single key pair. `encryption_key` of `None` signs
    /// without encrypting.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] for an empty authentication key or an
    /// encryption key that is not 16 or 32 bytes.
    pub fn new(authentication_key: &[u8], encryption_key: Option<&[u8]>) -> Result<Self, CodecError> {
        Self::new_with(authentication_key, encryption_key, &RuntimeConfig::default())
    }

    /// Like [`CookieStore::new`], applying the cookie limits of `config`.
    ///
    /// # Errors
    ///
    /// See [`CookieStore::new`].
    pub fn new_with(
        authentication_key: &[u8],
        encryption_key: Option<&[u8]>,
        config: &RuntimeConfig,
    ) -> Result<Self, CodecError> {
        let codec = SecureCookie::new(authentication_key, encryption_key)?.with_config(config);
        Ok(Self::with_codecs(CodecSet::default().with_codec(codec)))
    }

    /// Store over an explicit codec set (key rotation, custom codecs).
    #[must_use]
    pub fn with_codecs(codecs: CodecSet) -> Self {
        Self {
            codecs,
            _payload: PhantomData,
        }
    }

    /// The codec set used for encoding and decoding
    #[must_use]
    pub fn codecs(&self) -> &CodecSet {
        &self.codecs
    }
}

impl<T> fmt::Debug for CookieStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieStore")
            .field("codecs", &self.codecs)
            .field("payload", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Bind + Default> SessionStore<T> for CookieStore<T> {
    fn load(&self, session: &Session) -> Result<T, SessionError> {
        let mut payload = T::default();
        if session.is_empty() {
            debug!("Empty session, using default payload");
            return Ok(payload);
        }

        let values = self.codecs.decode(SESSION_ID_KEY, session.id()).map_err(|err| {
            warn!(error = %err, "Session token rejected");
            SessionError::Codec(err)
        })?;

        let report = resolve(&mut payload, false, NS_SESSION, |key| values.get(key).cloned())?;
        debug!(
            resolved = report.resolved,
            skipped = report.skipped.len(),
            "Session loaded"
        );
        Ok(payload)
    }

    fn save(&self, session: &mut Session, payload: &T) -> Result<(), SessionError> {
        let values = to_map(payload, NS_SESSION)?;
        let token = self.codecs.encode(SESSION_ID_KEY, &values)?;
        debug!(fields = values.len(), token_len = token.len(), "Session saved");
        session.set_id(token);
        Ok(())
    }
}
