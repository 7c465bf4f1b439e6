use crate::runtime_config::RuntimeConfig;
use crate::value::Map;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

/// AES-GCM nonce length in bytes
const NONCE_LEN: usize = 12;

/// Cookie token encoding/decoding failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Authentication key is empty
    MissingHashKey,
    /// Encryption key is not 16 or 32 bytes
    InvalidBlockKey(usize),
    /// The codec set has no codecs
    NoCodecs,
    /// Token exceeds the configured maximum length
    TokenTooLong {
        /// Actual length
        len: usize,
        /// Configured maximum
        max: usize,
    },
    /// Token is not valid base64
    Base64(String),
    /// Token does not have the `timestamp|payload|mac` layout
    InvalidFormat,
    /// MAC does not match (tampered token or wrong key)
    InvalidMac,
    /// Timestamp is not a number
    InvalidTimestamp,
    /// Token is older than the configured max age
    Expired {
        /// Issue time, seconds since the epoch
        issued: u64,
        /// Configured max age in seconds
        max_age: u64,
    },
    /// Payload encryption failed
    Encrypt,
    /// Payload decryption failed
    Decrypt,
    /// Payload could not be serialized
    Serialize(String),
    /// Payload could not be deserialized into a field map
    Deserialize(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::MissingHashKey => write!(f, "securecookie: hash key is not set"),
            CodecError::InvalidBlockKey(len) => write!(
                f,
                "securecookie: block key must be 16 or 32 bytes, got {len}"
            ),
            CodecError::NoCodecs => write!(f, "securecookie: no codecs provided"),
            CodecError::TokenTooLong { len, max } => {
                write!(f, "securecookie: token length {len} exceeds {max}")
            }
            CodecError::Base64(err) => write!(f, "securecookie: invalid base64: {err}"),
            CodecError::InvalidFormat => write!(f, "securecookie: invalid token format"),
            CodecError::InvalidMac => write!(f, "securecookie: the value is not valid"),
            CodecError::InvalidTimestamp => write!(f, "securecookie: invalid timestamp"),
            CodecError::Expired { issued, max_age } => write!(
                f,
                "securecookie: expired timestamp (issued at {issued}, max age {max_age}s)"
            ),
            CodecError::Encrypt => write!(f, "securecookie: encryption failed"),
            CodecError::Decrypt => write!(f, "securecookie: decryption failed"),
            CodecError::Serialize(err) => write!(f, "securecookie: serialize: {err}"),
            CodecError::Deserialize(err) => write!(f, "securecookie: deserialize: {err}"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Authenticated (optionally encrypted) encoding of a field map under a name.
///
/// `decode(name, encode(name, v)) == v`; decoding fails for tokens that were
/// forged, issued under another name, expired, or are otherwise corrupt.
pub trait Codec: Send + Sync {
    /// Encode `values` into an opaque token.
    fn encode(&self, name: &str, values: &Map) -> Result<String, CodecError>;
    /// Verify and decode a token produced by [`Codec::encode`].
    fn decode(&self, name: &str, token: &str) -> Result<Map, CodecError>;
}

enum BlockCipher {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

impl BlockCipher {
    fn new(key: &[u8]) -> Result<Self, CodecError> {
        let invalid = |_| CodecError::InvalidBlockKey(key.len());
        match key.len() {
            16 => Aes128Gcm::new_from_slice(key).map(BlockCipher::Aes128).map_err(invalid),
            32 => Aes256Gcm::new_from_slice(key).map(BlockCipher::Aes256).map_err(invalid),
            len => Err(CodecError::InvalidBlockKey(len)),
        }
    }

    /// `nonce || ciphertext`
    fn encrypt(&self, plain: &[u8]) -> Result<Vec<u8>, CodecError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = match self {
            BlockCipher::Aes128(c) => c.encrypt(&nonce, plain),
            BlockCipher::Aes256(c) => c.encrypt(&nonce, plain),
        }
        .map_err(|_| CodecError::Encrypt)?;
        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if data.len() < NONCE_LEN {
            return Err(CodecError::Decrypt);
        }
        let (nonce, sealed) = data.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce);
        match self {
            BlockCipher::Aes128(c) => c.decrypt(nonce, sealed),
            BlockCipher::Aes256(c) => c.decrypt(nonce, sealed),
        }
        .map_err(|_| CodecError::Decrypt)
    }
}

/// HMAC-SHA256 authenticated cookie codec with optional AES-GCM encryption.
///
/// Token layout, before the outer base64url:
///
/// ```text
/// timestamp "|" base64url(payload) "|" HMAC-SHA256(name "|" timestamp "|" base64url(payload))
/// ```
///
/// where `payload` is the JSON field map, encrypted as `nonce || ciphertext`
/// when a block key is configured.
pub struct SecureCookie {
    hash_key: Vec<u8>,
    cipher: Option<BlockCipher>,
    max_age: u64,
    max_length: usize,
}

impl SecureCookie {
    /// Create a codec. `hash_key` authenticates tokens and must not be
    /// empty (32 or 64 random bytes recommended). `block_key`, when given,
    /// encrypts them and must be 16 (AES-128) or 32 (AES-256) bytes.
    ///
    /// # Errors
    ///
    /// [`CodecError::MissingHashKey`] or [`CodecError::InvalidBlockKey`].
    pub fn new(hash_key: &[u8], block_key: Option<&[u8]>) -> Result<Self, CodecError> {
        if hash_key.is_empty() {
            return Err(CodecError::MissingHashKey);
        }
        let cipher = block_key.map(BlockCipher::new).transpose()?;
        Ok(Self {
            hash_key: hash_key.to_vec(),
            cipher,
            max_age: RuntimeConfig::DEFAULT_COOKIE_MAX_AGE,
            max_length: RuntimeConfig::DEFAULT_COOKIE_MAX_LENGTH,
        })
    }

    /// Token lifetime in seconds; `0` disables the expiry check.
    #[must_use]
    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = seconds;
        self
    }

    /// Maximum token length; `0` disables the check.
    #[must_use]
    pub fn max_length(mut self, length: usize) -> Self {
        self.max_length = length;
        self
    }

    /// Apply the cookie limits of a [`RuntimeConfig`].
    #[must_use]
    pub fn with_config(self, config: &RuntimeConfig) -> Self {
        self.max_age(config.cookie_max_age)
            .max_length(config.cookie_max_length)
    }

    /// Whether payloads are encrypted
    #[must_use]
    pub fn encrypts(&self) -> bool {
        self.cipher.is_some()
    }

    fn mac(&self, name: &str, timestamp: &[u8], payload: &[u8]) -> Result<HmacSha256, CodecError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.hash_key)
            .map_err(|_| CodecError::MissingHashKey)?;
        mac.update(name.as_bytes());
        mac.update(b"|");
        mac.update(timestamp);
        mac.update(b"|");
        mac.update(payload);
        Ok(mac)
    }

    pub(crate) fn encode_at(&self, name: &str, values: &Map, timestamp: u64) -> Result<String, CodecError> {
        let json = serde_json::to_vec(values).map_err(|e| CodecError::Serialize(e.to_string()))?;
        let sealed = match &self.cipher {
            Some(cipher) => cipher.encrypt(&json)?,
            None => json,
        };
        let payload = URL_SAFE_NO_PAD.encode(sealed);
        let timestamp = timestamp.to_string();
        let tag = self
            .mac(name, timestamp.as_bytes(), payload.as_bytes())?
            .finalize()
            .into_bytes();

        let mut raw = Vec::with_capacity(timestamp.len() + payload.len() + tag.len() + 2);
        raw.extend_from_slice(timestamp.as_bytes());
        raw.push(b'|');
        raw.extend_from_slice(payload.as_bytes());
        raw.push(b'|');
        raw.extend_from_slice(&tag);

        let token = URL_SAFE_NO_PAD.encode(raw);
        if self.max_length != 0 && token.len() > self.max_length {
            return Err(CodecError::TokenTooLong {
                len: token.len(),
                max: self.max_length,
            });
        }
        Ok(token)
    }

    pub(crate) fn decode_at(&self, name: &str, token: &str, now: u64) -> Result<Map, CodecError> {
        if self.max_length != 0 && token.len() > self.max_length {
            return Err(CodecError::TokenTooLong {
                len: token.len(),
                max: self.max_length,
            });
        }
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| CodecError::Base64(e.to_string()))?;

        let mut parts = raw.splitn(3, |b| *b == b'|');
        let (Some(timestamp), Some(payload), Some(tag)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CodecError::InvalidFormat);
        };

        self.mac(name, timestamp, payload)?
            .verify_slice(tag)
            .map_err(|_| CodecError::InvalidMac)?;

        let issued: u64 = std::str::from_utf8(timestamp)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(CodecError::InvalidTimestamp)?;
        if self.max_age != 0 && issued.saturating_add(self.max_age) < now {
            return Err(CodecError::Expired {
                issued,
                max_age: self.max_age,
            });
        }

        let sealed = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| CodecError::Base64(e.to_string()))?;
        let json = match &self.cipher {
            Some(cipher) => cipher.decrypt(&sealed)?,
            None => sealed,
        };
        serde_json::from_slice(&json).map_err(|e| CodecError::Deserialize(e.to_string()))
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl Codec for SecureCookie {
    fn encode(&self, name: &str, values: &Map) -> Result<String, CodecError> {
        self.encode_at(name, values, now())
    }

    fn decode(&self, name: &str, token: &str) -> Result<Map, CodecError> {
        self.decode_at(name, token, now())
    }
}

impl fmt::Debug for SecureCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureCookie")
            .field("hash_key", &"[REDACTED]")
            .field("encrypts", &self.encrypts())
            .field("max_age", &self.max_age)
            .field("max_length", &self.max_length)
            .finish()
    }
}

/// Ordered set of codecs supporting key rotation.
///
/// The first codec is the primary: new tokens are encoded with it. Decoding
/// tries every codec in order so tokens issued under retired keys stay
/// readable until those keys are dropped from the set.
#[derive(Default)]
pub struct CodecSet {
    codecs: Vec<Box<dyn Codec>>,
}

impl CodecSet {
    /// Wrap an explicit list of codecs, primary first.
    #[must_use]
    pub fn new(codecs: Vec<Box<dyn Codec>>) -> Self {
        Self { codecs }
    }

    /// One [`SecureCookie`] per `(hash_key, block_key)` pair, primary first.
    ///
    /// # Errors
    ///
    /// The first key error encountered.
    pub fn from_pairs(pairs: &[(&[u8], Option<&[u8]>)]) -> Result<Self, CodecError> {
        Self::from_pairs_with(pairs, &RuntimeConfig::default())
    }

    /// Like [`CodecSet::from_pairs`], applying the cookie limits of `config`.
    ///
    /// # Errors
    ///
    /// The first key error encountered.
    pub fn from_pairs_with(
        pairs: &[(&[u8], Option<&[u8]>)],
        config: &RuntimeConfig,
    ) -> Result<Self, CodecError> {
        let codecs = pairs
            .iter()
            .map(|(hash_key, block_key)| {
                SecureCookie::new(hash_key, *block_key)
                    .map(|c| Box::new(c.with_config(config)) as Box<dyn Codec>)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { codecs })
    }

    /// Append a codec after the existing ones.
    #[must_use]
    pub fn with_codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codecs.push(Box::new(codec));
        self
    }

    /// Number of codecs
    #[must_use]
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Encode with the first codec that succeeds.
    ///
    /// # Errors
    ///
    /// [`CodecError::NoCodecs`] for an empty set, otherwise the primary
    /// codec's error when every codec fails.
    pub fn encode(&self, name: &str, values: &Map) -> Result<String, CodecError> {
        let mut first_err = None;
        for codec in &self.codecs {
            match codec.encode(name, values) {
                Ok(token) => return Ok(token),
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }
        Err(first_err.unwrap_or(CodecError::NoCodecs))
    }

    /// Decode with the first codec that accepts the token.
    ///
    /// # Errors
    ///
    /// [`CodecError::NoCodecs`] for an empty set, otherwise the primary
    /// codec's error when every codec rejects the token.
    pub fn decode(&self, name: &str, token: &str) -> Result<Map, CodecError> {
        let mut first_err = None;
        for codec in &self.codecs {
            match codec.decode(name, token) {
                Ok(values) => return Ok(values),
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }
        Err(first_err.unwrap_or(CodecError::NoCodecs))
    }
}

impl fmt::Debug for CodecSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecSet")
            .field("codecs", &self.codecs.len())
            .finish()
    }
}
