//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for the binder and the cookie
//! session codec.
//!
//! ## Environment Variables
//!
//! ### `FIELDBIND_MAX_BODY_BYTES`
//!
//! Largest request body the binder reads. Accepts decimal (`1048576`) or
//! hexadecimal (`0x100000`). Default: 10 MiB.
//!
//! ### `FIELDBIND_COOKIE_MAX_AGE`
//!
//! Seconds a session token stays valid after it was issued. `0` disables
//! the check. Default: `2592000` (30 days).
//!
//! ### `FIELDBIND_COOKIE_MAX_LENGTH`
//!
//! Longest session token accepted or produced. `0` disables the check.
//! Default: `4096`, the common per-cookie browser limit.
//!
//! Unparseable values fall back to the default.
//!
//! ## Usage
//!
//! ```rust
//! use fieldbind::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Max body: {} bytes", config.max_body_bytes);
//! ```

use serde::{Deserialize, Serialize};
use std::env;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Largest request body read by the binder, in bytes
    pub max_body_bytes: usize,
    /// Session token lifetime in seconds (0 = unlimited)
    pub cookie_max_age: u64,
    /// Session token length limit (0 = unlimited)
    pub cookie_max_length: usize,
}

impl RuntimeConfig {
    /// Default body limit: 10 MiB
    pub const DEFAULT_MAX_BODY_BYTES: usize = 10 << 20;
    /// Default token lifetime: 30 days
    pub const DEFAULT_COOKIE_MAX_AGE: u64 = 86_400 * 30;
    /// Default token length limit
    pub const DEFAULT_COOKIE_MAX_LENGTH: usize = 4096;

    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        RuntimeConfig {
            max_body_bytes: lookup("FIELDBIND_MAX_BODY_BYTES")
                .and_then(|v| parse_size(&v))
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(Self::DEFAULT_MAX_BODY_BYTES),
            cookie_max_age: lookup("FIELDBIND_COOKIE_MAX_AGE")
                .and_then(|v| parse_size(&v))
                .unwrap_or(Self::DEFAULT_COOKIE_MAX_AGE),
            cookie_max_length: lookup("FIELDBIND_COOKIE_MAX_LENGTH")
                .and_then(|v| parse_size(&v))
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(Self::DEFAULT_COOKIE_MAX_LENGTH),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            max_body_bytes: Self::DEFAULT_MAX_BODY_BYTES,
            cookie_max_age: Self::DEFAULT_COOKIE_MAX_AGE,
            cookie_max_length: Self::DEFAULT_COOKIE_MAX_LENGTH,
        }
    }
}

fn parse_size(val: &str) -> Option<u64> {
    let val = val.trim();
    if let Some(hex) = val.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else {
        val.parse().ok()
    }
}
