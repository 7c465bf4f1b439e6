//! # CLI Module
//!
//! Command-line tools for cookie session tokens.
//!
//! ## Commands
//!
//! ### `session encode`
//!
//! ```bash
//! fieldbind session encode --hash-key "$KEY" '{"uid": 7, "theme": "dark"}'
//! ```
//!
//! ### `session decode`
//!
//! ```bash
//! fieldbind session decode --hash-key "$KEY" --block-key "$BLOCK" "$TOKEN"
//! ```
//!
//! Keys are base64 and may also come from `FIELDBIND_HASH_KEY` and
//! `FIELDBIND_BLOCK_KEY`.
//!
//! ### `keygen`
//!
//! ```bash
//! fieldbind keygen >> .env
//! ```

mod commands;


pub use commands::{run_cli, run_command, Cli, Commands, KeyArgs, SessionCommand};
