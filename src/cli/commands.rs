use crate::runtime_config::RuntimeConfig;
use crate::session::{CodecSet, SecureCookie, SESSION_ID_KEY};
use crate::value::Map;
use aes_gcm::aead::{KeyInit, OsRng};
use aes_gcm::Aes256Gcm;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Args, Parser, Subcommand};

/// Command-line interface for fieldbind
///
/// Tools for inspecting and minting cookie session tokens.
#[derive(Parser)]
#[command(name = "fieldbind")]
#[command(about = "fieldbind session token tools", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Encode or decode session tokens
    Session {
        /// Session operation
        #[command(subcommand)]
        sub: SessionCommand,
    },
    /// Print a fresh random 32-byte key pair (base64)
    Keygen,
}

/// Token operations
#[derive(Subcommand)]
pub enum SessionCommand {
    /// Encode a JSON object into a session token
    Encode {
        #[command(flatten)]
        keys: KeyArgs,

        /// JSON object holding the session field map
        json: String,
    },
    /// Verify and decode a session token, printing its field map as JSON
    Decode {
        #[command(flatten)]
        keys: KeyArgs,

        /// Token to decode
        token: String,
    },
}

/// Key material and token limits shared by the session commands
#[derive(Args)]
pub struct KeyArgs {
    /// Base64 authentication (HMAC) key
    #[arg(long, env = "FIELDBIND_HASH_KEY")]
    pub hash_key: String,

    /// Base64 encryption key (16 or 32 bytes once decoded)
    #[arg(long, env = "FIELDBIND_BLOCK_KEY")]
    pub block_key: Option<String>,

    /// Name the token is bound to
    #[arg(long, default_value = SESSION_ID_KEY)]
    pub name: String,

    /// Token lifetime in seconds (0 = unlimited); defaults to FIELDBIND_COOKIE_MAX_AGE
    #[arg(long)]
    pub max_age: Option<u64>,
}

impl KeyArgs {
    fn codecs(&self) -> Result<CodecSet> {
        let hash_key = STANDARD
            .decode(&self.hash_key)
            .context("hash key is not valid base64")?;
        let block_key = self
            .block_key
            .as_deref()
            .map(|k| STANDARD.decode(k))
            .transpose()
            .context("block key is not valid base64")?;

        let config = RuntimeConfig::from_env();
        let mut codec = SecureCookie::new(&hash_key, block_key.as_deref())?.with_config(&config);
        if let Some(max_age) = self.max_age {
            codec = codec.max_age(max_age);
        }
        Ok(CodecSet::default().with_codec(codec))
    }
}

/// Run a parsed command, returning what it printed.
///
/// # Errors
///
/// Key decoding, JSON parsing and codec failures.
pub fn run_command(command: Commands) -> Result<String> {
    match command {
        Commands::Session { sub } => match sub {
            SessionCommand::Encode { keys, json } => {
                let values: Map = serde_json::from_str(&json).context("payload must be a JSON object")?;
                let token = keys.codecs()?.encode(&keys.name, &values)?;
                Ok(token)
            }
            SessionCommand::Decode { keys, token } => {
                let values = keys.codecs()?.decode(&keys.name, token.trim())?;
                Ok(serde_json::to_string_pretty(&values)?)
            }
        },
        Commands::Keygen => {
            let hash_key = Aes256Gcm::generate_key(OsRng);
            let block_key = Aes256Gcm::generate_key(OsRng);
            Ok(format!(
                "FIELDBIND_HASH_KEY={}\nFIELDBIND_BLOCK_KEY={}",
                STANDARD.encode(hash_key),
                STANDARD.encode(block_key)
            ))
        }
    }
}

/// Parse-and-run entry point used by the `fieldbind` binary.
///
/// # Errors
///
/// See [`run_command`].
pub fn run_cli(cli: Cli) -> Result<()> {
    let output = run_command(cli.command)?;
    println!("{output}");
    Ok(())
}
