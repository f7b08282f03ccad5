use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::{Display, Formatter};

pub const STORAGE_BACKEND_ENV: &str = "SPITO_STORAGE_BACKEND";
pub const REDIS_URL_ENV: &str = "SPITO_REDIS_URL";
pub const MYSQL_DSN_ENV: &str = "SPITO_MYSQL_DSN";
pub const KEY_PREFIX_ENV: &str = "SPITO_KEY_PREFIX";
pub const ID_SCHEME_ENV: &str = "SPITO_ID_SCHEME";
pub const SHARDS_ENV: &str = "SPITO_SHARDS";
pub const SEGMENT_WIDTH_ENV: &str = "SPITO_SEGMENT_WIDTH";
pub const STORE_TIMEOUT_MS_ENV: &str = "SPITO_STORE_TIMEOUT_MS";
pub const BASE_URL_ENV: &str = "SPITO_BASE_URL";
pub const LOG_FORMAT_ENV: &str = "SPITO_LOG_FORMAT";

pub const DEFAULT_KEY_PREFIX: &str = "spito:";
pub const DEFAULT_BASE_URL: &str = "http://spi.to";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "redis")]
    Redis,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Redis => write!(f, "redis"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IdSchemeArg {
    Single,
    Sharded,
}

impl Display for IdSchemeArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IdSchemeArg::Single => write!(f, "single"),
            IdSchemeArg::Sharded => write!(f, "sharded"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "spito", about = "Share short text, links and images")]
pub struct CLI {
    /// Where spits are kept. `in-memory` lasts only for this one command, so
    /// `show`, `view` and `delete` need `redis` or `mysql` to find a spit an
    /// earlier `create` saved.
    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("storage", "redis"))]
    pub redis_url: Option<String>,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    /// Namespace for every Redis key.
    #[arg(long, env = KEY_PREFIX_ENV, default_value = DEFAULT_KEY_PREFIX)]
    pub key_prefix: String,

    #[arg(
        long,
        env = ID_SCHEME_ENV,
        value_enum,
        default_value_t = IdSchemeArg::Single
    )]
    pub id_scheme: IdSchemeArg,

    /// Number of counters in the sharded scheme.
    #[arg(long, env = SHARDS_ENV, default_value_t = 3)]
    pub shards: usize,

    /// Characters per counter segment in the sharded scheme.
    #[arg(long, env = SEGMENT_WIDTH_ENV, default_value_t = 6)]
    pub segment_width: usize,

    /// Bound on every store call, in milliseconds.
    #[arg(long, env = STORE_TIMEOUT_MS_ENV, default_value_t = 2_000)]
    pub store_timeout_ms: u64,

    /// Public base URL short links are built on.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        env = LOG_FORMAT_ENV,
        value_enum,
        default_value_t = LogFormatArg::Text
    )]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Save a new spit and print it.
    Create {
        /// text, url or img.
        #[arg(long = "type", default_value = "text")]
        spit_type: String,
        /// Seconds until expiry; 0 keeps the spit forever.
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        exp: String,
        /// Image format, for img spits.
        #[arg(long)]
        image_fmt: Option<String>,
        /// The text, the URL, or the stored image location.
        content: String,
    },
    /// Print a spit without counting a view.
    Show { id: String },
    /// Print a spit and count one view.
    View { id: String },
    /// Delete a spit.
    Delete { id: String },
    /// Check whether an ID is well formed. Does not touch the store.
    CheckId { id: String },
}

impl Command {
    /// Whether the command reads spits saved by an earlier invocation.
    pub fn reads_saved_spits(&self) -> bool {
        matches!(
            self,
            Command::Show { .. } | Command::View { .. } | Command::Delete { .. }
        )
    }
}

impl CLI {
    /// The command would look in a store that starts out empty.
    pub fn reads_from_empty_store(&self) -> bool {
        self.storage == StorageBackendArg::InMemory && self.command.reads_saved_spits()
    }
}
