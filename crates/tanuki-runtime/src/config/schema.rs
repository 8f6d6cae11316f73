//! Configuration schema definitions.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! runnable configuration:
//!
//! ```toml
//! [bot]
//! name = "Tanuki"
//! owner = "628123456789"
//! prefix = "!"
//!
//! [storage]
//! path = "data/database.json"
//!
//! [plugins]
//! disabled = ["ping"]
//!
//! [logging]
//! level = "debug"
//! format = "pretty"
//!
//! [logging.filters]
//! tanuki_framework = "trace"
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TanukiConfig {
    /// Bot identity and command prefix.
    #[serde(default)]
    pub bot: BotConfig,

    /// Shared plugin storage.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Plugin selection.
    #[serde(default)]
    pub plugins: PluginsConfig,

    /// Runtime behaviour.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ─── Bot ─────────────────────────────────────────────────────────────────────

/// Bot identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Display name.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Owner identifier, free-form.
    #[serde(default)]
    pub owner: String,

    /// Initial command prefix. May be changed at runtime.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Version string reported to users.
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            owner: String::new(),
            prefix: default_prefix(),
            version: default_version(),
        }
    }
}

fn default_bot_name() -> String {
    "Tanuki".to_string()
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// ─── Storage ─────────────────────────────────────────────────────────────────

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON database file.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    /// Keep everything in memory and never touch the disk.
    #[serde(default)]
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            in_memory: false,
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("data/database.json")
}

// ─── Plugins ─────────────────────────────────────────────────────────────────

/// Plugin selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PluginsConfig {
    /// Plugin names that are skipped at registration, ignoring case.
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl PluginsConfig {
    /// Returns `true` if `name` is listed in `disabled`.
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.iter().any(|d| d.eq_ignore_ascii_case(name))
    }
}

// ─── Runtime ─────────────────────────────────────────────────────────────────

/// Runtime behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// How long shutdown waits for in-flight messages, in milliseconds.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl RuntimeConfig {
    /// The shutdown grace period.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

fn default_shutdown_grace_ms() -> u64 {
    2000
}

// ─── Logging ─────────────────────────────────────────────────────────────────

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the lower-case level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `compact` otherwise.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Requires `file_path`.
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Base level; `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file for `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Per-module level overrides, e.g. `tanuki_framework = "trace"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}
