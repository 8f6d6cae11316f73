//! Configuration module for the Tanuki runtime.
//!
//! Layered loading (defaults, files, environment) lives in [`loader`], the
//! serde schema in [`schema`] and semantic checks in [`validation`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, PluginsConfig, RuntimeConfig,
    SpanEventConfig, StorageConfig, TanukiConfig,
};
pub use validation::validate_config;
