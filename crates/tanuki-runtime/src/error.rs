//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use tanuki_core::TransportError;
use tanuki_framework::StorageError;

/// Errors that can occur while starting or running the bot.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating configuration failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Opening the configured storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The transport could not connect.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
