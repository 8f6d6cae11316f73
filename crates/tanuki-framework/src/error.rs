//! Error types for plugin execution.

use thiserror::Error;

use tanuki_core::TransportError;

use crate::storage::StorageError;

/// Failure returned by [`Plugin::execute`](crate::plugin::Plugin::execute).
///
/// The `Display` text is what users see in the failure reply when a command
/// plugin fails, so keep messages short and readable.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin could not complete its work.
    #[error("{0}")]
    Failed(String),

    /// The command was invoked with invalid arguments.
    #[error("usage: {0}")]
    Usage(String),

    /// Sending a reply or message failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Reading or writing shared storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PluginError {
    /// Creates a generic failure.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Creates a usage error, typically carrying the plugin's usage string.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }
}

/// Result type for plugin execution.
pub type PluginResult = Result<(), PluginError>;
