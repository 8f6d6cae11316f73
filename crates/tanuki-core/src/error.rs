//! Error types for the transport boundary.

use thiserror::Error;

/// Errors that can occur while talking to the messaging network.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connecting to the network failed.
    #[error("connection failed: {reason}")]
    ConnectionFailed {
        /// Reason for failure.
        reason: String,
    },

    /// The transport is not connected (never connected, or already closed).
    #[error("transport not connected")]
    NotConnected,

    /// Sending a message or reply failed.
    #[error("failed to send message to '{chat_id}': {reason}")]
    SendFailed {
        /// The chat the message was addressed to.
        chat_id: String,
        /// Reason for failure.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// Creates a send failure for the given chat.
    pub fn send_failed(chat_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SendFailed {
            chat_id: chat_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates a connection failure.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
