//! # Tanuki Core
//!
//! Foundation types shared by every layer of the Tanuki bot framework.
//!
//! This crate deliberately knows nothing about plugins or command parsing. It
//! only describes the two sides of the boundary with the outside world:
//!
//! - **Inbound**: the [`InboundMessage`] value a transport produces for every
//!   chat message it receives, classified by [`MessageKind`].
//! - **Outbound**: the [`Transport`] trait a messaging backend implements so
//!   that plugins can reply to a message or send to a chat.
//!
//! Between the two sits the [`Dispatcher`] trait: a transport is handed an
//! `Arc<dyn Dispatcher>` when it connects and calls
//! [`dispatch`](Dispatcher::dispatch) once per inbound message.
//!
//! ```text
//! ┌─────────────┐  dispatch(msg)  ┌────────────┐   send_reply / send_message
//! │  Transport  │───────────────▶│ Dispatcher │──────────────────────────────┐
//! │ (WhatsApp,  │                 │ (pipeline) │                              │
//! │  console…)  │◀────────────────────────────────────────────────────────────┘
//! └─────────────┘
//! ```

pub mod error;
pub mod message;
pub mod transport;

pub use error::{TransportError, TransportResult};
pub use message::{InboundMessage, MessageKind, preview};
pub use transport::{BoxedDispatcher, BoxedTransport, Dispatcher, Transport};

/// Prelude for common imports.
pub mod prelude {
    pub use super::error::{TransportError, TransportResult};
    pub use super::message::{InboundMessage, MessageKind};
    pub use super::transport::{BoxedDispatcher, BoxedTransport, Dispatcher, Transport};
}
