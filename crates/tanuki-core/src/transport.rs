//! Transport and dispatcher contracts.
//!
//! A [`Transport`] is the messaging backend: it owns the network connection,
//! turns network events into [`InboundMessage`]s and delivers text back to
//! chats. It is handed a [`Dispatcher`] on [`connect`](Transport::connect) and
//! must call [`Dispatcher::dispatch`] once for every inbound message.
//!
//! Transports may invoke the dispatcher from any task or thread, concurrently;
//! dispatchers must not assume sequential delivery.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportResult;
use crate::message::InboundMessage;

/// Receives inbound messages from a transport.
#[async_trait]
pub trait Dispatcher: Send + Sync + 'static {
    /// Handles one inbound message.
    ///
    /// Implementations must not fail: every error is handled (logged or
    /// reported to the chat) before this returns.
    async fn dispatch(&self, message: InboundMessage);
}

/// A shared dispatcher handle.
pub type BoxedDispatcher = Arc<dyn Dispatcher>;

/// A messaging backend.
///
/// Both send operations may fail with a [`TransportError`]; the error is
/// returned to the caller (usually a plugin) and never aborts the process.
/// Retrying is up to the implementation.
///
/// [`TransportError`]: crate::TransportError
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Short name used in logs (e.g. `"whatsapp"`, `"console"`).
    fn name(&self) -> &str;

    /// Starts receiving messages and forwarding them to `dispatcher`.
    ///
    /// Returns once the connection is established; delivery continues in the
    /// background until [`disconnect`](Self::disconnect) is called.
    async fn connect(&self, dispatcher: BoxedDispatcher) -> TransportResult<()>;

    /// Sends `text` to the chat of `original`, quoting `original`.
    async fn send_reply(&self, original: &InboundMessage, text: &str) -> TransportResult<()>;

    /// Sends `text` to `chat_id` without quoting anything.
    async fn send_message(&self, chat_id: &str, text: &str) -> TransportResult<()>;

    /// Stops delivering messages and closes the connection.
    ///
    /// The default implementation does nothing.
    async fn disconnect(&self) {}
}

/// A shared transport handle.
pub type BoxedTransport = Arc<dyn Transport>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collecting {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Dispatcher for Collecting {
        async fn dispatch(&self, message: InboundMessage) {
            self.seen.lock().unwrap().push(message.body().to_string());
        }
    }

    struct Loopback {
        dispatcher: Mutex<Option<BoxedDispatcher>>,
    }

    #[async_trait]
    impl Transport for Loopback {
        fn name(&self) -> &str {
            "loopback"
        }

        async fn connect(&self, dispatcher: BoxedDispatcher) -> TransportResult<()> {
            *self.dispatcher.lock().unwrap() = Some(dispatcher);
            Ok(())
        }

        async fn send_reply(&self, original: &InboundMessage, text: &str) -> TransportResult<()> {
            self.send_message(original.chat_id(), text).await
        }

        async fn send_message(&self, chat_id: &str, text: &str) -> TransportResult<()> {
            let dispatcher = self
                .dispatcher
                .lock()
                .unwrap()
                .clone()
                .ok_or(TransportError::NotConnected)?;
            dispatcher
                .dispatch(InboundMessage::new("echo", chat_id, "bot", text).from_self(true))
                .await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_send_before_connect_fails() {
        let transport = Loopback {
            dispatcher: Mutex::new(None),
        };
        let err = transport.send_message("chat", "hi").await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn test_transport_delivers_to_dispatcher() {
        let collecting = Arc::new(Collecting::default());
        let transport = Loopback {
            dispatcher: Mutex::new(None),
        };
        transport.connect(collecting.clone()).await.unwrap();

        let original = InboundMessage::new("1", "chat", "user", "!ping");
        transport.send_reply(&original, "pong").await.unwrap();

        assert_eq!(*collecting.seen.lock().unwrap(), vec!["pong".to_string()]);
    }
}
