//! The per-message context handed to plugins.
//!
//! One [`Context`] is built for every inbound message and dropped when the
//! pipeline finishes with it. Every plugin that runs for the message (in any
//! stage) receives the same context by reference.

use tanuki_core::{BoxedTransport, InboundMessage, TransportResult};

use crate::command::ParsedCommand;
use crate::storage::BoxedStorage;

/// Everything a plugin may read or do while handling one message.
pub struct Context {
    transport: BoxedTransport,
    storage: BoxedStorage,
    message: InboundMessage,
    prefix: String,
    command: Option<ParsedCommand>,
}

impl Context {
    /// Creates an unclassified context. The pipeline fills in the command.
    pub fn new(
        transport: BoxedTransport,
        storage: BoxedStorage,
        message: InboundMessage,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            storage,
            message,
            prefix: prefix.into(),
            command: None,
        }
    }

    pub(crate) fn set_command(&mut self, command: ParsedCommand) {
        self.command = Some(command);
    }

    // ─── Messaging ───────────────────────────────────────────────────────────

    /// Replies to the current message in its chat, quoting it.
    pub async fn reply(&self, text: &str) -> TransportResult<()> {
        self.transport.send_reply(&self.message, text).await
    }

    /// Sends `text` to the current chat without quoting.
    pub async fn send(&self, text: &str) -> TransportResult<()> {
        self.transport.send_message(self.message.chat_id(), text).await
    }

    // ─── Command ─────────────────────────────────────────────────────────────

    /// Returns `true` if the body was classified as a command.
    pub fn is_command(&self) -> bool {
        self.command.is_some()
    }

    /// The parsed command, if the body is one.
    pub fn command(&self) -> Option<&ParsedCommand> {
        self.command.as_ref()
    }

    /// The lower-cased verb, or `""` when the body is not a command.
    pub fn verb(&self) -> &str {
        self.command.as_ref().map_or("", |c| c.verb.as_str())
    }

    /// The command arguments; empty when the body is not a command.
    pub fn args(&self) -> &[String] {
        self.command
            .as_ref()
            .map(|c| c.args.as_slice())
            .unwrap_or_default()
    }

    /// The `i`-th argument, or `""` when out of range.
    pub fn arg(&self, i: usize) -> &str {
        self.args().get(i).map_or("", String::as_str)
    }

    /// The prefix in force when this message was classified.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    // ─── Message ─────────────────────────────────────────────────────────────

    /// The raw inbound message.
    pub fn message(&self) -> &InboundMessage {
        &self.message
    }

    /// The message body.
    pub fn body(&self) -> &str {
        self.message.body()
    }

    /// Whether the message arrived in a group chat.
    pub fn is_group(&self) -> bool {
        self.message.is_group()
    }

    /// The full sender identifier.
    pub fn sender(&self) -> &str {
        self.message.sender_id()
    }

    /// The sender identifier without its `@server` part.
    pub fn sender_user(&self) -> &str {
        self.message.sender_user()
    }

    /// The chat identifier.
    pub fn chat(&self) -> &str {
        self.message.chat_id()
    }

    // ─── Handles ─────────────────────────────────────────────────────────────

    /// Shared storage.
    pub fn storage(&self) -> &BoxedStorage {
        &self.storage
    }

    /// The transport the message arrived on.
    pub fn transport(&self) -> &BoxedTransport {
        &self.transport
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("transport", &self.transport.name())
            .field("message", &self.message.id())
            .field("prefix", &self.prefix)
            .field("command", &self.command)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tanuki_core::Transport;

    #[derive(Default)]
    struct MockTransport {
        sent: Mutex<Vec<(String, String, bool)>>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        fn name(&self) -> &str {
            "mock"
        }

        async fn connect(&self, _dispatcher: tanuki_core::BoxedDispatcher) -> TransportResult<()> {
            Ok(())
        }

        async fn send_reply(&self, original: &InboundMessage, text: &str) -> TransportResult<()> {
            self.sent
                .lock()
                .push((original.chat_id().to_string(), text.to_string(), true));
            Ok(())
        }

        async fn send_message(&self, chat_id: &str, text: &str) -> TransportResult<()> {
            self.sent
                .lock()
                .push((chat_id.to_string(), text.to_string(), false));
            Ok(())
        }
    }

    fn context(transport: Arc<MockTransport>, body: &str) -> Context {
        let msg = InboundMessage::new("m1", "room@g.us", "628123@s.whatsapp.net", body)
            .in_group(true);
        Context::new(transport, Arc::new(JsonStore::in_memory()), msg, "!")
    }

    #[test]
    fn test_unclassified_context() {
        let ctx = context(Arc::default(), "hello");
        assert!(!ctx.is_command());
        assert_eq!(ctx.verb(), "");
        assert!(ctx.args().is_empty());
        assert_eq!(ctx.arg(0), "");
        assert_eq!(ctx.prefix(), "!");
    }

    #[test]
    fn test_args_and_accessors() {
        let mut ctx = context(Arc::default(), "!kick @bob spam");
        ctx.set_command(ParsedCommand {
            verb: "kick".into(),
            args: vec!["@bob".into(), "spam".into()],
        });

        assert!(ctx.is_command());
        assert_eq!(ctx.verb(), "kick");
        assert_eq!(ctx.arg(1), "spam");
        assert_eq!(ctx.arg(2), "");
        assert_eq!(ctx.body(), "!kick @bob spam");
        assert!(ctx.is_group());
        assert_eq!(ctx.sender(), "628123@s.whatsapp.net");
        assert_eq!(ctx.sender_user(), "628123");
        assert_eq!(ctx.chat(), "room@g.us");
    }

    #[tokio::test]
    async fn test_reply_and_send_go_through_transport() {
        let transport = Arc::new(MockTransport::default());
        let ctx = context(Arc::clone(&transport), "!ping");

        ctx.reply("pong").await.unwrap();
        ctx.send("hello room").await.unwrap();

        let sent = transport.sent.lock();
        assert_eq!(
            *sent,
            vec![
                ("room@g.us".to_string(), "pong".to_string(), true),
                ("room@g.us".to_string(), "hello room".to_string(), false),
            ]
        );
    }
}
