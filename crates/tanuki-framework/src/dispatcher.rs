//! Staged dispatch pipeline.
//!
//! [`Pipeline`] takes one inbound message through the plugin stages:
//!
//! ```text
//! Received ──▶ from_self? ──yes──▶ Ignored
//!                 │ no
//!                 ▼
//!             Classified ──▶ Before* ──▶ Command? ──err──▶ "❌ Error: …" reply ──▶ CommandFailed
//!                                          │ ok / none
//!                                          ▼
//!                                        All* ──▶ After* ──▶ Completed
//! ```
//!
//! Only [`PluginStage::Command`] plugins run in the command stage. A verb that
//! names a plugin of another stage is treated as unresolved, so that plugin
//! still runs exactly once, in its own stage.
//!
//! Failures in `Before`, `All` and `After` plugins are logged and the next
//! plugin runs. A failing command plugin is reported to the chat with a single
//! reply and ends processing for that message, so neither `All` nor `After`
//! plugins see it.
//!
//! The pipeline itself runs inline. Spawning one task per message is left to
//! the caller (see `tanuki-runtime`), which keeps the pipeline easy to drive
//! from tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{Instrument, debug, debug_span, error, info, trace, warn};

use tanuki_core::{BoxedTransport, Dispatcher, InboundMessage};

use crate::command;
use crate::context::Context;
use crate::plugin::{PluginRegistry, PluginStage};
use crate::storage::BoxedStorage;

/// Leading marker of the reply sent when a command plugin fails.
pub const FAILURE_MARKER: &str = "❌";

// ─── PrefixHandle ────────────────────────────────────────────────────────────

/// A shared, runtime-adjustable command prefix.
///
/// Each message reads the prefix once, when it is classified. A change made
/// with [`set`](Self::set) affects only messages classified afterwards.
#[derive(Debug, Clone, Default)]
pub struct PrefixHandle(Arc<RwLock<String>>);

impl PrefixHandle {
    /// Creates a handle holding `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(Arc::new(RwLock::new(prefix.into())))
    }

    /// Returns a snapshot of the current prefix.
    pub fn get(&self) -> String {
        self.0.read().clone()
    }

    /// Replaces the prefix.
    pub fn set(&self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        info!(prefix = %prefix, "Command prefix changed");
        *self.0.write() = prefix;
    }
}

// ─── DispatchOutcome ─────────────────────────────────────────────────────────

/// How far a message got through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The message was sent by the bot itself and dropped unprocessed.
    Ignored,
    /// Every stage ran. `command` names the command plugin that executed, if
    /// any.
    Completed {
        /// Canonical name of the executed command plugin.
        command: Option<String>,
    },
    /// The command plugin failed; `All` and `After` were skipped.
    CommandFailed {
        /// Canonical name of the failing plugin.
        plugin: String,
        /// The error text sent to the chat.
        error: String,
    },
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Runs the plugin stages for one message at a time.
///
/// Cheap to clone; clones share the registry, transport, storage and prefix.
#[derive(Clone)]
pub struct Pipeline {
    registry: Arc<PluginRegistry>,
    transport: BoxedTransport,
    storage: BoxedStorage,
    prefix: PrefixHandle,
}

impl Pipeline {
    /// Creates a pipeline over a frozen registry.
    pub fn new(
        registry: Arc<PluginRegistry>,
        transport: BoxedTransport,
        storage: BoxedStorage,
        prefix: PrefixHandle,
    ) -> Self {
        Self {
            registry,
            transport,
            storage,
            prefix,
        }
    }

    /// The registry this pipeline resolves commands against.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// The prefix handle shared with this pipeline.
    pub fn prefix(&self) -> &PrefixHandle {
        &self.prefix
    }

    /// Changes the command prefix for messages classified from now on.
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.prefix.set(prefix);
    }

    /// Processes one message to completion.
    pub async fn handle(&self, message: InboundMessage) -> DispatchOutcome {
        if message.is_from_self() {
            trace!(message_id = %message.id(), "Dropping own message");
            return DispatchOutcome::Ignored;
        }

        let span = debug_span!(
            "dispatch",
            message_id = %message.id(),
            chat_id = %message.chat_id(),
        );
        self.run(message).instrument(span).await
    }

    async fn run(&self, message: InboundMessage) -> DispatchOutcome {
        let prefix = self.prefix.get();
        let parsed = command::parse(message.body(), &prefix);

        let mut ctx = Context::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.storage),
            message,
            prefix,
        );
        if let Some(cmd) = parsed {
            debug!(verb = %cmd.verb, args = cmd.args.len(), "Classified as command");
            ctx.set_command(cmd);
        }

        self.run_stage(PluginStage::Before, &ctx).await;

        let mut executed = None;
        let resolved = ctx
            .command()
            .and_then(|cmd| self.registry.resolve(&cmd.verb))
            .filter(|plugin| plugin.stage() == PluginStage::Command);
        if let Some(plugin) = resolved {
            match plugin.execute(&ctx).await {
                Ok(()) => {
                    info!(plugin = %plugin.name(), sender = %ctx.sender(), "Plugin executed");
                    executed = Some(plugin.name().to_string());
                }
                Err(err) => {
                    warn!(
                        plugin = %plugin.name(),
                        sender = %ctx.sender(),
                        error  = %err,
                        "Command plugin failed"
                    );
                    let reply = format!("{FAILURE_MARKER} Error: {err}");
                    if let Err(send_err) = ctx.reply(&reply).await {
                        error!(
                            plugin = %plugin.name(),
                            error  = %send_err,
                            "Failed to send error reply"
                        );
                    }
                    return DispatchOutcome::CommandFailed {
                        plugin: plugin.name().to_string(),
                        error: err.to_string(),
                    };
                }
            }
        } else if let Some(cmd) = ctx.command() {
            trace!(verb = %cmd.verb, "No command plugin for verb");
        }

        self.run_stage(PluginStage::All, &ctx).await;
        self.run_stage(PluginStage::After, &ctx).await;

        DispatchOutcome::Completed { command: executed }
    }

    async fn run_stage(&self, stage: PluginStage, ctx: &Context) {
        for plugin in self.registry.stage(stage) {
            if let Err(err) = plugin.execute(ctx).await {
                warn!(
                    plugin = %plugin.name(),
                    stage  = %stage,
                    error  = %err,
                    "Plugin failed"
                );
            }
        }
    }
}

#[async_trait]
impl Dispatcher for Pipeline {
    async fn dispatch(&self, message: InboundMessage) {
        self.handle(message).await;
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("registry", &self.registry)
            .field("transport", &self.transport.name())
            .field("prefix", &self.prefix.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PluginError, PluginResult};
    use crate::plugin::{Plugin, PluginMetadata};
    use crate::storage::{JsonStore, StorageExt};
    use parking_lot::Mutex;
    use serde_json::json;
    use tanuki_core::{BoxedDispatcher, Transport, TransportError, TransportResult};
    use tokio_test::{assert_err, assert_ok};

    // ─── Mocks ───────────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingTransport {
        replies: Mutex<Vec<(String, String)>>,
        messages: Mutex<Vec<(String, String)>>,
        broken: bool,
    }

    impl RecordingTransport {
        fn broken() -> Self {
            Self {
                broken: true,
                ..Self::default()
            }
        }

        fn replies(&self) -> Vec<(String, String)> {
            self.replies.lock().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        fn name(&self) -> &str {
            "recording"
        }

        async fn connect(&self, _dispatcher: BoxedDispatcher) -> TransportResult<()> {
            Ok(())
        }

        async fn send_reply(&self, original: &InboundMessage, text: &str) -> TransportResult<()> {
            if self.broken {
                return Err(TransportError::send_failed(original.chat_id(), "offline"));
            }
            self.replies
                .lock()
                .push((original.id().to_string(), text.to_string()));
            Ok(())
        }

        async fn send_message(&self, chat_id: &str, text: &str) -> TransportResult<()> {
            if self.broken {
                return Err(TransportError::NotConnected);
            }
            self.messages
                .lock()
                .push((chat_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    type Log = Arc<Mutex<Vec<&'static str>>>;

    /// Records its name when run, then optionally replies and/or fails.
    struct Script {
        meta: PluginMetadata,
        log: Log,
        reply: Option<&'static str>,
        fail: Option<&'static str>,
    }

    impl Script {
        fn new(meta: PluginMetadata, log: &Log) -> Self {
            Self {
                meta,
                log: Arc::clone(log),
                reply: None,
                fail: None,
            }
        }

        fn replying(mut self, text: &'static str) -> Self {
            self.reply = Some(text);
            self
        }

        fn failing(mut self, msg: &'static str) -> Self {
            self.fail = Some(msg);
            self
        }
    }

    #[async_trait]
    impl Plugin for Script {
        fn metadata(&self) -> PluginMetadata {
            self.meta
        }

        async fn execute(&self, ctx: &Context) -> PluginResult {
            self.log.lock().push(self.meta.name);
            if let Some(text) = self.reply {
                ctx.reply(text).await?;
            }
            match self.fail {
                Some(msg) => Err(PluginError::failed(msg)),
                None => Ok(()),
            }
        }
    }

    fn msg(id: &str, body: &str) -> InboundMessage {
        InboundMessage::new(id, "chat@g.us", "628123@s.whatsapp.net", body)
    }

    fn pipeline(registry: PluginRegistry, transport: &Arc<RecordingTransport>) -> Pipeline {
        Pipeline::new(
            Arc::new(registry),
            Arc::clone(transport) as BoxedTransport,
            Arc::new(JsonStore::in_memory()),
            PrefixHandle::new("!"),
        )
    }

    fn staged(log: &Log, fail_before: bool, fail_command: bool) -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        let before = Script::new(PluginMetadata::new("Gate").stage(PluginStage::Before), log);
        registry.register(if fail_before { before.failing("gate broke") } else { before });
        let cmd = Script::new(PluginMetadata::new("Ping").aliases(&["p"]), log);
        registry.register(if fail_command { cmd.failing("boom") } else { cmd });
        registry.register(Script::new(
            PluginMetadata::new("Counter").stage(PluginStage::All),
            log,
        ));
        registry.register(Script::new(
            PluginMetadata::new("Audit").stage(PluginStage::After),
            log,
        ));
        registry
    }

    // ─── Stage ordering ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_stages_run_in_order_for_command() {
        let log = Log::default();
        let transport = Arc::new(RecordingTransport::default());
        let pipeline = pipeline(staged(&log, false, false), &transport);

        let outcome = pipeline.handle(msg("1", "!ping")).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Completed {
                command: Some("Ping".into())
            }
        );
        assert_eq!(*log.lock(), vec!["Gate", "Ping", "Counter", "Audit"]);
    }

    #[tokio::test]
    async fn test_non_command_skips_command_stage_only() {
        let log = Log::default();
        let transport = Arc::new(RecordingTransport::default());
        let pipeline = pipeline(staged(&log, false, false), &transport);

        let outcome = pipeline.handle(msg("1", "hello there")).await;

        assert_eq!(outcome, DispatchOutcome::Completed { command: None });
        assert_eq!(*log.lock(), vec!["Gate", "Counter", "Audit"]);
    }

    #[tokio::test]
    async fn test_stage_plugin_verb_runs_it_once() {
        let log = Log::default();
        let transport = Arc::new(RecordingTransport::default());
        let mut registry = PluginRegistry::new();
        registry.register(Script::new(
            PluginMetadata::new("Audit").stage(PluginStage::After),
            &log,
        ));
        assert!(registry.resolve("audit").is_some());
        let pipeline = pipeline(registry, &transport);

        let outcome = pipeline.handle(msg("1", "!audit")).await;

        assert_eq!(outcome, DispatchOutcome::Completed { command: None });
        assert_eq!(*log.lock(), vec!["Audit"]);
    }

    #[tokio::test]
    async fn test_unknown_verb_runs_other_stages() {
        let log = Log::default();
        let transport = Arc::new(RecordingTransport::default());
        let pipeline = pipeline(staged(&log, false, false), &transport);

        let outcome = pipeline.handle(msg("1", "!nope")).await;

        assert_eq!(outcome, DispatchOutcome::Completed { command: None });
        assert_eq!(*log.lock(), vec!["Gate", "Counter", "Audit"]);
        assert!(transport.replies().is_empty());
    }

    #[tokio::test]
    async fn test_bare_prefix_resolves_nothing() {
        let log = Log::default();
        let transport = Arc::new(RecordingTransport::default());
        let pipeline = pipeline(staged(&log, false, false), &transport);

        let outcome = pipeline.handle(msg("1", "!")).await;

        assert_eq!(outcome, DispatchOutcome::Completed { command: None });
        assert!(!log.lock().contains(&"Ping"));
    }

    // ─── Failure handling ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_before_failure_does_not_stop_pipeline() {
        let log = Log::default();
        let transport = Arc::new(RecordingTransport::default());
        let pipeline = pipeline(staged(&log, true, false), &transport);

        let outcome = pipeline.handle(msg("1", "!p")).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Completed {
                command: Some("Ping".into())
            }
        );
        assert_eq!(*log.lock(), vec!["Gate", "Ping", "Counter", "Audit"]);
        assert!(transport.replies().is_empty());
    }

    #[tokio::test]
    async fn test_command_failure_replies_once_and_stops() {
        let log = Log::default();
        let transport = Arc::new(RecordingTransport::default());
        let pipeline = pipeline(staged(&log, false, true), &transport);

        let outcome = pipeline.handle(msg("42", "!PING now")).await;

        assert_eq!(
            outcome,
            DispatchOutcome::CommandFailed {
                plugin: "Ping".into(),
                error: "boom".into(),
            }
        );
        assert_eq!(*log.lock(), vec!["Gate", "Ping"]);
        assert_eq!(
            transport.replies(),
            vec![("42".to_string(), "❌ Error: boom".to_string())]
        );
    }

    #[tokio::test]
    async fn test_all_failure_does_not_skip_after() {
        let log = Log::default();
        let transport = Arc::new(RecordingTransport::default());
        let mut registry = PluginRegistry::new();
        registry.register(
            Script::new(PluginMetadata::new("Flaky").stage(PluginStage::All), &log)
                .failing("nope"),
        );
        registry.register(Script::new(
            PluginMetadata::new("Audit").stage(PluginStage::After),
            &log,
        ));
        let pipeline = pipeline(registry, &transport);

        pipeline.handle(msg("1", "hi")).await;

        assert_eq!(*log.lock(), vec!["Flaky", "Audit"]);
    }

    #[tokio::test]
    async fn test_error_reply_send_failure_is_swallowed() {
        let log = Log::default();
        let transport = Arc::new(RecordingTransport::broken());
        let pipeline = pipeline(staged(&log, false, true), &transport);

        let outcome = pipeline.handle(msg("1", "!ping")).await;

        assert!(matches!(outcome, DispatchOutcome::CommandFailed { .. }));
        assert_eq!(*log.lock(), vec!["Gate", "Ping"]);
    }

    #[tokio::test]
    async fn test_transport_error_inside_plugin_becomes_failure_reply_attempt() {
        let log = Log::default();
        let transport = Arc::new(RecordingTransport::broken());
        let mut registry = PluginRegistry::new();
        registry.register(Script::new(PluginMetadata::new("Ping"), &log).replying("pong"));
        let pipeline = pipeline(registry, &transport);

        let outcome = pipeline.handle(msg("1", "!ping")).await;

        match outcome {
            DispatchOutcome::CommandFailed { plugin, error } => {
                assert_eq!(plugin, "Ping");
                assert!(error.contains("offline"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    // ─── Self messages ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_own_messages_are_ignored() {
        let log = Log::default();
        let transport = Arc::new(RecordingTransport::default());
        let pipeline = pipeline(staged(&log, false, false), &transport);

        let outcome = pipeline.handle(msg("1", "!ping").from_self(true)).await;

        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(log.lock().is_empty());
        assert!(transport.replies().is_empty());
    }

    // ─── End to end ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_ping_sends_exactly_one_reply() {
        let log = Log::default();
        let transport = Arc::new(RecordingTransport::default());
        let mut registry = PluginRegistry::new();
        registry.register(
            Script::new(PluginMetadata::new("Ping").aliases(&["p"]), &log).replying("pong"),
        );
        let pipeline: BoxedDispatcher = Arc::new(pipeline(registry, &transport));

        pipeline.dispatch(msg("7", "!ping")).await;

        assert_eq!(
            transport.replies(),
            vec![("7".to_string(), "pong".to_string())]
        );
        assert!(transport.messages.lock().is_empty());
    }

    #[test]
    fn test_rich_prefix_resolves_without_configured_prefix() {
        let log = Log::default();
        let transport = Arc::new(RecordingTransport::default());
        let mut registry = PluginRegistry::new();
        registry.register(Script::new(PluginMetadata::new("Ping"), &log));
        let pipeline = pipeline(registry, &transport);

        let outcome = tokio_test::block_on(pipeline.handle(msg("1", "🏓ping")));

        assert_eq!(
            outcome,
            DispatchOutcome::Completed {
                command: Some("Ping".into())
            }
        );
    }

    // ─── Prefix ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_set_prefix_applies_to_later_messages() {
        let log = Log::default();
        let transport = Arc::new(RecordingTransport::default());
        let mut registry = PluginRegistry::new();
        registry.register(Script::new(PluginMetadata::new("Ping"), &log));
        let pipeline = pipeline(registry, &transport);

        let before = pipeline.handle(msg("1", "tkping")).await;
        assert_eq!(before, DispatchOutcome::Completed { command: None });

        pipeline.set_prefix("tk");
        assert_eq!(pipeline.prefix().get(), "tk");

        let after = pipeline.handle(msg("2", "tkping")).await;
        assert_eq!(
            after,
            DispatchOutcome::Completed {
                command: Some("Ping".into())
            }
        );
    }

    #[test]
    fn test_prefix_handle_is_shared_between_clones() {
        let handle = PrefixHandle::new("!");
        let other = handle.clone();
        other.set("#");
        assert_eq!(handle.get(), "#");
    }

    // ─── Context wiring ──────────────────────────────────────────────────────

    struct Tally;

    #[async_trait]
    impl Plugin for Tally {
        fn metadata(&self) -> PluginMetadata {
            PluginMetadata::new("Tally").stage(PluginStage::All)
        }

        async fn execute(&self, ctx: &Context) -> PluginResult {
            let seen = ctx
                .storage()
                .user(ctx.sender(), "messages")
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            ctx.storage()
                .set_user(ctx.sender(), "messages", json!(seen + 1))?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_plugins_share_storage_across_messages() {
        let transport = Arc::new(RecordingTransport::default());
        let storage = Arc::new(JsonStore::in_memory());
        let mut registry = PluginRegistry::new();
        registry.register(Tally);
        let pipeline = Pipeline::new(
            Arc::new(registry),
            Arc::clone(&transport) as BoxedTransport,
            Arc::clone(&storage) as BoxedStorage,
            PrefixHandle::new("!"),
        );

        for i in 0..3 {
            pipeline.handle(msg(&i.to_string(), "hey")).await;
        }

        assert_eq!(
            storage.user("628123@s.whatsapp.net", "messages"),
            Some(json!(3))
        );
    }

    #[tokio::test]
    async fn test_recording_transport_contract() {
        let transport = RecordingTransport::default();
        assert_ok!(transport.send_message("c", "x").await);
        assert_err!(RecordingTransport::broken().send_message("c", "x").await);
    }
}
