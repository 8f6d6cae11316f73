//! Runtime orchestration.
//!
//! [`TanukiRuntime`] owns the configuration, collects plugins, opens storage
//! and, on [`run`](TanukiRuntime::run), wires everything to a transport:
//!
//! ```text
//! Transport ──dispatch──▶ TaskDispatcher ──spawn──▶ Pipeline::handle   (one task per message)
//!                               │
//!                          TaskTracker ◀── shutdown waits here, bounded by shutdown_grace_ms
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tanuki_runtime::TanukiRuntime;
//!
//! let mut runtime = TanukiRuntime::builder()
//!     .config_file("tanuki.toml")
//!     .build()?;
//! runtime.register_plugin(MyPlugin);
//! runtime.run(Arc::new(MyTransport::new())).await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::signal;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use tanuki_core::{BoxedTransport, Dispatcher, InboundMessage, preview};
use tanuki_framework::{
    BoxedStorage, JsonStore, Pipeline, Plugin, PluginRegistry, PrefixHandle,
};

use crate::config::{ConfigLoader, ConfigResult, TanukiConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// Characters of a message body shown in the inbound log line.
const PREVIEW_CHARS: usize = 50;

/// The Tanuki runtime.
///
/// Plugins are registered with `&mut self` before [`run`](Self::run); the
/// registry is frozen when the runtime starts.
pub struct TanukiRuntime {
    config: TanukiConfig,
    registry: PluginRegistry,
    storage: Option<BoxedStorage>,
    prefix: PrefixHandle,
    tracker: TaskTracker,
}

impl TanukiRuntime {
    /// Creates a runtime from the configuration found in the current
    /// directory, falling back to defaults.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                TanukiConfig::default()
            });

        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration and initialises logging from it.
    pub fn from_config(config: &TanukiConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            bot = %config.bot.name,
            prefix = %config.bot.prefix,
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            registry: PluginRegistry::new(),
            storage: None,
            prefix: PrefixHandle::new(config.bot.prefix.clone()),
            tracker: TaskTracker::new(),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &TanukiConfig {
        &self.config
    }

    /// The plugins registered so far.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Registers a plugin unless `plugins.disabled` lists its name.
    ///
    /// Returns `true` if the plugin was registered.
    pub fn register_plugin<P: Plugin>(&mut self, plugin: P) -> bool {
        let name = plugin.name();
        if self.config.plugins.is_disabled(name) {
            info!(plugin = %name, "Plugin disabled by configuration");
            return false;
        }
        self.registry.register(plugin);
        true
    }

    /// A handle to the live command prefix. Changing it affects messages
    /// classified afterwards, including while the runtime is running.
    pub fn prefix_handle(&self) -> PrefixHandle {
        self.prefix.clone()
    }

    /// Uses `storage` instead of the configured one.
    pub fn with_storage(mut self, storage: BoxedStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Returns the shared storage, opening the configured store on first use.
    pub fn storage(&mut self) -> RuntimeResult<BoxedStorage> {
        if let Some(storage) = &self.storage {
            return Ok(Arc::clone(storage));
        }

        let storage: BoxedStorage = if self.config.storage.in_memory {
            debug!("Using in-memory storage");
            Arc::new(JsonStore::in_memory())
        } else {
            Arc::new(JsonStore::open(&self.config.storage.path)?)
        };
        self.storage = Some(Arc::clone(&storage));
        Ok(storage)
    }

    /// Runs until Ctrl+C (or SIGTERM on Unix).
    pub async fn run(self, transport: BoxedTransport) -> RuntimeResult<()> {
        self.run_until(transport, wait_for_shutdown()).await
    }

    /// Runs until `shutdown` completes.
    ///
    /// On shutdown the transport is disconnected first, then in-flight
    /// messages get up to `runtime.shutdown_grace_ms` to finish.
    pub async fn run_until<F>(mut self, transport: BoxedTransport, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let storage = self.storage()?;
        let registry = Arc::new(std::mem::take(&mut self.registry));
        let plugin_count = registry.len();

        let pipeline = Pipeline::new(registry, Arc::clone(&transport), storage, self.prefix.clone());
        let dispatcher = Arc::new(TaskDispatcher::new(pipeline, self.tracker.clone()));

        info!(
            bot = %self.config.bot.name,
            transport = %transport.name(),
            plugins = plugin_count,
            "Starting Tanuki runtime"
        );
        transport.connect(dispatcher).await?;
        info!("Tanuki runtime is now running. Press Ctrl+C to stop.");

        shutdown.await;

        info!("Stopping Tanuki runtime");
        transport.disconnect().await;

        self.tracker.close();
        let grace = self.config.runtime.shutdown_grace();
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            warn!(
                in_flight = self.tracker.len(),
                grace_ms = self.config.runtime.shutdown_grace_ms,
                "Shutdown grace period elapsed with messages still in flight"
            );
        }

        info!("Runtime stopped");
        Ok(())
    }
}

impl Default for TanukiRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TanukiRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TanukiRuntime")
            .field("bot", &self.config.bot.name)
            .field("registry", &self.registry)
            .field("prefix", &self.prefix.get())
            .finish()
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!(error = %e, "Failed to register SIGTERM handler");
                ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = ctrl_c() => {}
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}

// ─── TaskDispatcher ──────────────────────────────────────────────────────────

/// A [`Dispatcher`] that logs each inbound message and runs the pipeline for
/// it on its own task.
///
/// `dispatch` returns as soon as the task is spawned, so a slow plugin never
/// holds up the transport's receive loop.
#[derive(Debug, Clone)]
pub struct TaskDispatcher {
    pipeline: Pipeline,
    tracker: TaskTracker,
}

impl TaskDispatcher {
    /// Creates a dispatcher that spawns onto `tracker`.
    pub fn new(pipeline: Pipeline, tracker: TaskTracker) -> Self {
        Self { pipeline, tracker }
    }
}

#[async_trait]
impl Dispatcher for TaskDispatcher {
    async fn dispatch(&self, message: InboundMessage) {
        log_inbound(&message);
        let pipeline = self.pipeline.clone();
        self.tracker.spawn(async move {
            pipeline.handle(message).await;
        });
    }
}

fn log_inbound(message: &InboundMessage) {
    let kind = message.kind();
    let text = if message.body().is_empty() {
        kind.placeholder()
    } else {
        message.body()
    };

    if message.is_from_self() {
        debug!(chat = %message.chat_id(), "{} (self) {}", kind.emoji(), preview(text, PREVIEW_CHARS));
        return;
    }

    info!(
        kind = %kind,
        chat = %message.chat_id(),
        sender = %message.sender_display(),
        group = message.is_group(),
        "{} {}",
        kind.emoji(),
        preview(text, PREVIEW_CHARS)
    );
}

// ─── RuntimeBuilder ──────────────────────────────────────────────────────────

/// Builder for creating a `TanukiRuntime` with custom configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges a base configuration programmatically.
    pub fn merge(mut self, config: TanukiConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Overrides a single dotted configuration key.
    pub fn set<T: serde::Serialize>(mut self, key: &str, value: T) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    /// Loads and validates the configuration, then builds the runtime.
    pub fn build(self) -> ConfigResult<TanukiRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;
        Ok(TanukiRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
