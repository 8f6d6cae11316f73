//! Tanuki Runtime - Orchestration layer for the Tanuki bot framework.
//!
//! This crate provides:
//! - Layered configuration loading and validation ([`config`])
//! - Logging setup driven by that configuration ([`logging`])
//! - The [`TanukiRuntime`], which opens storage, freezes the plugin registry
//!   and connects a transport with a task-per-message dispatcher
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tanuki_runtime::TanukiRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = TanukiRuntime::new();
//!     runtime.register_plugin(MyPlugin);
//!
//!     // Run until Ctrl+C
//!     runtime.run(Arc::new(MyTransport::connect().await?)).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, TanukiConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{RuntimeBuilder, TanukiRuntime, TaskDispatcher};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
