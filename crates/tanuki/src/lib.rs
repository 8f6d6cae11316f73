//! # Tanuki
//!
//! A plugin-routed chat bot framework for Rust.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────────┐     ┌──────────────────────────────────────┐
//! │  Transport  │────▶│ TaskDispatcher │────▶│ Pipeline (own task per message)      │
//! │ (WhatsApp,  │     │  (runtime)     │     │  before* → command? → all* → after*  │──▶ Storage
//! │  console…)  │◀────┴────────────────┘     └──────────────────────────────────────┘
//! └─────────────┘            replies via Context::reply / Context::send
//! ```
//!
//! - **Transport**: the messaging backend; delivers [`InboundMessage`]s and
//!   sends text back
//! - **Pipeline**: classifies the body as a command, resolves the verb in the
//!   [`PluginRegistry`] and runs the plugin stages
//! - **Plugins**: implement [`Plugin`] and declare a [`PluginStage`]
//! - **Storage**: a dot-path JSON store shared by all plugins
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tanuki::prelude::*;
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl Plugin for Hello {
//!     fn metadata(&self) -> PluginMetadata {
//!         PluginMetadata::new("Hello").aliases(&["hi"])
//!     }
//!
//!     async fn execute(&self, ctx: &Context) -> PluginResult {
//!         ctx.reply(&format!("Hello, {}!", ctx.message().sender_display())).await?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = TanukiRuntime::new();
//!     runtime.register_plugin(Hello);
//!     runtime.run(Arc::new(MyTransport::new())).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `builtin` *(default)*: bundled plugins (`ping`)
//! - `toml-config` *(default)* / `yaml-config`: configuration file formats
//! - `json-log`: JSON log output

pub use tanuki_core as core;
pub use tanuki_framework as framework;
pub use tanuki_runtime as runtime;

pub use tanuki_core::InboundMessage;
pub use tanuki_framework::{Plugin, PluginRegistry, PluginStage};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use tanuki::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use tanuki_runtime::{TanukiConfig, TanukiRuntime};

    // Plugin system
    pub use async_trait::async_trait;
    pub use tanuki_framework::{
        Context, Plugin, PluginError, PluginMetadata, PluginResult, PluginStage,
    };

    // Storage
    pub use tanuki_framework::{Storage, StorageExt};

    // Transport contract for custom backends
    pub use tanuki_core::{
        BoxedDispatcher, Dispatcher, InboundMessage, MessageKind, Transport, TransportError,
        TransportResult,
    };

    #[cfg(feature = "builtin")]
    pub use tanuki_framework::builtin::PingPlugin;
}
