//! Plugin system for the Tanuki framework.
//!
//! # Architecture
//!
//! A plugin is any type implementing [`Plugin`]: it describes itself with an
//! immutable [`PluginMetadata`] value and runs against a per-message
//! [`Context`](crate::Context).
//!
//! Every plugin declares a [`PluginStage`]:
//!
//! | Stage | Runs |
//! |-------|------|
//! | `Before` | for every message, before command resolution |
//! | `Command` | only when its name or an alias matches the parsed verb |
//! | `All` | for every message, after the command plugin |
//! | `After` | for every message, last |
//!
//! Plugins are collected into a [`PluginRegistry`] once at startup. The
//! registry is then frozen behind an `Arc` and shared read-only by every
//! message.
//!
//! # Quick start
//!
//! ```rust
//! use async_trait::async_trait;
//! use tanuki_framework::{Context, Plugin, PluginMetadata, PluginRegistry, PluginResult};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Plugin for Echo {
//!     fn metadata(&self) -> PluginMetadata {
//!         PluginMetadata::new("Echo")
//!             .description("Repeat the arguments back")
//!             .usage("echo <text>")
//!             .aliases(&["say"])
//!     }
//!
//!     async fn execute(&self, ctx: &Context) -> PluginResult {
//!         ctx.reply(&ctx.args().join(" ")).await?;
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = PluginRegistry::new();
//! registry.register(Echo);
//! assert!(registry.resolve("SAY").is_some());
//! ```

pub mod core;
pub mod registry;

pub use self::core::{BoxedPlugin, Plugin, PluginMetadata, PluginStage};
pub use registry::PluginRegistry;
