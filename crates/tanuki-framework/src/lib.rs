//! # Tanuki Framework
//!
//! Command routing and plugin execution for Tanuki bots.
//!
//! This layer provides:
//! - [`command`]: decides whether a message body is a command and splits it
//!   into a verb and arguments
//! - [`plugin`]: the [`Plugin`] contract and the [`PluginRegistry`] that
//!   indexes plugins by name, alias and stage
//! - [`context`]: the per-message [`Context`] handed to plugins
//! - [`dispatcher`]: the staged [`Pipeline`] that runs plugins for one message
//! - [`storage`]: the key-path [`Storage`] contract and the JSON-backed
//!   [`JsonStore`]
//!
//! ```text
//! InboundMessage ──▶ Pipeline ──▶ before* ──▶ command? ──▶ all* ──▶ after*
//!                       │                        │
//!                  classify (command)      resolve (registry)
//! ```

pub mod command;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod plugin;
pub mod storage;

#[cfg(feature = "builtin")]
pub mod builtin;

pub use command::{ParsedCommand, extract_command, has_prefix, has_rich_prefix, is_command};
pub use context::Context;
pub use dispatcher::{DispatchOutcome, FAILURE_MARKER, Pipeline, PrefixHandle};
pub use error::{PluginError, PluginResult};
pub use plugin::{BoxedPlugin, Plugin, PluginMetadata, PluginRegistry, PluginStage};
pub use storage::{BoxedStorage, JsonStore, Storage, StorageError, StorageExt, StorageResult};
