use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::PluginResult;

// ─── PluginStage ─────────────────────────────────────────────────────────────

/// When a plugin runs relative to command resolution.
///
/// Within one stage, plugins run in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PluginStage {
    /// Runs for every message before the command plugin.
    Before,
    /// Runs only when its name or one of its aliases matches the verb.
    #[default]
    Command,
    /// Runs for every message after the command plugin succeeded or was skipped.
    All,
    /// Runs for every message last.
    After,
}

impl PluginStage {
    /// Returns the lower-case stage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::Command => "command",
            Self::All => "all",
            Self::After => "after",
        }
    }
}

impl fmt::Display for PluginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "before" => Ok(Self::Before),
            "command" => Ok(Self::Command),
            "all" => Ok(Self::All),
            "after" => Ok(Self::After),
            other => Err(format!("unknown plugin stage '{other}'")),
        }
    }
}

// ─── PluginMetadata ──────────────────────────────────────────────────────────

/// Descriptive metadata attached to every plugin.
///
/// Built with `const` methods so a plugin can keep it in a `const` item:
///
/// ```rust
/// use tanuki_framework::{PluginMetadata, PluginStage};
///
/// const META: PluginMetadata = PluginMetadata::new("Ping")
///     .description("Check bot latency")
///     .usage("ping")
///     .category("System")
///     .aliases(&["p", "ping"]);
///
/// assert_eq!(META.stage, PluginStage::Command);
/// ```
///
/// # Defaults
///
/// | Field | Default |
/// |-------|---------|
/// | `description` | `""` |
/// | `usage` | `""` |
/// | `category` | `"General"` |
/// | `aliases` | none |
/// | `stage` | [`PluginStage::Command`] |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginMetadata {
    /// Canonical name. Lower-cased, it is also a lookup key.
    pub name: &'static str,
    /// One-line human description.
    pub description: &'static str,
    /// Usage string shown to users, without the prefix.
    pub usage: &'static str,
    /// Category used for grouping in menus.
    pub category: &'static str,
    /// Extra lookup keys. Lower-cased on registration.
    pub aliases: &'static [&'static str],
    /// Pipeline stage.
    pub stage: PluginStage,
}

impl PluginMetadata {
    /// Creates metadata for a command plugin named `name`.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            description: "",
            usage: "",
            category: "General",
            aliases: &[],
            stage: PluginStage::Command,
        }
    }

    /// Sets the description.
    pub const fn description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the usage string.
    pub const fn usage(mut self, usage: &'static str) -> Self {
        self.usage = usage;
        self
    }

    /// Sets the category.
    pub const fn category(mut self, category: &'static str) -> Self {
        self.category = category;
        self
    }

    /// Sets the aliases.
    pub const fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    /// Sets the stage.
    pub const fn stage(mut self, stage: PluginStage) -> Self {
        self.stage = stage;
        self
    }
}

// ─── Plugin ──────────────────────────────────────────────────────────────────

/// The contract every plugin implements.
///
/// A plugin instance is shared by all messages, possibly concurrently, so it
/// must not keep per-message state in its fields. Durable state belongs in
/// the [`Storage`](crate::storage::Storage) reachable through the context,
/// keyed by sender or group.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Returns this plugin's metadata. Must return the same value every call.
    fn metadata(&self) -> PluginMetadata;

    /// Runs the plugin against one message.
    async fn execute(&self, ctx: &Context) -> PluginResult;

    /// Canonical name.
    fn name(&self) -> &'static str {
        self.metadata().name
    }

    /// Human description.
    fn description(&self) -> &'static str {
        self.metadata().description
    }

    /// Usage string.
    fn usage(&self) -> &'static str {
        self.metadata().usage
    }

    /// Category.
    fn category(&self) -> &'static str {
        self.metadata().category
    }

    /// Aliases.
    fn aliases(&self) -> &'static [&'static str] {
        self.metadata().aliases
    }

    /// Pipeline stage.
    fn stage(&self) -> PluginStage {
        self.metadata().stage
    }
}

/// A shared plugin handle.
pub type BoxedPlugin = Arc<dyn Plugin>;
