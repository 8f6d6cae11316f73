//! Demo plugins: a message counter, a stats command and a prefix switch.

use async_trait::async_trait;
use serde_json::Value;

use tanuki::framework::storage::escape_segment;
use tanuki::framework::{PrefixHandle, StorageResult};
use tanuki::prelude::*;

fn user_key(user: &str, field: &str) -> String {
    format!("users.{}.{field}", escape_segment(user))
}

// ─── Counter ─────────────────────────────────────────────────────────────────

/// Counts every message per sender and overall.
#[derive(Debug, Default)]
pub struct CounterPlugin;

#[async_trait]
impl Plugin for CounterPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("Counter")
            .description("Counts messages per user")
            .category("Stats")
            .stage(PluginStage::All)
    }

    async fn execute(&self, ctx: &Context) -> PluginResult {
        let storage = ctx.storage();
        storage.increment(&user_key(ctx.sender(), "messages"), 1)?;
        storage.set(
            &user_key(ctx.sender(), "name"),
            Value::from(ctx.message().sender_display()),
        )?;
        storage.increment("stats.total_messages", 1)?;
        if ctx.is_command() {
            storage.increment("stats.commands", 1)?;
        }
        Ok(())
    }
}

// ─── Stats ───────────────────────────────────────────────────────────────────

/// Reports what [`CounterPlugin`] has recorded.
#[derive(Debug, Default)]
pub struct StatsPlugin;

impl StatsPlugin {
    fn render(storage: &dyn Storage, sender: &str) -> StorageResult<String> {
        let mine = storage
            .get_as::<i64>(&user_key(sender, "messages"))?
            .unwrap_or(0);
        let total = storage.get_i64("stats.total_messages").unwrap_or(0);
        let commands = storage.get_i64("stats.commands").unwrap_or(0);
        let users = storage
            .get("users")
            .and_then(|v| v.as_object().map(|m| m.len()))
            .unwrap_or(0);

        Ok(format!(
            "📊 *Stats*\n\n\
             👤 *Your messages:* {mine}\n\
             💬 *Total messages:* {total}\n\
             ⚙️ *Commands:* {commands}\n\
             👥 *Users seen:* {users}"
        ))
    }
}

#[async_trait]
impl Plugin for StatsPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("Stats")
            .description("Show message counters")
            .usage("stats")
            .category("Stats")
            .aliases(&["stats", "me"])
    }

    async fn execute(&self, ctx: &Context) -> PluginResult {
        let text = Self::render(ctx.storage().as_ref(), ctx.sender())?;
        ctx.reply(&text).await?;
        Ok(())
    }
}

// ─── Prefix ──────────────────────────────────────────────────────────────────

/// Changes the command prefix at runtime.
#[derive(Debug)]
pub struct PrefixPlugin {
    prefix: PrefixHandle,
}

impl PrefixPlugin {
    pub fn new(prefix: PrefixHandle) -> Self {
        Self { prefix }
    }
}

#[async_trait]
impl Plugin for PrefixPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("Prefix")
            .description("Show or change the command prefix")
            .usage("prefix <new prefix>")
            .category("System")
            .aliases(&["prefix", "setprefix"])
    }

    async fn execute(&self, ctx: &Context) -> PluginResult {
        let next = ctx.arg(0);
        if next.is_empty() {
            return Err(PluginError::usage(self.usage()));
        }
        self.prefix.set(next);
        ctx.reply(&format!("✅ Prefix changed from `{}` to `{next}`", ctx.prefix()))
            .await?;
        Ok(())
    }
}
