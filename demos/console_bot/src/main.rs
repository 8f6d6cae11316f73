//! Console Bot
//!
//! Chat with a Tanuki bot from the terminal. Every line typed on stdin is
//! delivered as a message; replies are printed to stdout and logs go to
//! stderr.
//!
//! ```text
//! $ cargo run -p console-bot -- --dev
//! !ping
//! hello there
//! !stats
//! !prefix ?
//! ```
//!
//! Lines such as `/image a cat` are delivered as image messages with the
//! given caption. Press Ctrl+D or Ctrl+C to stop.

mod console;
mod plugins;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tanuki::prelude::*;
use tracing::info;

use console::{ConsoleTransport, Identity};
use plugins::{CounterPlugin, PrefixPlugin, StatsPlugin};

#[derive(Debug, Parser)]
#[command(name = "console-bot", about = "Talk to a Tanuki bot from the terminal")]
struct Args {
    /// Configuration file to load instead of searching the current directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the development profile with debug logging.
    #[arg(long)]
    dev: bool,

    /// Command prefix, overriding the configured one.
    #[arg(long)]
    prefix: Option<String>,

    /// Keep all data in memory instead of the configured storage file.
    #[arg(long)]
    in_memory: bool,

    /// Sender id the console user appears as.
    #[arg(long, default_value = "console-user")]
    sender: String,

    /// Display name the console user appears as.
    #[arg(long, default_value = "You")]
    name: String,

    /// Chat id messages are delivered to.
    #[arg(long, default_value = "console")]
    chat: String,

    /// Treat the chat as a group chat.
    #[arg(long)]
    group: bool,
}

impl Args {
    fn runtime(&self) -> anyhow::Result<TanukiRuntime> {
        let mut builder = TanukiRuntime::builder().set("logging.output", "stderr");
        if let Some(path) = &self.config {
            builder = builder.config_file(path);
        }
        if self.dev {
            builder = builder.profile("dev").set("logging.level", "debug");
        }
        if let Some(prefix) = &self.prefix {
            builder = builder.set("bot.prefix", prefix);
        }
        if self.in_memory {
            builder = builder.set("storage.in_memory", true);
        }
        builder.build().context("failed to load configuration")
    }

    fn identity(&self) -> Identity {
        Identity {
            chat_id: self.chat.clone(),
            sender_id: self.sender.clone(),
            sender_name: self.name.clone(),
            group: self.group,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut runtime = args.runtime()?;

    let prefix = runtime.prefix_handle();
    runtime.register_plugin(PingPlugin::new());
    runtime.register_plugin(StatsPlugin);
    runtime.register_plugin(PrefixPlugin::new(prefix.clone()));
    runtime.register_plugin(CounterPlugin);

    for category in runtime.registry().categories() {
        let names: Vec<_> = runtime
            .registry()
            .list_by_category(category)
            .iter()
            .map(|p| p.name())
            .collect();
        info!(category, plugins = ?names, "Plugins loaded");
    }
    info!(prefix = %prefix.get(), "Try `{}ping`", prefix.get());

    let transport = Arc::new(ConsoleTransport::new(args.identity()));
    let eof = transport.eof();

    runtime
        .run_until(transport, async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C"),
                _ = eof.notified() => info!("Input closed"),
            }
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["console-bot"]);
        assert!(!args.dev && !args.group && !args.in_memory);
        assert_eq!(args.chat, "console");
        assert_eq!(args.identity().sender_name, "You");
    }

    #[test]
    fn test_args_overrides() {
        let args = Args::parse_from([
            "console-bot",
            "--dev",
            "--prefix",
            "?",
            "--in-memory",
            "--group",
            "--sender",
            "alice",
        ]);
        assert!(args.dev && args.group && args.in_memory);
        assert_eq!(args.prefix.as_deref(), Some("?"));
        assert_eq!(args.identity().sender_id, "alice");
    }
}
