use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;

use crate::context::Context;
use crate::error::PluginResult;
use crate::plugin::{Plugin, PluginMetadata};

/// Replies with latency and host information.
#[derive(Debug)]
pub struct PingPlugin {
    started: Instant,
}

impl PingPlugin {
    const META: PluginMetadata = PluginMetadata::new("Ping")
        .description("Check bot ping and system information")
        .usage("ping")
        .category("System")
        .aliases(&["p", "ping"]);

    /// Creates the plugin; uptime is measured from this call.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    fn render(&self, latency: Duration) -> String {
        let workers = tokio::runtime::Handle::try_current()
            .map(|h| h.metrics().num_workers().to_string())
            .unwrap_or_else(|_| "-".to_string());

        format!(
            "🏓 *Pong!*\n\n\
             ⏱️ *Response Time:* {latency:?}\n\
             ⌛ *Uptime:* {uptime}\n\
             🔄 *Workers:* {workers}\n\
             🖥️ *OS:* {os}\n\
             📊 *Architecture:* {arch}\n\
             📦 *Version:* {version}\n\n\
             ✅ *Status:* Online and running!",
            uptime = format_uptime(self.started.elapsed()),
            os = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            version = env!("CARGO_PKG_VERSION"),
        )
    }
}

impl Default for PingPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for PingPlugin {
    fn metadata(&self) -> PluginMetadata {
        Self::META
    }

    async fn execute(&self, ctx: &Context) -> PluginResult {
        let latency = SystemTime::now()
            .duration_since(ctx.message().timestamp())
            .unwrap_or_default();
        ctx.reply(&self.render(latency)).await?;
        Ok(())
    }
}

fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (days, hours, mins, secs) = (secs / 86_400, secs / 3600 % 24, secs / 60 % 60, secs % 60);
    if days > 0 {
        format!("{days}d {hours}h {mins}m")
    } else if hours > 0 {
        format!("{hours}h {mins}m {secs}s")
    } else {
        format!("{mins}m {secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginStage;

    #[test]
    fn test_metadata() {
        let ping = PingPlugin::new();
        assert_eq!(ping.name(), "Ping");
        assert_eq!(ping.category(), "System");
        assert_eq!(ping.aliases(), &["p", "ping"]);
        assert_eq!(ping.stage(), PluginStage::Command);
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(59)), "0m 59s");
        assert_eq!(format_uptime(Duration::from_secs(3_725)), "1h 2m 5s");
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "1d 1h 1m");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_render_reports_workers() {
        let text = PingPlugin::new().render(Duration::from_millis(3));
        assert!(text.starts_with("🏓 *Pong!*"));
        assert!(text.contains("*Workers:* 2"));
        assert!(text.contains(std::env::consts::OS));
    }

    #[test]
    fn test_render_outside_runtime() {
        let text = PingPlugin::new().render(Duration::ZERO);
        assert!(text.contains("*Workers:* -"));
    }
}
