//! A transport that reads messages from stdin and prints replies to stdout.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use tanuki::core::{
    BoxedDispatcher, InboundMessage, MessageKind, Transport, TransportError, TransportResult,
};

/// Who the console user pretends to be.
#[derive(Debug, Clone)]
pub struct Identity {
    pub chat_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub group: bool,
}

/// Every stdin line becomes one inbound text message.
///
/// A line of the form `/image caption` is delivered as an image message with
/// that caption, which is handy for exercising non-text handling.
pub struct ConsoleTransport {
    identity: Identity,
    connected: AtomicBool,
    reader: Mutex<Option<JoinHandle<()>>>,
    eof: Arc<Notify>,
}

impl ConsoleTransport {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            connected: AtomicBool::new(false),
            reader: Mutex::new(None),
            eof: Arc::new(Notify::new()),
        }
    }

    /// Notified once stdin is exhausted.
    pub fn eof(&self) -> Arc<Notify> {
        Arc::clone(&self.eof)
    }

    async fn print(&self, text: &str) -> TransportResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        let mut stdout = tokio::io::stdout();
        stdout.write_all(format!("{text}\n").as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }
}

impl Identity {
    fn message(&self, id: u64, line: &str) -> InboundMessage {
        let (kind, body) = parse_line(line);
        InboundMessage::new(
            format!("console-{id}"),
            self.chat_id.as_str(),
            self.sender_id.as_str(),
            body,
        )
        .with_kind(kind)
        .with_sender_name(self.sender_name.as_str())
        .in_group(self.group)
    }
}

/// Splits a console line into a message kind and body.
fn parse_line(line: &str) -> (MessageKind, &str) {
    let Some(rest) = line.strip_prefix('/') else {
        return (MessageKind::Text, line);
    };
    let (tag, caption) = rest.split_once(' ').unwrap_or((rest, ""));
    match tag.parse::<MessageKind>() {
        Ok(kind) if kind != MessageKind::Text && kind != MessageKind::Unknown => (kind, caption),
        _ => (MessageKind::Text, line),
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    async fn connect(&self, dispatcher: BoxedDispatcher) -> TransportResult<()> {
        if self.connected.swap(true, Ordering::SeqCst) {
            return Err(TransportError::connection_failed("already connected"));
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let identity = self.identity.clone();
        let eof = Arc::clone(&self.eof);

        let handle = tokio::spawn(async move {
            let mut id = 1;
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => {
                        dispatcher.dispatch(identity.message(id, &line)).await;
                        id += 1;
                    }
                    Ok(None) => {
                        debug!("stdin closed");
                        break;
                    }
                    Err(e) => {
                        debug!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
            eof.notify_one();
        });
        *self.reader.lock() = Some(handle);

        info!(chat = %self.identity.chat_id, "Console connected, type a message and press Enter");
        Ok(())
    }

    async fn send_reply(&self, original: &InboundMessage, text: &str) -> TransportResult<()> {
        self.print(&format!("🤖 ↪ {}: {text}", original.sender_display()))
            .await
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> TransportResult<()> {
        if chat_id != self.identity.chat_id {
            return Err(TransportError::send_failed(chat_id, "unknown chat"));
        }
        self.print(&format!("🤖 {text}")).await
    }

    async fn disconnect(&self) {
        if let Some(handle) = self.reader.lock().take() {
            handle.abort();
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}
