//! Inbound message model.
//!
//! An [`InboundMessage`] is produced by a transport for every chat message it
//! receives. It is immutable once built: the pipeline and plugins only ever
//! read it.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

// ============================================================================
// MessageKind
// ============================================================================

/// Classification of a message's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain or extended text.
    #[default]
    Text,
    /// Image, possibly with a caption.
    Image,
    /// Video, possibly with a caption.
    Video,
    /// Voice note or audio file.
    Audio,
    /// Document, possibly with a title.
    Document,
    /// Sticker.
    Sticker,
    /// Shared location.
    Location,
    /// Shared contact card.
    Contact,
    /// Anything the transport could not classify.
    Unknown,
}

impl MessageKind {
    /// Returns the lower-case tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Sticker => "sticker",
            Self::Location => "location",
            Self::Contact => "contact",
            Self::Unknown => "unknown",
        }
    }

    /// Body a transport should use when the payload carries no text of its
    /// own (no caption, no title).
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Text => "",
            Self::Image => "[Image]",
            Self::Video => "[Video]",
            Self::Audio => "[Audio]",
            Self::Document => "[Document]",
            Self::Sticker => "[Sticker]",
            Self::Location => "[Location]",
            Self::Contact => "[Contact]",
            Self::Unknown => "[Unknown Message]",
        }
    }

    /// Emoji used when logging messages of this kind.
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Text => "💬",
            Self::Image => "🖼️",
            Self::Video => "🎥",
            Self::Audio => "🎵",
            Self::Document => "📄",
            Self::Sticker => "🌟",
            Self::Location => "📍",
            Self::Contact => "👤",
            Self::Unknown => "📱",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "text" => Self::Text,
            "image" => Self::Image,
            "video" => Self::Video,
            "audio" => Self::Audio,
            "document" => Self::Document,
            "sticker" => Self::Sticker,
            "location" => Self::Location,
            "contact" => Self::Contact,
            _ => Self::Unknown,
        })
    }
}

// ============================================================================
// InboundMessage
// ============================================================================

/// A chat message delivered by a transport.
///
/// Built once by the transport with [`InboundMessage::new`] and the `with_*`
/// methods, then handed to the dispatcher by value.
///
/// ```rust
/// use tanuki_core::{InboundMessage, MessageKind};
///
/// let msg = InboundMessage::new("3EB0", "12345@g.us", "999@s.whatsapp.net", "!ping")
///     .in_group(true)
///     .with_sender_name("Alice");
///
/// assert_eq!(msg.kind(), MessageKind::Text);
/// assert_eq!(msg.sender_user(), "999");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    id: String,
    chat_id: String,
    sender_id: String,
    sender_name: Option<String>,
    body: String,
    kind: MessageKind,
    is_group: bool,
    from_self: bool,
    timestamp: SystemTime,
}

impl InboundMessage {
    /// Creates a text message that was not sent by the bot itself.
    pub fn new(
        id: impl Into<String>,
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            sender_name: None,
            body: body.into(),
            kind: MessageKind::Text,
            is_group: false,
            from_self: false,
            timestamp: SystemTime::now(),
        }
    }

    /// Sets the payload kind.
    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the sender's display name.
    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    /// Sets the time the network reported for this message.
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Marks the message as coming from a group chat.
    pub fn in_group(mut self, is_group: bool) -> Self {
        self.is_group = is_group;
        self
    }

    /// Marks the message as sent by the bot's own account.
    pub fn from_self(mut self, from_self: bool) -> Self {
        self.from_self = from_self;
        self
    }

    /// Network-assigned message identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Identifier of the chat the message arrived in.
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Full identifier of the sender.
    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    /// User part of the sender identifier (everything before `@`).
    pub fn sender_user(&self) -> &str {
        self.sender_id
            .split_once('@')
            .map_or(self.sender_id.as_str(), |(user, _)| user)
    }

    /// Display name reported by the network, falling back to
    /// [`sender_user`](Self::sender_user).
    pub fn sender_display(&self) -> &str {
        self.sender_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.sender_user())
    }

    /// Text body. For media this is the caption or the kind's placeholder.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Payload classification.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Whether the message arrived in a group chat.
    pub fn is_group(&self) -> bool {
        self.is_group
    }

    /// Whether the bot's own account sent this message.
    pub fn is_from_self(&self) -> bool {
        self.from_self
    }

    /// Network timestamp.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}

/// Truncates `text` to at most `max_chars` characters for log output,
/// appending `...` when something was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
