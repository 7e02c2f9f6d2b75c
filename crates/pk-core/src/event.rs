//! Inbound events delivered by the gateway.
//!
//! Two event classes reach the dispatcher:
//!
//! - [`MessageEvent`] - a typed "message received" event
//! - [`RawFrame`] - every low-level transport frame, before any typed parsing
//!
//! Both are wrapped in [`InboundEvent`] so the runtime can treat them as one
//! stream when it logs failures.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Message Events
// ============================================================================

/// The author of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// The user's snowflake id.
    pub id: String,

    /// The user's display name.
    #[serde(rename = "username")]
    pub name: String,

    /// Legacy four-digit discriminator.
    #[serde(default)]
    pub discriminator: Option<String>,

    /// Whether the author is an automated agent (bot or webhook).
    #[serde(default)]
    pub bot: bool,
}

impl Author {
    /// Creates a human author.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            discriminator: None,
            bot: false,
        }
    }

    /// Marks this author as an automated agent.
    pub fn automated(mut self) -> Self {
        self.bot = true;
        self
    }

    /// Returns `name#discriminator`, or just the name when there is none.
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(d) if d != "0" => format!("{}#{}", self.name, d),
            _ => self.name.clone(),
        }
    }
}

/// A "message received" event.
///
/// Deserializes directly from the data record of a `MESSAGE_CREATE`
/// dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// The message's snowflake id.
    #[serde(rename = "id")]
    pub message_id: String,

    /// The channel the message was posted in.
    pub channel_id: String,

    /// The guild the channel belongs to, absent for direct messages.
    #[serde(default)]
    pub guild_id: Option<String>,

    /// The message author.
    pub author: Author,

    /// Raw text content.
    #[serde(default)]
    pub content: String,
}

impl MessageEvent {
    /// Creates a message event.
    pub fn new(
        message_id: impl Into<String>,
        channel_id: impl Into<String>,
        author: Author,
        content: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            channel_id: channel_id.into(),
            guild_id: None,
            author,
            content: content.into(),
        }
    }

    /// Sets the guild id.
    pub fn in_guild(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    /// Returns whether the message was sent by an automated agent.
    pub fn is_from_bot(&self) -> bool {
        self.author.bot
    }
}

// ============================================================================
// Raw Frames
// ============================================================================

/// A raw transport frame.
///
/// One is produced for every frame the gateway receives, a superset of all
/// typed events.
#[derive(Clone, PartialEq, Eq)]
pub enum RawFrame {
    /// A textual frame, normally a JSON payload.
    Text(String),
    /// A binary frame (compressed payloads, control data).
    Binary(Vec<u8>),
}

impl RawFrame {
    /// Returns the textual content, or `None` for binary frames.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// Returns the frame size in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) => data.len(),
        }
    }

    /// Returns whether the frame carries no data.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Binary(data) => write!(f, "Binary({} bytes)", data.len()),
        }
    }
}

impl From<String> for RawFrame {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RawFrame {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for RawFrame {
    fn from(data: Vec<u8>) -> Self {
        Self::Binary(data)
    }
}

// ============================================================================
// Inbound Event
// ============================================================================

/// Any event the dispatcher consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A typed message event.
    Message(MessageEvent),
    /// A raw transport frame.
    Raw(RawFrame),
}

impl InboundEvent {
    /// Returns the name used when reporting failures for this event.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Raw(_) => "socket_raw_receive",
        }
    }
}

impl From<MessageEvent> for InboundEvent {
    fn from(event: MessageEvent) -> Self {
        Self::Message(event)
    }
}

impl From<RawFrame> for InboundEvent {
    fn from(frame: RawFrame) -> Self {
        Self::Raw(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_event_from_dispatch_data() {
        let data = serde_json::json!({
            "id": "100",
            "channel_id": "200",
            "guild_id": "300",
            "content": "pk;help",
            "author": { "id": "42", "username": "alice", "discriminator": "0001" },
            "tts": false
        });

        let event: MessageEvent = serde_json::from_value(data).unwrap();
        assert_eq!(event.message_id, "100");
        assert_eq!(event.guild_id.as_deref(), Some("300"));
        assert_eq!(event.author.tag(), "alice#0001");
        assert!(!event.is_from_bot());
    }

    #[test]
    fn test_bot_flag_defaults_to_false() {
        let author: Author =
            serde_json::from_value(serde_json::json!({ "id": "1", "username": "x" })).unwrap();
        assert!(!author.bot);
        assert!(Author::new("1", "x").automated().bot);
    }

    #[test]
    fn test_raw_frame_text_access() {
        assert_eq!(RawFrame::from("pong").as_text(), Some("pong"));
        assert_eq!(RawFrame::from(vec![1u8, 2]).as_text(), None);
        assert_eq!(format!("{:?}", RawFrame::Binary(vec![0; 3])), "Binary(3 bytes)");
    }

    #[test]
    fn test_event_names() {
        let msg = MessageEvent::new("1", "2", Author::new("3", "bob"), "hi");
        assert_eq!(InboundEvent::from(msg).event_name(), "message");
        assert_eq!(
            InboundEvent::from(RawFrame::from("{}")).event_name(),
            "socket_raw_receive"
        );
    }
}
