//! Channel trait — the abstraction over chat platforms.
//!
//! A Channel connects SysBot to a messaging backend. The front end pulls
//! inbound updates with [`Channel::poll`], one batch at a time, and answers
//! through the send methods.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ChannelError;

/// A chat identifier as assigned by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ChatId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ChatId)
    }
}

/// A message received from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inbound {
    pub chat_id: ChatId,

    /// Platform message ID, used for threaded replies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    pub kind: InboundKind,
}

impl Inbound {
    /// Convenience constructor for a plain text message.
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_id: None,
            username: None,
            first_name: None,
            kind: InboundKind::Text(text.into()),
        }
    }
}

/// What an inbound message carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum InboundKind {
    Text(String),
    Document(Document),
    /// Anything the bot does not handle (stickers, photos, ...)
    Unsupported,
}

/// A file attachment that can be downloaded through the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Platform handle used to fetch the bytes
    pub file_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// The core Channel trait.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "telegram", "console").
    fn name(&self) -> &str;

    /// Wait for the next batch of inbound messages (long poll).
    ///
    /// An empty batch means the poll timed out with nothing new.
    async fn poll(&self) -> Result<Vec<Inbound>, ChannelError>;

    /// Send a plain text message.
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), ChannelError>;

    /// Upload a local file as a document attachment.
    async fn send_document(
        &self,
        chat_id: ChatId,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), ChannelError>;

    /// Fetch the bytes of an inbound document.
    async fn download(&self, document: &Document) -> Result<Vec<u8>, ChannelError>;

    /// Send a typing indicator (if the platform supports it).
    async fn send_typing(&self, _chat_id: ChatId) -> Result<(), ChannelError> {
        Ok(())
    }

    /// Maximum characters accepted by `send_text`.
    fn max_message_chars(&self) -> usize {
        4096
    }

    /// Health check — is the channel connected and operational?
    async fn health_check(&self) -> Result<bool, ChannelError> {
        Ok(true)
    }
}
