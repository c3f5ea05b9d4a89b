//! Message and Conversation domain types.
//!
//! Chat text arrives from a channel → the runner appends it to the session's
//! conversation → the provider sees the whole conversation, including the tool
//! calls it asked for and the tool outcomes that answered them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The chat user
    User,
    /// The model
    Assistant,
    /// Agent instruction
    System,
    /// Tool outcome
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,

    pub role: Role,

    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn build(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::build(Role::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::build(Role::Assistant, content.into())
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::build(Role::System, content.into())
    }

    /// An assistant message asking for tool calls.
    pub fn assistant_with_tools(content: impl Into<String>, calls: Vec<MessageToolCall>) -> Self {
        let mut msg = Self::build(Role::Assistant, content.into());
        msg.tool_calls = calls;
        msg
    }

    /// A tool outcome answering `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::build(Role::Tool, content.into());
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    pub id: String,

    pub name: String,

    /// Arguments as a JSON string, exactly as the model produced them
    pub arguments: String,
}

/// An ordered sequence of messages with shared context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,

    pub messages: Vec<Message>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a conversation with a caller-chosen ID (e.g. a session ID).
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: ConversationId(id.into()),
            ..Self::new()
        }
    }

    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// Make `instruction` the leading system message, replacing any existing one.
    pub fn set_system(&mut self, instruction: &str) {
        match self.messages.first() {
            Some(first) if first.role == Role::System => {
                self.messages[0] = Message::system(instruction);
            }
            _ => self.messages.insert(0, Message::system(instruction)),
        }
    }

    /// Number of user turns so far.
    pub fn turns(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("list my files");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "list my files");
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn conversation_tracks_updates() {
        let mut conv = Conversation::new();
        let created = conv.created_at;

        conv.push(Message::user("First message"));
        assert_eq!(conv.messages.len(), 1);
        assert!(conv.updated_at >= created);
    }

    #[test]
    fn system_message_is_inserted_once() {
        let mut conv = Conversation::with_id("session_42");
        conv.push(Message::user("hi"));
        conv.set_system("be careful");
        conv.set_system("be very careful");

        assert_eq!(conv.id.0, "session_42");
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[0].role, Role::System);
        assert_eq!(conv.messages[0].content, "be very careful");
        assert_eq!(conv.turns(), 1);
    }

    #[test]
    fn tool_messages_carry_links() {
        let call = MessageToolCall {
            id: "call_1".into(),
            name: "get_cwd".into(),
            arguments: "{}".into(),
        };
        let asked = Message::assistant_with_tools("", vec![call.clone()]);
        assert_eq!(asked.tool_calls, vec![call]);

        let answered = Message::tool_result("call_1", r#"{"status":"success"}"#);
        assert_eq!(answered.role, Role::Tool);
        assert_eq!(answered.tool_call_id.as_deref(), Some("call_1"));
    }
}
