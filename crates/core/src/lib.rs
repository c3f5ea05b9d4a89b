//! # SysBot Core
//!
//! Domain types, traits, and error definitions for SysBot, a chat-driven
//! system agent. Every other crate in the workspace depends inward on this one.
//!
//! ## Layout
//!
//! - [`tool`] — the `Tool` trait, the status-result contract (`ToolOutcome`)
//!   and the explicit `ToolRegistry`
//! - [`context`] — the per-session working directory threaded through tools
//! - [`provider`] — the LLM backend abstraction
//! - [`channel`] — the chat transport abstraction
//! - [`event`] — events emitted by an agent run

pub mod channel;
pub mod context;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use channel::{Channel, ChatId, Document, Inbound, InboundKind};
pub use context::ToolContext;
pub use error::{AgentError, ChannelError, Error, ProviderError, Result, ToolError};
pub use event::{AgentEvent, EventPart};
pub use message::{Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{Tool, ToolCall, ToolOutcome, ToolRegistry, ToolStatus};
