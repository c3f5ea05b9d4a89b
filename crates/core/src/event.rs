//! Events emitted by an agent run.
//!
//! One user message produces an ordered list of events: zero or more
//! intermediate events (tool calls the model requested, tool outcomes that
//! answered them) followed by exactly one final event carrying the reply text.

use serde::{Deserialize, Serialize};

/// One piece of content inside an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPart {
    /// Text produced by the model.
    Text { text: String },

    /// The model is invoking a tool.
    FunctionCall {
        id: String,
        name: String,
        args: serde_json::Value,
    },

    /// A tool finished; `response` is its outcome object.
    FunctionResponse {
        id: String,
        name: String,
        response: serde_json::Value,
    },
}

/// An event emitted during an agent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    /// Who produced the event (the agent name, or "tools" for outcomes).
    pub author: String,

    pub parts: Vec<EventPart>,

    /// Whether this is the run's final event.
    #[serde(default)]
    pub is_final: bool,
}

impl AgentEvent {
    pub fn intermediate(author: impl Into<String>, parts: Vec<EventPart>) -> Self {
        Self {
            author: author.into(),
            parts,
            is_final: false,
        }
    }

    /// The final event with a single text part.
    pub fn final_text(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            parts: vec![EventPart::Text { text: text.into() }],
            is_final: true,
        }
    }

    /// Text fragments in emission order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            EventPart::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }
}
