//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act on the host: create and
//! delete files, run commands, encrypt data, capture the screen.
//!
//! Every tool answers with a [`ToolOutcome`]: a JSON object whose `status` is
//! `success`, `error` or `partial`, plus operation-specific fields. Failures
//! never cross the tool boundary as errors; `Tool::execute` folds them into an
//! `error` outcome carrying a human-readable `message`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// Overall status of a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
    /// Some items of a batch operation failed, others succeeded.
    Partial,
}

impl ToolStatus {
    /// Status of a batch where `failed` of `total` items failed.
    pub fn for_batch(failed: usize, total: usize) -> Self {
        if failed == 0 {
            Self::Success
        } else if failed < total {
            Self::Partial
        } else {
            Self::Error
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Partial => "partial",
        }
    }
}

/// The result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub status: ToolStatus,

    /// Operation-specific fields, serialized next to `status`.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ToolOutcome {
    pub fn new(status: ToolStatus) -> Self {
        Self {
            status,
            fields: serde_json::Map::new(),
        }
    }

    pub fn success() -> Self {
        Self::new(ToolStatus::Success)
    }

    pub fn partial() -> Self {
        Self::new(ToolStatus::Partial)
    }

    /// An `error` outcome with a `message` field.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ToolStatus::Error).with("message", message.into())
    }

    /// Attach a field. Values that fail to serialize are stored as `null`.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    /// The `message` field, if present.
    pub fn message(&self) -> Option<&str> {
        self.get("message").and_then(|v| v.as_str())
    }

    /// The full outcome as a JSON object (`status` plus fields).
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = self.fields.clone();
        map.insert("status".into(), self.status.as_str().into());
        serde_json::Value::Object(map)
    }
}

impl From<ToolError> for ToolOutcome {
    fn from(err: ToolError) -> Self {
        Self::error(err.to_string())
    }
}

impl std::fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Decode a tool's JSON arguments into its typed argument struct.
///
/// A missing argument object (`null`) is treated as `{}` so tools whose
/// parameters are all optional can be called without arguments.
pub fn parse_args<T: DeserializeOwned>(arguments: serde_json::Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// The core Tool trait.
///
/// Implementors write `call`, which may fail with a `ToolError`. Callers use
/// `execute`, which always yields a `ToolOutcome`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "read_file", "execute_command").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Run the tool.
    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError>;

    /// Run the tool, shaping any failure into an `error` outcome.
    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> ToolOutcome {
        match self.call(arguments, ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(tool = %self.name(), error = %e, "Tool call failed");
                ToolOutcome::from(e)
            }
        }
    }

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// An ordered registry of available tools.
///
/// The agent runner uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Look up and execute tools when the LLM requests them
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name,
    /// keeping its position.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&pos) => self.tools[pos] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&pos| self.tools[pos].as_ref())
    }

    /// All tool definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool call. Unknown tools yield an `error` outcome.
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolOutcome {
        match self.get(&call.name) {
            Some(tool) => tool.execute(call.arguments.clone(), ctx).await,
            None => ToolOutcome::from(ToolError::NotFound(call.name.clone())),
        }
    }

    /// All registered tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
