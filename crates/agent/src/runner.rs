//! The agent reasoning loop implementation.

use async_trait::async_trait;
use std::sync::Arc;
use sysbot_config::AppConfig;
use sysbot_core::error::ToolError;
use sysbot_core::event::{AgentEvent, EventPart};
use sysbot_core::message::{Message, MessageToolCall};
use sysbot_core::provider::{Provider, ProviderRequest};
use sysbot_core::tool::{ToolCall, ToolOutcome, ToolRegistry};
use tracing::{debug, info, warn};

use crate::descriptor::AgentDescriptor;
use crate::session::Session;

/// Reply used when the model keeps calling tools past the iteration limit.
pub const MAX_ITERATIONS_MESSAGE: &str =
    "I've reached the maximum number of tool call iterations. Please provide further guidance.";

const DEFAULT_MAX_ITERATIONS: u32 = 25;

/// Anything that can turn a user message into run events.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Run one user turn against `session`. The last returned event is final.
    async fn run(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<Vec<AgentEvent>, sysbot_core::Error>;
}

/// Orchestrates LLM calls and tool execution for one agent descriptor.
pub struct AgentRunner {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    descriptor: AgentDescriptor,
    temperature: f32,
    max_tokens: Option<u32>,
    max_iterations: u32,
}

impl AgentRunner {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        descriptor: AgentDescriptor,
    ) -> Self {
        Self {
            provider,
            tools,
            descriptor,
            temperature: 0.7,
            max_tokens: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Build a runner with the descriptor and limits from configuration.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
    ) -> Result<Self, sysbot_core::Error> {
        let descriptor = AgentDescriptor::from_config(config)?;
        Ok(Self::new(provider, tools, descriptor)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_max_iterations(config.agent.max_iterations))
    }

    /// Set the maximum number of model calls per turn.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Decode and run one requested tool call.
    async fn run_tool(&self, tc: &MessageToolCall, session: &Session) -> ToolOutcome {
        let arguments = if tc.arguments.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            match serde_json::from_str(&tc.arguments) {
                Ok(value) => value,
                Err(e) => {
                    warn!(tool = %tc.name, error = %e, "Model sent malformed tool arguments");
                    return ToolOutcome::from(ToolError::InvalidArguments(format!(
                        "arguments are not valid JSON: {e}"
                    )));
                }
            }
        };

        if !self.descriptor.allows(&tc.name) {
            return ToolOutcome::from(ToolError::NotFound(tc.name.clone()));
        }

        let call = ToolCall {
            id: tc.id.clone(),
            name: tc.name.clone(),
            arguments,
        };
        self.tools.execute(&call, &session.context).await
    }
}

/// Arguments as shown in events: parsed JSON, or the raw string if malformed.
fn display_args(raw: &str) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

#[async_trait]
impl AgentRuntime for AgentRunner {
    async fn run(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<Vec<AgentEvent>, sysbot_core::Error> {
        info!(
            session = %session.key,
            agent = %self.descriptor.name,
            history = session.conversation.messages.len(),
            "Processing message"
        );

        session.conversation.set_system(&self.descriptor.instruction);
        session.conversation.push(Message::user(text));

        let tool_definitions = self.descriptor.tools(&self.tools);
        let author = self.descriptor.name.clone();
        let mut events = Vec::new();

        for iteration in 1..=self.max_iterations {
            debug!(session = %session.key, iteration, "Agent loop iteration");

            let request = ProviderRequest {
                model: self.descriptor.model.clone(),
                messages: session.conversation.messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_definitions.clone(),
            };

            let response = self.provider.complete(request).await?;
            if let Some(usage) = &response.usage {
                debug!(model = %response.model, tokens = usage.total_tokens, "Model responded");
            }

            if response.message.tool_calls.is_empty() {
                let reply = response.message.content.clone();
                session.conversation.push(response.message);
                events.push(AgentEvent::final_text(&author, reply));
                return Ok(events);
            }

            let tool_calls = response.message.tool_calls.clone();
            debug!(tool_count = tool_calls.len(), "Executing tool calls");

            let mut call_parts = Vec::with_capacity(tool_calls.len() + 1);
            if !response.message.content.trim().is_empty() {
                call_parts.push(EventPart::Text {
                    text: response.message.content.clone(),
                });
            }
            call_parts.extend(tool_calls.iter().map(|tc| EventPart::FunctionCall {
                id: tc.id.clone(),
                name: tc.name.clone(),
                args: display_args(&tc.arguments),
            }));
            events.push(AgentEvent::intermediate(&author, call_parts));
            session.conversation.push(response.message);

            let mut response_parts = Vec::with_capacity(tool_calls.len());
            for tc in &tool_calls {
                let outcome = self.run_tool(tc, session).await;
                debug!(tool = %tc.name, status = outcome.status.as_str(), "Tool finished");

                let payload = outcome.to_json();
                session
                    .conversation
                    .push(Message::tool_result(&tc.id, payload.to_string()));
                response_parts.push(EventPart::FunctionResponse {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    response: payload,
                });
            }
            events.push(AgentEvent::intermediate(&author, response_parts));
        }

        warn!(
            session = %session.key,
            iterations = self.max_iterations,
            "Max tool iterations reached"
        );
        session
            .conversation
            .push(Message::assistant(MAX_ITERATIONS_MESSAGE));
        events.push(AgentEvent::final_text(&author, MAX_ITERATIONS_MESSAGE));
        Ok(events)
    }
}
