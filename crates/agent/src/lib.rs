//! The agent side of SysBot.
//!
//! 1. **Descriptor**: which model, instruction and tools an agent uses
//! 2. **Sessions**: per-chat conversation history and working directory
//! 3. **Runner**: sends the conversation to the LLM, executes requested
//!    tools, and loops until the model answers with text
//!
//! Each run returns the ordered [`AgentEvent`](sysbot_core::AgentEvent)s it
//! produced so front ends can show tool activity next to the final reply.

pub mod descriptor;
pub mod runner;
pub mod session;

pub use descriptor::AgentDescriptor;
pub use runner::{AgentRunner, AgentRuntime, MAX_ITERATIONS_MESSAGE};
pub use session::{Session, SessionKey, SessionStore, SharedSession};
