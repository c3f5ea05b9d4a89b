//! Agent descriptors — declarative bindings of model, instruction and tools.

use serde::{Deserialize, Serialize};
use sysbot_config::AppConfig;
use sysbot_core::error::AgentError;
use sysbot_core::provider::ToolDefinition;
use sysbot_core::tool::ToolRegistry;
use tracing::warn;

const SYSTEM_INSTRUCTION: &str = "You are a powerful system control agent with extensive capabilities. \
When a user gives you a query, analyze what needs to be done and execute the appropriate tools. \
Always provide clear feedback about what actions were taken. \
For complex operations involving multiple steps, execute them in the correct order. \
If a tool returns an error, explain the issue to the user clearly. \
Always confirm successful completion of tasks with the user. \
When working with file paths, ensure they are valid and exist before performing operations. \
Be cautious with destructive operations like delete, encrypt, or execute commands. \
For screen recording, suggest reasonable durations (5-30 seconds) to avoid huge file sizes.";

const SYSTEM_DESCRIPTION: &str = "An intelligent system control agent that can perform comprehensive file operations, \
directory management, command execution, file encryption/decryption, screen capture, \
and various system-level tasks through natural language interaction.";

const FILE_OPS_INSTRUCTION: &str = "When the user gives you a query, count the number of tool calls needed to resolve it successfully. \
Only send the user your final reply once you have received that exact number of success results from the tools; \
otherwise keep working until all of them have succeeded.";

const FILE_OPS_DESCRIPTION: &str = "Agent that performs comprehensive file and directory operations based on user queries.";

const SYSTEM_TOOLS: &[&str] = &[
    "get_cwd",
    "chdir",
    "mkdir",
    "create_directory",
    "list_directory",
    "list_directories",
    "directory_exists",
    "delete_directory",
    "copy_directory",
    "create_file",
    "write_file",
    "read_file",
    "get_file_lines",
    "search_in_file",
    "copy_file",
    "move_file",
    "rename_file",
    "delete_file",
    "delete_files",
    "file_exists",
    "get_file_info",
    "list_files",
    "batch_rename_files",
    "execute_command",
    "change_file_permissions",
    "encrypt_files",
    "decrypt_files",
    "capture_screenshot",
    "record_screen",
];

const FILE_OPS_TOOLS: &[&str] = &[
    "get_cwd",
    "mkdir",
    "chdir",
    "list_directories",
    "directory_exists",
    "delete_directory",
    "copy_directory",
    "create_file",
    "write_file",
    "read_file",
    "get_file_lines",
    "search_in_file",
    "copy_file",
    "move_file",
    "rename_file",
    "delete_file",
    "delete_files",
    "file_exists",
    "get_file_info",
    "list_files",
];

/// Built-in profile names.
pub const PROFILES: &[&str] = &["system", "file_ops"];

/// Which model an agent runs on, what it is told, and which tools it may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub name: String,
    pub model: String,
    pub description: String,
    pub instruction: String,
    /// Tool names in the order they are offered to the model.
    pub tool_names: Vec<String>,
}

impl AgentDescriptor {
    /// The full system-control agent.
    pub fn system(model: impl Into<String>) -> Self {
        Self {
            name: "telegram_system_agent".into(),
            model: model.into(),
            description: SYSTEM_DESCRIPTION.into(),
            instruction: SYSTEM_INSTRUCTION.into(),
            tool_names: SYSTEM_TOOLS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// The file-operations agent.
    pub fn file_ops(model: impl Into<String>) -> Self {
        Self {
            name: "pro_agent".into(),
            model: model.into(),
            description: FILE_OPS_DESCRIPTION.into(),
            instruction: FILE_OPS_INSTRUCTION.into(),
            tool_names: FILE_OPS_TOOLS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Look up a built-in profile by name.
    pub fn for_profile(profile: &str, model: impl Into<String>) -> Result<Self, AgentError> {
        match profile.trim().to_lowercase().as_str() {
            "system" | "telegram_system_agent" => Ok(Self::system(model)),
            "file_ops" | "pro_agent" => Ok(Self::file_ops(model)),
            other => Err(AgentError::UnknownProfile(other.to_string())),
        }
    }

    /// The descriptor selected by configuration, with any instruction override.
    pub fn from_config(config: &AppConfig) -> Result<Self, AgentError> {
        let descriptor = Self::for_profile(&config.agent.profile, &config.model)?;
        Ok(match config.agent.instruction_override.as_deref() {
            Some(text) if !text.trim().is_empty() => descriptor.with_instruction(text),
            _ => descriptor,
        })
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Whether the model may call `name` through this agent.
    pub fn allows(&self, name: &str) -> bool {
        self.tool_names.iter().any(|t| t == name)
    }

    /// Definitions sent to the model, in descriptor order. Names the registry
    /// does not know are skipped with a warning.
    pub fn tools(&self, registry: &ToolRegistry) -> Vec<ToolDefinition> {
        self.tool_names
            .iter()
            .filter_map(|name| match registry.get(name) {
                Some(tool) => Some(tool.to_definition()),
                None => {
                    warn!(agent = %self.name, tool = %name, "Descriptor names an unregistered tool");
                    None
                }
            })
            .collect()
    }
}
