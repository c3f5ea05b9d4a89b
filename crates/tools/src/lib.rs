//! Built-in tool implementations for SysBot.
//!
//! Tools give the agent hands on the host machine: navigate and manage
//! directories, create, read, search and delete files, run shell commands,
//! change permissions, encrypt files and capture the screen.
//!
//! Every tool resolves relative paths against the calling session's
//! [`ToolContext`](sysbot_core::ToolContext), never the process working
//! directory.

pub mod batch;
pub mod content;
pub mod crypto;
pub mod directory;
pub mod file;
pub mod permissions;
pub mod screen;
pub mod shell;

mod fs_util;

use sysbot_core::tool::ToolRegistry;

/// Knobs for the built-in tools.
#[derive(Debug, Clone)]
pub struct ToolOptions {
    /// Default timeout for `execute_command` when the caller gives none.
    pub command_timeout_secs: u64,
    /// Passphrase used by the encryption tools when no password is passed.
    pub encryption_passphrase: Option<String>,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            command_timeout_secs: shell::DEFAULT_TIMEOUT_SECS,
            encryption_passphrase: None,
        }
    }
}

/// Create a registry with every built-in tool, directory tools first.
pub fn default_registry(options: &ToolOptions) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    // Directory tools
    registry.register(Box::new(directory::GetCwdTool));
    registry.register(Box::new(directory::ChdirTool));
    registry.register(Box::new(directory::MkdirTool));
    registry.register(Box::new(directory::CreateDirectoryTool));
    registry.register(Box::new(directory::ListDirectoryTool));
    registry.register(Box::new(directory::ListDirectoriesTool));
    registry.register(Box::new(directory::DirectoryExistsTool));
    registry.register(Box::new(directory::DeleteDirectoryTool));
    registry.register(Box::new(directory::CopyDirectoryTool));

    // File tools
    registry.register(Box::new(file::CreateFileTool));
    registry.register(Box::new(file::WriteFileTool));
    registry.register(Box::new(file::ReadFileTool));
    registry.register(Box::new(content::GetFileLinesTool));
    registry.register(Box::new(content::SearchInFileTool));
    registry.register(Box::new(file::CopyFileTool));
    registry.register(Box::new(file::MoveFileTool));
    registry.register(Box::new(file::RenameFileTool));
    registry.register(Box::new(file::DeleteFileTool));
    registry.register(Box::new(batch::DeleteFilesTool));
    registry.register(Box::new(file::FileExistsTool));
    registry.register(Box::new(file::GetFileInfoTool));
    registry.register(Box::new(file::ListFilesTool));
    registry.register(Box::new(batch::BatchRenameFilesTool));

    // System tools
    registry.register(Box::new(shell::ExecuteCommandTool::new(
        options.command_timeout_secs,
    )));
    registry.register(Box::new(permissions::ChangeFilePermissionsTool));

    // Security tools
    registry.register(Box::new(crypto::EncryptFilesTool::new(
        options.encryption_passphrase.clone(),
    )));
    registry.register(Box::new(crypto::DecryptFilesTool::new(
        options.encryption_passphrase.clone(),
    )));

    // Screen tools
    registry.register(Box::new(screen::CaptureScreenshotTool));
    registry.register(Box::new(screen::RecordScreenTool));

    registry
}
