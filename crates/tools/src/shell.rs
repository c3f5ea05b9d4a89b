//! Shell tool — run a command in the session working directory.
//!
//! Commands go through `sh -c` (`cmd /C` on Windows) and are killed when
//! they exceed their timeout.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use sysbot_core::context::ToolContext;
use sysbot_core::error::ToolError;
use sysbot_core::tool::{Tool, ToolOutcome, ToolStatus, parse_args};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::fs_util::display;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Upper bound accepted from callers.
const MAX_TIMEOUT_SECS: u64 = 3600;

/// Execute a shell command and capture its output.
pub struct ExecuteCommandTool {
    default_timeout_secs: u64,
}

impl ExecuteCommandTool {
    pub fn new(default_timeout_secs: u64) -> Self {
        Self {
            default_timeout_secs: default_timeout_secs.clamp(1, MAX_TIMEOUT_SECS),
        }
    }
}

impl Default for ExecuteCommandTool {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_SECS)
    }
}

#[derive(Deserialize)]
struct CommandArgs {
    command: String,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

pub(crate) fn shell_command(command: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

#[async_trait]
impl Tool for ExecuteCommandTool {
    fn name(&self) -> &str {
        "execute_command"
    }

    fn description(&self) -> &str {
        "Execute a shell command in the current working directory and return stdout, stderr and the exit code."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "timeout_secs": {
                    "type": "integer",
                    "description": "Kill the command after this many seconds",
                    "default": self.default_timeout_secs
                }
            },
            "required": ["command"]
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: CommandArgs = parse_args(arguments)?;
        let command = args.command.trim();
        if command.is_empty() {
            return Err(ToolError::InvalidArguments("command must not be empty".into()));
        }
        let timeout_secs = args
            .timeout_secs
            .unwrap_or(self.default_timeout_secs)
            .clamp(1, MAX_TIMEOUT_SECS);
        let cwd = ctx.cwd().await;

        debug!(command = %command, cwd = %cwd.display(), timeout_secs, "Executing shell command");

        let mut cmd = shell_command(command);
        cmd.current_dir(&cwd).kill_on_drop(true);

        let output = match tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ToolError::ExecutionFailed {
                    tool_name: self.name().into(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                warn!(command = %command, timeout_secs, "Command timed out");
                return Err(ToolError::Timeout {
                    tool_name: self.name().into(),
                    timeout_secs,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
        let exit_code = output.status.code();

        let status = if output.status.success() {
            ToolStatus::Success
        } else {
            warn!(command = %command, exit_code = exit_code.unwrap_or(-1), "Command failed");
            ToolStatus::Error
        };

        let mut outcome = ToolOutcome::new(status)
            .with("command", command)
            .with("cwd", display(&cwd))
            .with("exit_code", exit_code)
            .with("stdout", stdout)
            .with("stderr", stderr);
        if status == ToolStatus::Error {
            let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
            outcome = outcome.with("message", format!("Command exited with status {code}"));
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn execute_echo() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        let out = ExecuteCommandTool::default()
            .execute(json!({"command": "echo hello"}), &ctx)
            .await;
        assert!(out.is_success(), "{out}");
        assert_eq!(out.get("stdout").unwrap(), &json!("hello"));
        assert_eq!(out.get("exit_code").unwrap(), &json!(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_session_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let ctx = ToolContext::new(dir.path());
        let out = ExecuteCommandTool::default()
            .execute(json!({"command": "ls"}), &ctx)
            .await;
        assert!(out.get("stdout").unwrap().as_str().unwrap().contains("marker.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        let out = ExecuteCommandTool::default()
            .execute(json!({"command": "echo oops >&2; exit 3"}), &ctx)
            .await;
        assert_eq!(out.status, ToolStatus::Error);
        assert_eq!(out.get("exit_code").unwrap(), &json!(3));
        assert_eq!(out.get("stderr").unwrap(), &json!("oops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        let out = ExecuteCommandTool::default()
            .execute(json!({"command": "sleep 5", "timeout_secs": 1}), &ctx)
            .await;
        assert_eq!(out.status, ToolStatus::Error);
        assert!(out.message().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn empty_command_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        let out = ExecuteCommandTool::default()
            .execute(json!({"command": "   "}), &ctx)
            .await;
        assert_eq!(out.status, ToolStatus::Error);
    }
}
