//! Permission tool — change file mode bits.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use sysbot_core::context::ToolContext;
use sysbot_core::error::ToolError;
use sysbot_core::tool::{Tool, ToolOutcome, parse_args};

use crate::fs_util::{self, display};

/// Change permissions of a file or directory.
pub struct ChangeFilePermissionsTool;

#[derive(Deserialize)]
struct PermissionArgs {
    path: String,
    mode: String,
}

/// Parse an octal mode such as `"755"`, `"0644"` or `"0o600"`.
pub(crate) fn parse_mode(raw: &str) -> Result<u32, ToolError> {
    let digits = raw.trim();
    let digits = digits.strip_prefix("0o").unwrap_or(digits);
    let mode = u32::from_str_radix(digits, 8)
        .map_err(|_| ToolError::InvalidArguments(format!("Invalid octal mode '{raw}'")))?;
    if mode > 0o7777 {
        return Err(ToolError::InvalidArguments(format!(
            "Mode '{raw}' is out of range"
        )));
    }
    Ok(mode)
}

#[cfg(unix)]
async fn apply_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn apply_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_readonly(mode & 0o200 == 0);
    tokio::fs::set_permissions(path, perms).await
}

#[async_trait]
impl Tool for ChangeFilePermissionsTool {
    fn name(&self) -> &str {
        "change_file_permissions"
    }

    fn description(&self) -> &str {
        "Change the permissions of a file or directory using an octal mode such as '755' or '644'. On Windows only the read-only flag is affected."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File or directory" },
                "mode": { "type": "string", "description": "Octal permission mode, e.g. '755'" }
            },
            "required": ["path", "mode"]
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: PermissionArgs = parse_args(arguments)?;
        let mode = parse_mode(&args.mode)?;
        let path = ctx.resolve(&args.path).await;
        fs_util::metadata(self.name(), &path).await?;

        apply_mode(&path, mode)
            .await
            .map_err(|e| fs_util::io_error(self.name(), &path, e))?;

        Ok(ToolOutcome::success()
            .with("path", display(&path))
            .with("mode", format!("{mode:o}")))
    }
}
