//! Directory tools — navigate, create, list, copy and delete directories.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sysbot_core::context::ToolContext;
use sysbot_core::error::ToolError;
use sysbot_core::tool::{Tool, ToolOutcome, ToolStatus, parse_args};
use tracing::debug;

use crate::batch::BatchFailure;
use crate::fs_util::{self, display};

fn default_pattern() -> String {
    "*".into()
}

/// One row of a directory listing.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub name: String,
    pub path: String,
    pub kind: &'static str,
}

/// Report the session working directory.
pub struct GetCwdTool;

#[async_trait]
impl Tool for GetCwdTool {
    fn name(&self) -> &str {
        "get_cwd"
    }

    fn description(&self) -> &str {
        "Get the current working directory of this session."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn call(
        &self,
        _arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        Ok(ToolOutcome::success().with("cwd", display(&ctx.cwd().await)))
    }
}

/// Change the session working directory.
pub struct ChdirTool;

#[derive(Deserialize)]
struct ChdirArgs {
    dir_name: String,
}

#[async_trait]
impl Tool for ChdirTool {
    fn name(&self) -> &str {
        "chdir"
    }

    fn description(&self) -> &str {
        "Change the current working directory. Relative paths in later tool calls resolve against it."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "dir_name": {
                    "type": "string",
                    "description": "Directory to switch to (absolute, relative or ~)"
                }
            },
            "required": ["dir_name"]
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: ChdirArgs = parse_args(arguments)?;
        let target = ctx.resolve(&args.dir_name).await;
        fs_util::require_dir(self.name(), &target).await?;

        let target = tokio::fs::canonicalize(&target)
            .await
            .map_err(|e| fs_util::io_error(self.name(), &target, e))?;
        ctx.set_cwd(target.clone()).await;
        debug!(cwd = %target.display(), "Changed session directory");

        Ok(ToolOutcome::success()
            .with("cwd", display(&target))
            .with("message", format!("Changed directory to {}", display(&target))))
    }
}

/// Create `dir_name` inside `dir_location`.
pub struct MkdirTool;

#[derive(Deserialize)]
struct MkdirArgs {
    dir_location: String,
    dir_name: String,
}

#[async_trait]
impl Tool for MkdirTool {
    fn name(&self) -> &str {
        "mkdir"
    }

    fn description(&self) -> &str {
        "Create a directory named dir_name inside dir_location. Succeeds if it already exists."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "dir_location": {
                    "type": "string",
                    "description": "Parent directory (use '.' for the current directory)"
                },
                "dir_name": {
                    "type": "string",
                    "description": "Name of the directory to create"
                }
            },
            "required": ["dir_location", "dir_name"]
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: MkdirArgs = parse_args(arguments)?;
        if args.dir_name.trim().is_empty() {
            return Err(ToolError::InvalidArguments("dir_name must not be empty".into()));
        }
        let path = ctx.resolve(&args.dir_location).await.join(args.dir_name.trim());
        create_dir(self.name(), &path).await
    }
}

/// Create a directory (and parents) at `path`.
pub struct CreateDirectoryTool;

#[derive(Deserialize)]
struct PathArgs {
    path: String,
}

#[async_trait]
impl Tool for CreateDirectoryTool {
    fn name(&self) -> &str {
        "create_directory"
    }

    fn description(&self) -> &str {
        "Create a directory, including missing parents. Succeeds if it already exists."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory path to create"
                }
            },
            "required": ["path"]
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: PathArgs = parse_args(arguments)?;
        let path = ctx.resolve(&args.path).await;
        create_dir(self.name(), &path).await
    }
}

async fn create_dir(tool: &str, path: &std::path::Path) -> Result<ToolOutcome, ToolError> {
    let existed = tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir());
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| fs_util::io_error(tool, path, e))?;

    let message = if existed {
        format!("Directory already exists: {}", display(path))
    } else {
        format!("Directory created: {}", display(path))
    };
    Ok(ToolOutcome::success()
        .with("path", display(path))
        .with("created", !existed)
        .with("message", message))
}

/// List entries of a directory, optionally filtered and recursive.
pub struct ListDirectoryTool;

#[derive(Deserialize)]
struct ListArgs {
    #[serde(default)]
    path: Option<String>,
    #[serde(default = "default_pattern")]
    pattern: String,
    #[serde(default)]
    recursive: bool,
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List files and subdirectories. Supports a name pattern (e.g. '*.txt') and recursive listing."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list (defaults to the current directory)"
                },
                "pattern": {
                    "type": "string",
                    "description": "Glob pattern matched against entry names",
                    "default": "*"
                },
                "recursive": {
                    "type": "boolean",
                    "description": "Descend into subdirectories",
                    "default": false
                }
            }
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: ListArgs = parse_args(arguments)?;
        let dir = ctx.resolve(args.path.as_deref().unwrap_or_default()).await;
        fs_util::require_dir(self.name(), &dir).await?;
        let matcher = fs_util::name_matcher(&args.pattern)?;

        let entries: Vec<Entry> = fs_util::walk(&dir, args.recursive)
            .filter(|e| matcher.is_match(e.file_name()))
            .map(|e| Entry {
                name: e.file_name().to_string_lossy().into_owned(),
                path: display(e.path()),
                kind: fs_util::kind_of(e.file_type()),
            })
            .collect();

        Ok(ToolOutcome::success()
            .with("directory", display(&dir))
            .with("pattern", &args.pattern)
            .with("recursive", args.recursive)
            .with("count", entries.len())
            .with("entries", entries))
    }
}

/// List only the immediate subdirectories of a directory.
pub struct ListDirectoriesTool;

#[derive(Deserialize)]
struct OptionalPathArgs {
    #[serde(default)]
    path: Option<String>,
}

#[async_trait]
impl Tool for ListDirectoriesTool {
    fn name(&self) -> &str {
        "list_directories"
    }

    fn description(&self) -> &str {
        "List the subdirectories of a directory (defaults to the current directory)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to inspect"
                }
            }
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: OptionalPathArgs = parse_args(arguments)?;
        let dir = ctx.resolve(args.path.as_deref().unwrap_or_default()).await;
        fs_util::require_dir(self.name(), &dir).await?;

        let directories: Vec<String> = fs_util::walk(&dir, false)
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();

        Ok(ToolOutcome::success()
            .with("directory", display(&dir))
            .with("count", directories.len())
            .with("directories", directories))
    }
}

/// Check whether a directory exists.
pub struct DirectoryExistsTool;

#[async_trait]
impl Tool for DirectoryExistsTool {
    fn name(&self) -> &str {
        "directory_exists"
    }

    fn description(&self) -> &str {
        "Check whether a path exists and is a directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory path to check" }
            },
            "required": ["path"]
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: PathArgs = parse_args(arguments)?;
        let path = ctx.resolve(&args.path).await;
        let exists = tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir());
        Ok(ToolOutcome::success()
            .with("path", display(&path))
            .with("exists", exists))
    }
}

/// Delete a directory, optionally with its contents.
pub struct DeleteDirectoryTool;

#[derive(Deserialize)]
struct DeleteDirArgs {
    path: String,
    #[serde(default)]
    recursive: bool,
}

#[async_trait]
impl Tool for DeleteDirectoryTool {
    fn name(&self) -> &str {
        "delete_directory"
    }

    fn description(&self) -> &str {
        "Delete a directory. Without recursive=true only empty directories are removed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory to delete" },
                "recursive": {
                    "type": "boolean",
                    "description": "Also delete everything inside the directory",
                    "default": false
                }
            },
            "required": ["path"]
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: DeleteDirArgs = parse_args(arguments)?;
        let path = ctx.resolve(&args.path).await;
        fs_util::require_dir(self.name(), &path).await?;

        if args.recursive {
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(|e| fs_util::io_error(self.name(), &path, e))?;
        } else {
            let mut entries = tokio::fs::read_dir(&path)
                .await
                .map_err(|e| fs_util::io_error(self.name(), &path, e))?;
            if entries.next_entry().await?.is_some() {
                return Err(fs_util::failed(
                    self.name(),
                    format!(
                        "Directory is not empty: {} (use recursive=true to delete its contents)",
                        display(&path)
                    ),
                ));
            }
            tokio::fs::remove_dir(&path)
                .await
                .map_err(|e| fs_util::io_error(self.name(), &path, e))?;
        }

        let mode = if args.recursive { "recursively" } else { "(empty)" };
        Ok(ToolOutcome::success()
            .with("path", display(&path))
            .with("message", format!("Deleted directory {mode}: {}", display(&path))))
    }
}

/// Recursively copy a directory tree.
pub struct CopyDirectoryTool;

#[derive(Deserialize)]
struct CopyArgs {
    source: String,
    destination: String,
}

#[async_trait]
impl Tool for CopyDirectoryTool {
    fn name(&self) -> &str {
        "copy_directory"
    }

    fn description(&self) -> &str {
        "Copy a directory and everything inside it to a new location that must not exist yet."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "source": { "type": "string", "description": "Directory to copy" },
                "destination": { "type": "string", "description": "New directory path" }
            },
            "required": ["source", "destination"]
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: CopyArgs = parse_args(arguments)?;
        let source = ctx.resolve(&args.source).await;
        let destination = ctx.resolve(&args.destination).await;
        fs_util::require_dir(self.name(), &source).await?;

        if tokio::fs::metadata(&destination).await.is_ok() {
            return Err(fs_util::failed(
                self.name(),
                format!("Destination already exists: {}", display(&destination)),
            ));
        }
        if destination.starts_with(&source) {
            return Err(fs_util::failed(
                self.name(),
                "Destination must not be inside the source directory",
            ));
        }

        tokio::fs::create_dir_all(&destination)
            .await
            .map_err(|e| fs_util::io_error(self.name(), &destination, e))?;

        let mut files_copied = 0usize;
        let mut links_copied = 0usize;
        let mut failed = Vec::new();
        for entry in fs_util::walk(&source, true) {
            let Ok(relative) = entry.path().strip_prefix(&source) else {
                continue;
            };
            let target = destination.join(relative);
            let file_type = entry.file_type();
            let copied = if file_type.is_dir() {
                tokio::fs::create_dir_all(&target)
                    .await
                    .map_err(|e| fs_util::io_error(self.name(), &target, e))
            } else if file_type.is_symlink() {
                fs_util::copy_symlink(self.name(), entry.path(), &target)
                    .await
                    .map(|()| links_copied += 1)
            } else {
                fs_util::copy_preserving(self.name(), entry.path(), &target)
                    .await
                    .map(|_| files_copied += 1)
            };
            if let Err(e) = copied {
                debug!(path = %entry.path().display(), error = %e, "Entry not copied");
                failed.push(BatchFailure {
                    path: display(entry.path()),
                    error: e.to_string(),
                });
            }
        }

        let attempted = files_copied + links_copied + failed.len();
        let status = ToolStatus::for_batch(failed.len(), attempted);
        Ok(ToolOutcome::new(status)
            .with("source", display(&source))
            .with("destination", display(&destination))
            .with("files_copied", files_copied)
            .with("links_copied", links_copied)
            .with("failed_count", failed.len())
            .with("failed", failed))
    }
}
