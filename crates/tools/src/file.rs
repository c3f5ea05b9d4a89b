//! File tools — create, read, write, copy, move, rename, delete and inspect files.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sysbot_core::context::ToolContext;
use sysbot_core::error::ToolError;
use sysbot_core::tool::{Tool, ToolOutcome, parse_args};
use tokio::io::AsyncWriteExt;

use crate::fs_util::{self, display};

#[derive(Deserialize)]
struct PathArgs {
    path: String,
}

#[derive(Deserialize)]
struct TransferArgs {
    source: String,
    destination: String,
}

fn path_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "path": { "type": "string", "description": description }
        },
        "required": ["path"]
    })
}

fn transfer_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "source": { "type": "string", "description": "File to take" },
            "destination": {
                "type": "string",
                "description": "Target file path, or an existing directory to place it in"
            }
        },
        "required": ["source", "destination"]
    })
}

/// If `destination` is an existing directory, the file keeps its name inside it.
async fn transfer_target(source: &Path, destination: PathBuf) -> PathBuf {
    if tokio::fs::metadata(&destination).await.is_ok_and(|m| m.is_dir()) {
        destination.join(fs_util::file_name(source))
    } else {
        destination
    }
}

fn rfc3339(time: std::io::Result<std::time::SystemTime>) -> Option<String> {
    time.ok()
        .map(|t| chrono::DateTime::<chrono::Local>::from(t).to_rfc3339())
}

/// Create a file with optional initial content.
pub struct CreateFileTool;

#[derive(Deserialize)]
struct CreateFileArgs {
    file_name: String,
    #[serde(default)]
    content: String,
}

#[async_trait]
impl Tool for CreateFileTool {
    fn name(&self) -> &str {
        "create_file"
    }

    fn description(&self) -> &str {
        "Create a file with the given content (empty by default). Missing parent directories are created; an existing file is overwritten."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_name": { "type": "string", "description": "Path of the file to create" },
                "content": { "type": "string", "description": "Initial content", "default": "" }
            },
            "required": ["file_name"]
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: CreateFileArgs = parse_args(arguments)?;
        let path = ctx.resolve(&args.file_name).await;
        fs_util::ensure_parent(self.name(), &path).await?;
        tokio::fs::write(&path, args.content.as_bytes())
            .await
            .map_err(|e| fs_util::io_error(self.name(), &path, e))?;

        Ok(ToolOutcome::success()
            .with("path", display(&path))
            .with("bytes_written", args.content.len())
            .with("message", format!("File created: {}", display(&path))))
    }
}

/// Write or append text to a file.
pub struct WriteFileTool;

#[derive(Deserialize)]
struct WriteFileArgs {
    path: String,
    content: String,
    #[serde(default)]
    append: bool,
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write text to a file, replacing its content, or append to it with append=true."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to write" },
                "content": { "type": "string", "description": "Text to write" },
                "append": {
                    "type": "boolean",
                    "description": "Append instead of overwriting",
                    "default": false
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: WriteFileArgs = parse_args(arguments)?;
        let path = ctx.resolve(&args.path).await;
        fs_util::ensure_parent(self.name(), &path).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(args.append)
            .truncate(!args.append)
            .open(&path)
            .await
            .map_err(|e| fs_util::io_error(self.name(), &path, e))?;
        file.write_all(args.content.as_bytes()).await?;
        file.flush().await?;

        Ok(ToolOutcome::success()
            .with("path", display(&path))
            .with("bytes_written", args.content.len())
            .with("mode", if args.append { "append" } else { "overwrite" }))
    }
}

/// Read a whole text file.
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the full text content of a file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        path_schema("File to read")
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: PathArgs = parse_args(arguments)?;
        let path = ctx.resolve(&args.path).await;
        fs_util::require_file(self.name(), &path).await?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| fs_util::io_error(self.name(), &path, e))?;

        Ok(ToolOutcome::success()
            .with("path", display(&path))
            .with("size", bytes.len())
            .with("content", String::from_utf8_lossy(&bytes)))
    }
}

/// Copy a file, keeping timestamps and permissions.
pub struct CopyFileTool;

#[async_trait]
impl Tool for CopyFileTool {
    fn name(&self) -> &str {
        "copy_file"
    }

    fn description(&self) -> &str {
        "Copy a file. Timestamps and permissions are preserved and missing destination directories are created."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        transfer_schema()
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: TransferArgs = parse_args(arguments)?;
        let source = ctx.resolve(&args.source).await;
        fs_util::require_file(self.name(), &source).await?;
        let destination = transfer_target(&source, ctx.resolve(&args.destination).await).await;

        fs_util::ensure_parent(self.name(), &destination).await?;
        let bytes = fs_util::copy_preserving(self.name(), &source, &destination).await?;

        Ok(ToolOutcome::success()
            .with("source", display(&source))
            .with("destination", display(&destination))
            .with("bytes_copied", bytes))
    }
}

/// Move a file to another path.
pub struct MoveFileTool;

#[async_trait]
impl Tool for MoveFileTool {
    fn name(&self) -> &str {
        "move_file"
    }

    fn description(&self) -> &str {
        "Move a file to a new location. Missing destination directories are created."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        transfer_schema()
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: TransferArgs = parse_args(arguments)?;
        let source = ctx.resolve(&args.source).await;
        fs_util::require_file(self.name(), &source).await?;
        let destination = transfer_target(&source, ctx.resolve(&args.destination).await).await;

        fs_util::ensure_parent(self.name(), &destination).await?;
        match tokio::fs::rename(&source, &destination).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
                fs_util::copy_preserving(self.name(), &source, &destination).await?;
                tokio::fs::remove_file(&source)
                    .await
                    .map_err(|e| fs_util::io_error(self.name(), &source, e))?;
            }
            Err(e) => return Err(fs_util::io_error(self.name(), &source, e)),
        }

        Ok(ToolOutcome::success()
            .with("source", display(&source))
            .with("destination", display(&destination)))
    }
}

/// Rename a file within its directory.
pub struct RenameFileTool;

#[derive(Deserialize)]
struct RenameArgs {
    path: String,
    new_name: String,
}

#[async_trait]
impl Tool for RenameFileTool {
    fn name(&self) -> &str {
        "rename_file"
    }

    fn description(&self) -> &str {
        "Rename a file in place. Fails if a file with the new name already exists."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to rename" },
                "new_name": { "type": "string", "description": "New file name (no directories)" }
            },
            "required": ["path", "new_name"]
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: RenameArgs = parse_args(arguments)?;
        let new_name = args.new_name.trim();
        if new_name.is_empty() || new_name.contains(['/', '\\']) || new_name == ".." {
            return Err(ToolError::InvalidArguments(format!(
                "new_name must be a plain file name, got '{}'",
                args.new_name
            )));
        }

        let path = ctx.resolve(&args.path).await;
        fs_util::metadata(self.name(), &path).await?;
        let target = path.with_file_name(new_name);
        if tokio::fs::symlink_metadata(&target).await.is_ok() {
            return Err(fs_util::failed(
                self.name(),
                format!("Destination already exists: {}", display(&target)),
            ));
        }

        tokio::fs::rename(&path, &target)
            .await
            .map_err(|e| fs_util::io_error(self.name(), &path, e))?;

        Ok(ToolOutcome::success()
            .with("old_path", display(&path))
            .with("new_path", display(&target)))
    }
}

/// Delete a single file.
pub struct DeleteFileTool;

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn description(&self) -> &str {
        "Delete a single file. Use delete_directory for directories."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        path_schema("File to delete")
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: PathArgs = parse_args(arguments)?;
        let path = ctx.resolve(&args.path).await;
        remove_file(self.name(), &path).await?;
        Ok(ToolOutcome::success()
            .with("path", display(&path))
            .with("message", format!("Deleted file: {}", display(&path))))
    }
}

/// Remove a regular file, refusing directories.
pub(crate) async fn remove_file(tool: &str, path: &Path) -> Result<(), ToolError> {
    fs_util::require_file(tool, path).await?;
    tokio::fs::remove_file(path)
        .await
        .map_err(|e| fs_util::io_error(tool, path, e))
}

/// Check whether a path exists.
pub struct FileExistsTool;

#[async_trait]
impl Tool for FileExistsTool {
    fn name(&self) -> &str {
        "file_exists"
    }

    fn description(&self) -> &str {
        "Check whether a path exists and whether it is a regular file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        path_schema("Path to check")
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: PathArgs = parse_args(arguments)?;
        let path = ctx.resolve(&args.path).await;
        let meta = tokio::fs::metadata(&path).await.ok();
        Ok(ToolOutcome::success()
            .with("path", display(&path))
            .with("exists", meta.is_some())
            .with("is_file", meta.is_some_and(|m| m.is_file())))
    }
}

/// Metadata of a file or directory.
pub struct GetFileInfoTool;

#[async_trait]
impl Tool for GetFileInfoTool {
    fn name(&self) -> &str {
        "get_file_info"
    }

    fn description(&self) -> &str {
        "Get size, timestamps, permissions and type of a file or directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        path_schema("Path to inspect")
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: PathArgs = parse_args(arguments)?;
        let path = ctx.resolve(&args.path).await;
        let meta = fs_util::metadata(self.name(), &path).await?;

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned());

        Ok(ToolOutcome::success()
            .with("path", display(&path))
            .with("name", fs_util::file_name(&path))
            .with("kind", fs_util::kind_of(meta.file_type()))
            .with("size", meta.len())
            .with("modified", rfc3339(meta.modified()))
            .with("accessed", rfc3339(meta.accessed()))
            .with("created", rfc3339(meta.created()))
            .with("readonly", meta.permissions().readonly())
            .with("extension", extension)
            .with("permissions", permission_string(&meta)))
    }
}

#[cfg(unix)]
fn permission_string(meta: &std::fs::Metadata) -> Option<String> {
    use std::os::unix::fs::PermissionsExt;
    Some(format!("{:o}", meta.permissions().mode() & 0o777))
}

#[cfg(not(unix))]
fn permission_string(_meta: &std::fs::Metadata) -> Option<String> {
    None
}

/// One row of a file listing.
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
}

/// List regular files in a directory.
pub struct ListFilesTool;

#[derive(Deserialize)]
struct ListFilesArgs {
    #[serde(default)]
    directory: Option<String>,
    #[serde(default = "default_pattern")]
    pattern: String,
    #[serde(default)]
    recursive: bool,
}

fn default_pattern() -> String {
    "*".into()
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files (not directories) in a directory, optionally matching a pattern such as '*.log' and descending recursively."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "Directory to list (defaults to the current directory)"
                },
                "pattern": {
                    "type": "string",
                    "description": "Glob pattern matched against file names",
                    "default": "*"
                },
                "recursive": {
                    "type": "boolean",
                    "description": "Include files in subdirectories",
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
        let args: ListFilesArgs = parse_args(arguments)?;
        let dir = ctx
            .resolve(args.directory.as_deref().unwrap_or_default())
            .await;
        fs_util::require_dir(self.name(), &dir).await?;
        let matcher = fs_util::name_matcher(&args.pattern)?;

        let files: Vec<FileEntry> = fs_util::walk(&dir, args.recursive)
            .filter(|e| e.file_type().is_file() && matcher.is_match(e.file_name()))
            .map(|e| FileEntry {
                name: e.file_name().to_string_lossy().into_owned(),
                path: display(e.path()),
                size: e.metadata().map(|m| m.len()).unwrap_or(0),
            })
            .collect();

        Ok(ToolOutcome::success()
            .with("directory", display(&dir))
            .with("pattern", &args.pattern)
            .with("count", files.len())
            .with("files", files))
    }
}
