//! Helpers shared by the filesystem tools.

use globset::{GlobBuilder, GlobMatcher};
use std::fs::FileTimes;
use std::io;
use std::path::Path;
use sysbot_core::error::ToolError;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

pub(crate) fn display(path: &Path) -> String {
    path.display().to_string()
}

pub(crate) fn failed(tool: &str, reason: impl Into<String>) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool.to_string(),
        reason: reason.into(),
    }
}

/// Map an I/O error on `path`, turning "not found" into `PathNotFound`.
pub(crate) fn io_error(tool: &str, path: &Path, err: io::Error) -> ToolError {
    if err.kind() == io::ErrorKind::NotFound {
        ToolError::PathNotFound(display(path))
    } else {
        failed(tool, format!("{}: {err}", display(path)))
    }
}

/// Metadata of an existing path, or `PathNotFound`.
pub(crate) async fn metadata(tool: &str, path: &Path) -> Result<std::fs::Metadata, ToolError> {
    tokio::fs::metadata(path)
        .await
        .map_err(|e| io_error(tool, path, e))
}

/// Fail unless `path` is an existing directory.
pub(crate) async fn require_dir(tool: &str, path: &Path) -> Result<(), ToolError> {
    let meta = metadata(tool, path).await?;
    if meta.is_dir() {
        Ok(())
    } else {
        Err(failed(tool, format!("Not a directory: {}", display(path))))
    }
}

/// Metadata of a path that must be a regular file.
pub(crate) async fn require_file(tool: &str, path: &Path) -> Result<std::fs::Metadata, ToolError> {
    let meta = metadata(tool, path).await?;
    if meta.is_file() {
        Ok(meta)
    } else {
        Err(failed(tool, format!("Not a file: {}", display(path))))
    }
}

pub(crate) async fn ensure_parent(tool: &str, path: &Path) -> Result<(), ToolError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(tool, parent, e))?;
    }
    Ok(())
}

/// Compile a shell-style pattern matched against bare file names.
pub(crate) fn name_matcher(pattern: &str) -> Result<GlobMatcher, ToolError> {
    let pattern = if pattern.trim().is_empty() {
        "*"
    } else {
        pattern
    };
    Ok(GlobBuilder::new(pattern)
        .literal_separator(false)
        .build()
        .map_err(|e| ToolError::InvalidArguments(format!("Invalid pattern '{pattern}': {e}")))?
        .compile_matcher())
}

/// Entries below `dir` (the directory itself excluded), sorted by name.
/// Unreadable entries are skipped.
pub(crate) fn walk(dir: &Path, recursive: bool) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
}

pub(crate) fn kind_of(file_type: std::fs::FileType) -> &'static str {
    if file_type.is_symlink() {
        "symlink"
    } else if file_type.is_dir() {
        "directory"
    } else {
        "file"
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Copy a file, keeping its permission bits and access/modification times.
pub(crate) async fn copy_preserving(tool: &str, src: &Path, dst: &Path) -> Result<u64, ToolError> {
    let bytes = tokio::fs::copy(src, dst)
        .await
        .map_err(|e| io_error(tool, src, e))?;
    let meta = metadata(tool, src).await?;
    if let Err(e) = copy_times(&meta, dst) {
        debug!(path = %dst.display(), error = %e, "Could not preserve timestamps");
    }
    Ok(bytes)
}

/// Re-create the symlink at `src` as `dst` with the same target.
pub(crate) async fn copy_symlink(tool: &str, src: &Path, dst: &Path) -> Result<(), ToolError> {
    let target = tokio::fs::read_link(src)
        .await
        .map_err(|e| io_error(tool, src, e))?;
    #[cfg(unix)]
    let linked = tokio::fs::symlink(&target, dst).await;
    #[cfg(windows)]
    let linked = if tokio::fs::metadata(src).await.is_ok_and(|m| m.is_dir()) {
        tokio::fs::symlink_dir(&target, dst).await
    } else {
        tokio::fs::symlink_file(&target, dst).await
    };
    #[cfg(not(any(unix, windows)))]
    let linked: io::Result<()> = Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ));
    linked.map_err(|e| failed(tool, format!("{}: {e}", display(dst))))
}

fn copy_times(meta: &std::fs::Metadata, dst: &Path) -> io::Result<()> {
    let times = FileTimes::new()
        .set_accessed(meta.accessed()?)
        .set_modified(meta.modified()?);
    // The copy may have inherited a read-only mode.
    let file = match std::fs::OpenOptions::new().write(true).open(dst) {
        Ok(file) => file,
        Err(_) => std::fs::File::open(dst)?,
    };
    file.set_times(times)
}

/// Local timestamp used in generated file names.
pub(crate) fn stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}
