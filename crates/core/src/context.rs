//! Tool context — the working directory a tool call runs against.
//!
//! The process-wide current directory is never touched. Each session owns a
//! `ToolContext`, `chdir` moves only that session, and relative paths are
//! resolved here before any filesystem call.

use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Per-session state shared by every tool invocation.
#[derive(Debug)]
pub struct ToolContext {
    /// Directory the session started in (restored after `/clear`).
    workspace_root: PathBuf,
    /// Current working directory of the session.
    cwd: RwLock<PathBuf>,
}

impl ToolContext {
    /// Create a context rooted at `workspace_root`.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        let workspace_root = workspace_root.into();
        Self {
            cwd: RwLock::new(workspace_root.clone()),
            workspace_root,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// The session's current working directory.
    pub async fn cwd(&self) -> PathBuf {
        self.cwd.read().await.clone()
    }

    /// Replace the working directory. The caller is responsible for checking
    /// that the directory exists.
    pub async fn set_cwd(&self, dir: impl Into<PathBuf>) {
        *self.cwd.write().await = dir.into();
    }

    /// Resolve a user-supplied path against the working directory.
    ///
    /// Absolute paths are returned unchanged, a leading `~` expands to the home
    /// directory, and the empty string means the working directory itself.
    pub async fn resolve(&self, raw: &str) -> PathBuf {
        let raw = raw.trim();
        if raw.is_empty() || raw == "." {
            return self.cwd().await;
        }
        if let Some(rest) = raw.strip_prefix('~')
            && (rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\'))
            && let Some(home) = home_dir()
        {
            return home.join(rest.trim_start_matches(['/', '\\']));
        }
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd().await.join(path)
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}
