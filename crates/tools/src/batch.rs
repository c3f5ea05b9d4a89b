//! Batch tools — operations over many files with per-item reporting.
//!
//! A batch is `success` when every item succeeded, `partial` when only some
//! did, and `error` when none did.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sysbot_core::context::ToolContext;
use sysbot_core::error::ToolError;
use sysbot_core::tool::{Tool, ToolOutcome, ToolStatus, parse_args};

use crate::fs_util::{self, display};

/// An item of a batch that could not be processed.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub path: String,
    pub error: String,
}

/// Delete several files, reporting each failure.
pub struct DeleteFilesTool;

#[derive(Deserialize)]
struct DeleteFilesArgs {
    paths: Vec<String>,
}

#[async_trait]
impl Tool for DeleteFilesTool {
    fn name(&self) -> &str {
        "delete_files"
    }

    fn description(&self) -> &str {
        "Delete several files at once. Files that cannot be deleted are reported individually; the rest are still deleted."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "paths": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Files to delete"
                }
            },
            "required": ["paths"]
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: DeleteFilesArgs = parse_args(arguments)?;
        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for raw in &args.paths {
            let path = ctx.resolve(raw).await;
            match crate::file::remove_file(self.name(), &path).await {
                Ok(()) => deleted.push(display(&path)),
                Err(e) => failed.push(BatchFailure {
                    path: raw.clone(),
                    error: e.to_string(),
                }),
            }
        }

        let total = args.paths.len();
        let status = ToolStatus::for_batch(failed.len(), total);
        let message = format!("Deleted {} of {} files", deleted.len(), total);
        Ok(ToolOutcome::new(status)
            .with("deleted_count", deleted.len())
            .with("failed_count", failed.len())
            .with("deleted", deleted)
            .with("failed", failed)
            .with("message", message))
    }
}

/// A file renamed by a batch.
#[derive(Debug, Clone, Serialize)]
pub struct Renamed {
    pub from: String,
    pub to: String,
}

/// Find-and-replace over file names in a directory.
pub struct BatchRenameFilesTool;

#[derive(Deserialize)]
struct BatchRenameArgs {
    directory: String,
    find: String,
    #[serde(default)]
    replace: String,
    #[serde(default = "default_pattern")]
    pattern: String,
}

fn default_pattern() -> String {
    "*".into()
}

#[async_trait]
impl Tool for BatchRenameFilesTool {
    fn name(&self) -> &str {
        "batch_rename_files"
    }

    fn description(&self) -> &str {
        "Rename every file in a directory whose name matches a pattern and contains 'find', replacing 'find' with 'replace'. Existing files are never overwritten."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "directory": { "type": "string", "description": "Directory holding the files" },
                "find": { "type": "string", "description": "Text to replace in file names" },
                "replace": { "type": "string", "description": "Replacement text", "default": "" },
                "pattern": {
                    "type": "string",
                    "description": "Only rename files matching this glob",
                    "default": "*"
                }
            },
            "required": ["directory", "find"]
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: BatchRenameArgs = parse_args(arguments)?;
        if args.find.is_empty() {
            return Err(ToolError::InvalidArguments("find must not be empty".into()));
        }
        if args.replace.contains(['/', '\\']) {
            return Err(ToolError::InvalidArguments(
                "replace must not contain path separators".into(),
            ));
        }

        let dir = ctx.resolve(&args.directory).await;
        fs_util::require_dir(self.name(), &dir).await?;
        let matcher = fs_util::name_matcher(&args.pattern)?;

        let candidates: Vec<_> = fs_util::walk(&dir, false)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let name = e.file_name().to_str()?.to_string();
                (matcher.is_match(&name) && name.contains(&args.find)).then_some(name)
            })
            .collect();

        let mut renamed = Vec::new();
        let mut failed = Vec::new();
        for name in &candidates {
            let new_name = name.replace(&args.find, &args.replace);
            let from = dir.join(name);
            let to = dir.join(&new_name);
            if new_name.is_empty() {
                failed.push(BatchFailure {
                    path: display(&from),
                    error: "New name would be empty".into(),
                });
                continue;
            }
            if tokio::fs::symlink_metadata(&to).await.is_ok() {
                failed.push(BatchFailure {
                    path: display(&from),
                    error: format!("Destination already exists: {new_name}"),
                });
                continue;
            }
            match tokio::fs::rename(&from, &to).await {
                Ok(()) => renamed.push(Renamed {
                    from: name.clone(),
                    to: new_name,
                }),
                Err(e) => failed.push(BatchFailure {
                    path: display(&from),
                    error: e.to_string(),
                }),
            }
        }

        let status = ToolStatus::for_batch(failed.len(), candidates.len());
        Ok(ToolOutcome::new(status)
            .with("directory", display(&dir))
            .with("renamed_count", renamed.len())
            .with("failed_count", failed.len())
            .with("renamed", renamed)
            .with("failed", failed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn touch(dir: &tempfile::TempDir, names: &[&str]) {
        for name in names {
            std::fs::write(dir.path().join(name), name).unwrap();
        }
    }

    #[tokio::test]
    async fn delete_all_present_is_success() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir, &["a.txt", "b.txt"]);
        let ctx = ToolContext::new(dir.path());

        let out = DeleteFilesTool
            .execute(json!({"paths": ["a.txt", "b.txt"]}), &ctx)
            .await;
        assert_eq!(out.status, ToolStatus::Success);
        assert_eq!(out.get("deleted_count").unwrap(), &json!(2));
        assert_eq!(out.get("failed_count").unwrap(), &json!(0));
    }

    #[tokio::test]
    async fn delete_some_missing_is_partial() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir, &["a.txt", "b.txt", "c.txt"]);
        let ctx = ToolContext::new(dir.path());

        let out = DeleteFilesTool
            .execute(
                json!({"paths": ["a.txt", "missing1.txt", "b.txt", "c.txt", "missing2.txt"]}),
                &ctx,
            )
            .await;
        assert_eq!(out.status, ToolStatus::Partial);
        assert_eq!(out.get("deleted_count").unwrap(), &json!(3));
        assert_eq!(out.get("failed_count").unwrap(), &json!(2));
        let failed = out.get("failed").unwrap().as_array().unwrap();
        assert_eq!(failed[0]["path"], "missing1.txt");
        assert!(failed[0]["error"].as_str().unwrap().contains("Path not found"));
    }

    #[tokio::test]
    async fn delete_all_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        let out = DeleteFilesTool
            .execute(json!({"paths": ["x", "y"]}), &ctx)
            .await;
        assert_eq!(out.status, ToolStatus::Error);
        assert_eq!(out.get("failed_count").unwrap(), &json!(2));
    }

    #[tokio::test]
    async fn delete_empty_list_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        let out = DeleteFilesTool.execute(json!({"paths": []}), &ctx).await;
        assert_eq!(out.status, ToolStatus::Success);
        assert_eq!(out.get("deleted_count").unwrap(), &json!(0));
        assert_eq!(out.get("failed_count").unwrap(), &json!(0));
    }

    #[tokio::test]
    async fn batch_rename_replaces_in_matching_names() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir, &["draft_a.txt", "draft_b.txt", "draft_c.md", "final.txt"]);
        let ctx = ToolContext::new(dir.path());

        let out = BatchRenameFilesTool
            .execute(
                json!({"directory": ".", "find": "draft_", "replace": "v1_", "pattern": "*.txt"}),
                &ctx,
            )
            .await;
        assert_eq!(out.status, ToolStatus::Success, "{out}");
        assert_eq!(out.get("renamed_count").unwrap(), &json!(2));
        assert!(dir.path().join("v1_a.txt").exists());
        assert!(dir.path().join("v1_b.txt").exists());
        assert!(dir.path().join("draft_c.md").exists());
    }

    #[tokio::test]
    async fn batch_rename_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir, &["old_a.txt", "old_b.txt", "new_a.txt"]);
        let ctx = ToolContext::new(dir.path());

        let out = BatchRenameFilesTool
            .execute(json!({"directory": ".", "find": "old_", "replace": "new_"}), &ctx)
            .await;
        assert_eq!(out.status, ToolStatus::Partial);
        assert_eq!(out.get("renamed_count").unwrap(), &json!(1));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("new_a.txt")).unwrap(),
            "new_a.txt"
        );
    }
}
