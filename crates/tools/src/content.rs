//! Content tools — read line ranges and search inside text files.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use sysbot_core::context::ToolContext;
use sysbot_core::error::ToolError;
use sysbot_core::tool::{Tool, ToolOutcome, parse_args};

use crate::fs_util::{self, display};

async fn read_text(tool: &str, path: &Path) -> Result<String, ToolError> {
    fs_util::require_file(tool, path).await?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| fs_util::io_error(tool, path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Read an inclusive, 1-indexed range of lines.
pub struct GetFileLinesTool;

#[derive(Deserialize)]
struct LinesArgs {
    path: String,
    #[serde(default)]
    start_line: Option<i64>,
    #[serde(default)]
    end_line: Option<i64>,
}

/// The clamped range `[start, end]` for a file of `total` lines.
/// `end < start` means the range is empty.
fn clamp_range(start: Option<i64>, end: Option<i64>, total: usize) -> (usize, usize) {
    let total_i = total as i64;
    let start = start.unwrap_or(1).max(1);
    let end = end.unwrap_or(total_i).min(total_i);
    (start as usize, end.max(0) as usize)
}

#[async_trait]
impl Tool for GetFileLinesTool {
    fn name(&self) -> &str {
        "get_file_lines"
    }

    fn description(&self) -> &str {
        "Read specific lines of a text file. Lines are 1-indexed and the range is inclusive; omit a bound to read to the start or end of the file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to read" },
                "start_line": { "type": "integer", "description": "First line (1-indexed)", "minimum": 1 },
                "end_line": { "type": "integer", "description": "Last line (inclusive)", "minimum": 1 }
            },
            "required": ["path"]
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: LinesArgs = parse_args(arguments)?;
        if let (Some(s), Some(e)) = (args.start_line, args.end_line)
            && s > e
        {
            return Err(ToolError::InvalidArguments(format!(
                "start_line ({s}) is after end_line ({e})"
            )));
        }

        let path = ctx.resolve(&args.path).await;
        let text = read_text(self.name(), &path).await?;
        let all: Vec<&str> = text.lines().collect();
        let total = all.len();

        let (start, end) = clamp_range(args.start_line, args.end_line, total);
        if total > 0 && start > total {
            return Err(fs_util::failed(
                self.name(),
                format!("start_line {start} is beyond the end of the file ({total} lines)"),
            ));
        }

        let lines: Vec<&str> = if start <= end {
            all[start - 1..end].to_vec()
        } else {
            Vec::new()
        };

        Ok(ToolOutcome::success()
            .with("path", display(&path))
            .with("start_line", start)
            .with("end_line", end)
            .with("total_lines", total)
            .with("content", lines.join("\n"))
            .with("lines", lines))
    }
}

/// One line that contains the search text.
#[derive(Debug, Clone, Serialize)]
pub struct LineMatch {
    pub line_number: usize,
    pub line: String,
}

/// Find lines containing a piece of text.
pub struct SearchInFileTool;

#[derive(Deserialize)]
struct SearchArgs {
    path: String,
    search_text: String,
    #[serde(default)]
    case_sensitive: bool,
}

fn find_matches(text: &str, needle: &str, case_sensitive: bool) -> Vec<LineMatch> {
    let needle_lower = needle.to_lowercase();
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            if case_sensitive {
                line.contains(needle)
            } else {
                line.to_lowercase().contains(&needle_lower)
            }
        })
        .map(|(i, line)| LineMatch {
            line_number: i + 1,
            line: line.trim().to_string(),
        })
        .collect()
}

#[async_trait]
impl Tool for SearchInFileTool {
    fn name(&self) -> &str {
        "search_in_file"
    }

    fn description(&self) -> &str {
        "Search a text file for lines containing the given text. Case-insensitive unless case_sensitive=true."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to search" },
                "search_text": { "type": "string", "description": "Text to look for" },
                "case_sensitive": {
                    "type": "boolean",
                    "description": "Match case exactly",
                    "default": false
                }
            },
            "required": ["path", "search_text"]
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: SearchArgs = parse_args(arguments)?;
        if args.search_text.is_empty() {
            return Err(ToolError::InvalidArguments(
                "search_text must not be empty".into(),
            ));
        }

        let path = ctx.resolve(&args.path).await;
        let text = read_text(self.name(), &path).await?;
        let matches = find_matches(&text, &args.search_text, args.case_sensitive);

        Ok(ToolOutcome::success()
            .with("path", display(&path))
            .with("search_text", &args.search_text)
            .with("match_count", matches.len())
            .with("matches", matches))
    }
}
