//! Screen tools — screenshots and short screen recordings.
//!
//! Both shell out to the platform's capture utilities, so they only work on
//! a machine with a display session.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use sysbot_core::context::ToolContext;
use sysbot_core::error::ToolError;
use sysbot_core::tool::{Tool, ToolOutcome, parse_args};
use tokio::process::Command;
use tracing::debug;

use crate::fs_util::{self, display};

const SCREENSHOT_TIMEOUT_SECS: u64 = 30;
const MIN_RECORD_SECS: u64 = 1;
const MAX_RECORD_SECS: u64 = 120;
const DEFAULT_RECORD_SECS: u64 = 10;

enum Attempt {
    Done,
    /// The program is not installed.
    Missing,
}

async fn run_capture(
    tool: &str,
    program: &str,
    args: &[String],
    timeout_secs: u64,
) -> Result<Attempt, ToolError> {
    debug!(tool = %tool, program = %program, "Running capture utility");
    let mut cmd = Command::new(program);
    cmd.args(args).kill_on_drop(true);

    let output = match tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Attempt::Missing),
        Ok(Err(e)) => return Err(fs_util::failed(tool, format!("{program}: {e}"))),
        Err(_) => {
            return Err(ToolError::Timeout {
                tool_name: tool.to_string(),
                timeout_secs,
            });
        }
    };

    if output.status.success() {
        Ok(Attempt::Done)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: String = stderr.trim().lines().last().unwrap_or("").to_string();
        Err(fs_util::failed(
            tool,
            format!("{program} exited with {}: {tail}", output.status),
        ))
    }
}

/// Candidate screenshot commands for this platform, tried in order.
fn screenshot_commands(output: &Path) -> Vec<(&'static str, Vec<String>)> {
    let out = display(output);
    if cfg!(target_os = "macos") {
        vec![("screencapture", vec!["-x".into(), out])]
    } else if cfg!(target_os = "windows") {
        let script = format!(
            "Add-Type -AssemblyName System.Windows.Forms,System.Drawing; \
             $b = [System.Windows.Forms.Screen]::PrimaryScreen.Bounds; \
             $img = New-Object System.Drawing.Bitmap $b.Width, $b.Height; \
             $g = [System.Drawing.Graphics]::FromImage($img); \
             $g.CopyFromScreen($b.Location, [System.Drawing.Point]::Empty, $b.Size); \
             $img.Save('{}', [System.Drawing.Imaging.ImageFormat]::Png)",
            out.replace('\'', "''")
        );
        vec![(
            "powershell",
            vec!["-NoProfile".into(), "-Command".into(), script],
        )]
    } else {
        vec![
            ("grim", vec![out.clone()]),
            ("scrot", vec!["--overwrite".into(), out.clone()]),
            ("import", vec!["-window".into(), "root".into(), out]),
        ]
    }
}

/// ffmpeg arguments that grab the screen for `secs` seconds.
fn record_args(output: &Path, secs: u64) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into()];
    if cfg!(target_os = "macos") {
        args.extend(["-f", "avfoundation", "-i", "1:none"].map(String::from));
    } else if cfg!(target_os = "windows") {
        args.extend(["-f", "gdigrab", "-i", "desktop"].map(String::from));
    } else {
        let display_name = std::env::var("DISPLAY").unwrap_or_else(|_| ":0.0".into());
        args.extend(["-f".into(), "x11grab".into(), "-i".into(), display_name]);
    }
    args.extend([
        "-t".into(),
        secs.to_string(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        display(output),
    ]);
    args
}

async fn finish(tool: &str, output: &Path) -> Result<ToolOutcome, ToolError> {
    let meta = fs_util::metadata(tool, output)
        .await
        .map_err(|_| fs_util::failed(tool, "Capture finished but no file was written"))?;
    Ok(ToolOutcome::success()
        .with("path", display(output))
        .with("size", meta.len()))
}

/// Take a screenshot of the primary display.
pub struct CaptureScreenshotTool;

#[derive(Deserialize)]
struct ScreenshotArgs {
    #[serde(default)]
    output_path: Option<String>,
}

#[async_trait]
impl Tool for CaptureScreenshotTool {
    fn name(&self) -> &str {
        "capture_screenshot"
    }

    fn description(&self) -> &str {
        "Take a screenshot of the screen and save it as a PNG file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "output_path": {
                    "type": "string",
                    "description": "Where to save the image (defaults to screenshot_<timestamp>.png)"
                }
            }
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: ScreenshotArgs = parse_args(arguments)?;
        let raw = args
            .output_path
            .unwrap_or_else(|| format!("screenshot_{}.png", fs_util::stamp()));
        let output = ctx.resolve(&raw).await;
        fs_util::ensure_parent(self.name(), &output).await?;

        let candidates = screenshot_commands(&output);
        let mut tried = Vec::new();
        for (program, args) in &candidates {
            match run_capture(self.name(), program, args, SCREENSHOT_TIMEOUT_SECS).await? {
                Attempt::Done => return finish(self.name(), &output).await,
                Attempt::Missing => tried.push(*program),
            }
        }
        Err(ToolError::Unsupported(format!(
            "No screenshot utility found (tried: {})",
            tried.join(", ")
        )))
    }
}

/// Record the screen to a video file with ffmpeg.
pub struct RecordScreenTool;

#[derive(Deserialize)]
struct RecordArgs {
    #[serde(default)]
    duration_secs: Option<u64>,
    #[serde(default)]
    output_path: Option<String>,
}

#[async_trait]
impl Tool for RecordScreenTool {
    fn name(&self) -> &str {
        "record_screen"
    }

    fn description(&self) -> &str {
        "Record the screen for a number of seconds (1 to 120) and save it as an MP4 video. Requires ffmpeg."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "duration_secs": {
                    "type": "integer",
                    "description": "Length of the recording in seconds",
                    "default": DEFAULT_RECORD_SECS,
                    "minimum": MIN_RECORD_SECS,
                    "maximum": MAX_RECORD_SECS
                },
                "output_path": {
                    "type": "string",
                    "description": "Where to save the video (defaults to recording_<timestamp>.mp4)"
                }
            }
        })
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: RecordArgs = parse_args(arguments)?;
        let secs = args
            .duration_secs
            .unwrap_or(DEFAULT_RECORD_SECS)
            .clamp(MIN_RECORD_SECS, MAX_RECORD_SECS);
        let raw = args
            .output_path
            .unwrap_or_else(|| format!("recording_{}.mp4", fs_util::stamp()));
        let output = ctx.resolve(&raw).await;
        fs_util::ensure_parent(self.name(), &output).await?;

        match run_capture(self.name(), "ffmpeg", &record_args(&output, secs), secs + 30).await? {
            Attempt::Done => Ok(finish(self.name(), &output).await?.with("duration_secs", secs)),
            Attempt::Missing => Err(ToolError::Unsupported(
                "ffmpeg is not installed".into(),
            )),
        }
    }
}
