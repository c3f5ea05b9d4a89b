//! `sysbot chat` — Interactive or single-message chat in the terminal.
//!
//! Runs the same runner and session type as the bot, with the session
//! rooted in the configured workspace.

use std::io::Write;
use std::path::Path;
use sysbot_agent::{AgentRuntime, Session, SessionKey};
use sysbot_core::event::{AgentEvent, EventPart};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Render run events for the terminal.
pub fn render_events(events: &[AgentEvent]) -> String {
    let mut out = String::new();
    for event in events {
        for part in &event.parts {
            match part {
                EventPart::Text { text } if event.is_final => {
                    for line in text.trim().lines() {
                        out.push_str(&format!("  Assistant > {line}\n"));
                    }
                }
                EventPart::Text { text } => {
                    out.push_str(&format!("  … {}\n", text.trim()));
                }
                EventPart::FunctionCall { name, args, .. } => {
                    out.push_str(&format!("  🔧 {name} {args}\n"));
                }
                EventPart::FunctionResponse { response, .. } => {
                    out.push_str(&format!("     ↳ {response}\n"));
                }
            }
        }
    }
    out
}

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let runner = super::build_runner(&config)?;
    let mut session = Session::new(SessionKey::new("local", "session_local"), config.workspace_dir());

    if let Some(msg) = message {
        let events = runner.run(&mut session, &msg).await?;
        print!("{}", render_events(&events));
        return Ok(());
    }

    println!();
    println!("  SysBot — Interactive Mode");
    println!();
    println!("  Agent:     {}", runner.descriptor().name);
    println!("  Model:     {}", config.model);
    println!("  Workspace: {}", session.context.cwd().await.display());
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        match runner.run(&mut session, line).await {
            Ok(events) => {
                println!();
                print!("{}", render_events(&events));
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye! 👋");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_shows_tool_activity_then_reply() {
        let events = vec![
            AgentEvent::intermediate(
                "agent",
                vec![EventPart::FunctionCall {
                    id: "1".into(),
                    name: "get_cwd".into(),
                    args: serde_json::json!({}),
                }],
            ),
            AgentEvent::intermediate(
                "agent",
                vec![EventPart::FunctionResponse {
                    id: "1".into(),
                    name: "get_cwd".into(),
                    response: serde_json::json!({"status": "success"}),
                }],
            ),
            AgentEvent::final_text("agent", "You are in /tmp.\nAnything else?"),
        ];
        let out = render_events(&events);
        assert_eq!(
            out,
            "  🔧 get_cwd {}\n     ↳ {\"status\":\"success\"}\n  Assistant > You are in /tmp.\n  Assistant > Anything else?\n"
        );
    }
}
