//! Turning run events into the text sent back to the chat.

use sysbot_core::event::{AgentEvent, EventPart};

pub const PROCESSING_TEXT: &str = "🤖 Processing your request...";

pub const FALLBACK_REPLY: &str =
    "I processed your request but couldn't generate a response. Please try again.";

pub const LONG_REPLY_CAPTION: &str = "📄 Response is too long, sent as file.";

pub const UNAUTHORIZED_TEXT: &str = "⛔ You are not authorized to use this bot.";

/// The reply for an error caught at the handler boundary.
pub fn error_reply(err: &dyn std::fmt::Display) -> String {
    format!("❌ Error: {err}\n\nPlease try again or rephrase your request.")
}

/// Preview of a tool call: name plus pretty-printed arguments.
pub fn tool_call_preview(name: &str, args: &serde_json::Value) -> String {
    let args = serde_json::to_string_pretty(args).unwrap_or_else(|_| args.to_string());
    format!("🔧 Tool call: {name}\n{args}")
}

/// Build the reply for one run.
///
/// Text of the final event becomes the primary reply. Tool-call previews and
/// tool results from intermediate events follow as extra info, in emission
/// order.
pub fn collect_reply(events: &[AgentEvent]) -> String {
    let mut texts = Vec::new();
    let mut extra = Vec::new();

    for event in events {
        if event.is_final {
            texts.extend(event.texts().map(str::trim).filter(|t| !t.is_empty()));
            continue;
        }
        for part in &event.parts {
            match part {
                EventPart::FunctionCall { name, args, .. } => {
                    extra.push(tool_call_preview(name, args));
                }
                EventPart::FunctionResponse { response, .. } => {
                    extra.push(response.to_string());
                }
                EventPart::Text { .. } => {}
            }
        }
    }

    let primary = texts.join("\n");
    let extra = extra.join("\n\n");
    match (primary.is_empty(), extra.is_empty()) {
        (true, true) => FALLBACK_REPLY.to_string(),
        (_, true) => primary,
        _ => format!("{primary}\n\n{extra}").trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, args: serde_json::Value) -> EventPart {
        EventPart::FunctionCall {
            id: "c1".into(),
            name: name.into(),
            args,
        }
    }

    fn response(value: serde_json::Value) -> EventPart {
        EventPart::FunctionResponse {
            id: "c1".into(),
            name: "mkdir".into(),
            response: value,
        }
    }

    #[test]
    fn final_text_only() {
        let events = vec![AgentEvent::final_text("a", "  Done.  ")];
        assert_eq!(collect_reply(&events), "Done.");
    }

    #[test]
    fn tool_activity_follows_reply() {
        let events = vec![
            AgentEvent::intermediate(
                "a",
                vec![
                    EventPart::Text { text: "thinking".into() },
                    call("mkdir", json!({"dir_location": ".", "dir_name": "x"})),
                ],
            ),
            AgentEvent::intermediate("a", vec![response(json!({"status": "success"}))]),
            AgentEvent::final_text("a", "Created x."),
        ];
        let reply = collect_reply(&events);
        assert!(reply.starts_with("Created x.\n\n🔧 Tool call: mkdir\n{\n"));
        assert!(reply.contains("  \"dir_name\": \"x\""));
        assert!(reply.ends_with("\n\n{\"status\":\"success\"}"));
        assert!(!reply.contains("thinking"));
    }

    #[test]
    fn extra_info_alone_is_trimmed() {
        let events = vec![
            AgentEvent::intermediate("a", vec![response(json!({"status": "error"}))]),
            AgentEvent::final_text("a", "   "),
        ];
        assert_eq!(collect_reply(&events), "{\"status\":\"error\"}");
    }

    #[test]
    fn empty_run_uses_fallback() {
        assert_eq!(collect_reply(&[]), FALLBACK_REPLY);
        let events = vec![AgentEvent::final_text("a", "")];
        assert_eq!(collect_reply(&events), FALLBACK_REPLY);
    }

    #[test]
    fn error_reply_format() {
        let reply = error_reply(&"boom");
        assert_eq!(reply, "❌ Error: boom\n\nPlease try again or rephrase your request.");
    }
}
