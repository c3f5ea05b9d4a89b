//! End-to-end integration tests for SysBot.
//!
//! These tests exercise the full pipeline from an inbound chat message to the
//! reply: authorization, session lookup, the tool-calling loop against a
//! scripted provider, real filesystem tools and reply delivery.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use sysbot_agent::{AgentDescriptor, AgentRunner, SessionStore};
use sysbot_core::channel::{Channel, ChatId, Document, Inbound};
use sysbot_core::context::ToolContext;
use sysbot_core::error::{ChannelError, ProviderError};
use sysbot_core::message::{Message, MessageToolCall};
use sysbot_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use sysbot_core::tool::{ToolCall, ToolRegistry};
use sysbot_frontend::{Dispatcher, FrontendOptions};
use sysbot_security::ChatAllowlist;
use sysbot_tools::{ToolOptions, default_registry};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence.
struct ScriptedProvider {
    responses: Mutex<VecDeque<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::Network("ScriptedProvider exhausted".into()))
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock".into(),
    }
}

fn tool_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tools("", tool_calls),
        usage: None,
        model: "mock".into(),
    }
}

fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

// ── Mock Channel ─────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingChannel {
    texts: Mutex<Vec<(ChatId, String)>>,
    documents: Mutex<Vec<(ChatId, String, bool)>>,
}

impl RecordingChannel {
    fn last_text(&self) -> String {
        self.texts.lock().unwrap().last().map(|(_, t)| t.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn poll(&self) -> Result<Vec<Inbound>, ChannelError> {
        Ok(Vec::new())
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        _reply_to: Option<i64>,
    ) -> Result<(), ChannelError> {
        self.texts.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), ChannelError> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        self.documents
            .lock()
            .unwrap()
            .push((chat_id, content, caption.is_some()));
        Ok(())
    }

    async fn download(&self, _document: &Document) -> Result<Vec<u8>, ChannelError> {
        Ok(b"uploaded bytes".to_vec())
    }
}

struct Harness {
    provider: Arc<ScriptedProvider>,
    channel: Arc<RecordingChannel>,
    dispatcher: Dispatcher,
    workspace: tempfile::TempDir,
}

fn harness(responses: Vec<ProviderResponse>, allow: &[&str], descriptor: AgentDescriptor) -> Harness {
    let workspace = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::new(responses));
    let channel = Arc::new(RecordingChannel::default());
    let runner = AgentRunner::new(
        provider.clone(),
        Arc::new(default_registry(&ToolOptions::default())),
        descriptor,
    );
    let dispatcher = Dispatcher::new(
        channel.clone(),
        Arc::new(runner),
        Arc::new(SessionStore::new(workspace.path())),
        ChatAllowlist::from_entries(allow),
    );
    Harness {
        provider,
        channel,
        dispatcher,
        workspace,
    }
}

async fn run_tool(registry: &ToolRegistry, ctx: &ToolContext, name: &str, args: serde_json::Value) -> serde_json::Value {
    let call = ToolCall {
        id: "t".into(),
        name: name.into(),
        arguments: args,
    };
    registry.execute(&call, ctx).await.to_json()
}

// ── E2E: Chat → Agent → Tools → Reply ────────────────────────────────────

#[tokio::test]
async fn e2e_create_file_through_chat() {
    let h = harness(
        vec![
            tool_response(vec![make_tool_call(
                "create_file",
                serde_json::json!({"file_name": "hello.txt", "content": "hello world"}),
            )]),
            text_response("Created hello.txt."),
        ],
        &["1"],
        AgentDescriptor::system("mock"),
    );

    h.dispatcher
        .handle(Inbound::text(ChatId(1), "create hello.txt saying hello world"))
        .await;

    let created = h.workspace.path().join("hello.txt");
    assert_eq!(std::fs::read_to_string(created).unwrap(), "hello world");
    assert_eq!(h.provider.calls(), 2);

    let reply = h.channel.last_text();
    assert!(reply.starts_with("Created hello.txt.\n\n🔧 Tool call: create_file\n"));
    assert!(reply.contains("\"status\":\"success\""));
}

#[tokio::test]
async fn e2e_unauthorized_chat_never_reaches_model() {
    let h = harness(vec![text_response("should not be used")], &["1"], AgentDescriptor::system("mock"));

    h.dispatcher
        .handle(Inbound::text(ChatId(666), "execute rm -rf /"))
        .await;

    assert_eq!(h.provider.calls(), 0);
    assert_eq!(h.channel.last_text(), "⛔ You are not authorized to use this bot.");
}

#[tokio::test]
async fn e2e_chdir_sticks_to_the_session_until_clear() {
    let h = harness(
        vec![
            tool_response(vec![make_tool_call("mkdir", serde_json::json!({"dir_location": ".", "dir_name": "proj"}))]),
            tool_response(vec![make_tool_call("chdir", serde_json::json!({"dir_name": "proj"}))]),
            text_response("Now in proj."),
            tool_response(vec![make_tool_call("create_file", serde_json::json!({"file_name": "a.txt"}))]),
            text_response("Created a.txt in proj."),
            tool_response(vec![make_tool_call("create_file", serde_json::json!({"file_name": "b.txt"}))]),
            text_response("Created b.txt."),
        ],
        &["1", "2"],
        AgentDescriptor::system("mock"),
    );
    let root = h.workspace.path();

    h.dispatcher.handle(Inbound::text(ChatId(1), "make proj and go there")).await;
    h.dispatcher.handle(Inbound::text(ChatId(1), "create a.txt")).await;
    assert!(root.join("proj/a.txt").exists());

    // Another chat is unaffected by chat 1's chdir.
    h.dispatcher.handle(Inbound::text(ChatId(2), "/info")).await;
    let expected = format!("Current Directory: {}\n", root.display());
    assert!(h.channel.last_text().contains(&expected));

    h.dispatcher.handle(Inbound::text(ChatId(1), "/clear")).await;
    h.dispatcher.handle(Inbound::text(ChatId(1), "create b.txt")).await;
    assert!(root.join("b.txt").exists());
    assert!(!root.join("proj/b.txt").exists());
}

#[tokio::test]
async fn e2e_file_ops_profile_cannot_run_commands() {
    let h = harness(
        vec![
            tool_response(vec![make_tool_call(
                "execute_command",
                serde_json::json!({"command": "touch marker"}),
            )]),
            text_response("I could not run that."),
        ],
        &["*"],
        AgentDescriptor::file_ops("mock"),
    );

    h.dispatcher.handle(Inbound::text(ChatId(9), "touch marker")).await;

    assert!(!h.workspace.path().join("marker").exists());
    let reply = h.channel.last_text();
    assert!(reply.contains("Tool not found: execute_command"));

    let offered: Vec<String> = h.provider.requests.lock().unwrap()[0]
        .tools
        .iter()
        .map(|t| t.name.clone())
        .collect();
    assert!(!offered.contains(&"execute_command".to_string()));
    assert_eq!(offered.len(), 20);
}

#[tokio::test]
async fn e2e_long_reply_is_delivered_as_document() {
    let long = "line of output\n".repeat(400);
    let h = harness(vec![text_response(&long)], &["1"], AgentDescriptor::system("mock"));

    h.dispatcher.handle(Inbound::text(ChatId(1), "dump everything")).await;

    let documents = h.channel.documents.lock().unwrap();
    assert_eq!(documents.len(), 1);
    let (chat, content, has_caption) = &documents[0];
    assert_eq!(*chat, ChatId(1));
    assert_eq!(content, long.trim());
    assert!(has_caption);
}

#[tokio::test]
async fn e2e_provider_failure_is_reported_and_next_message_works() {
    let h = harness(vec![], &["1"], AgentDescriptor::system("mock"));

    h.dispatcher.handle(Inbound::text(ChatId(1), "hello")).await;
    let reply = h.channel.last_text();
    assert!(reply.starts_with("❌ Error: "));
    assert!(reply.contains("ScriptedProvider exhausted"));

    h.dispatcher.handle(Inbound::text(ChatId(1), "/help")).await;
    assert!(h.channel.last_text().starts_with("📖 Help & Examples"));
}

// ── E2E: Tool Library Properties ─────────────────────────────────────────

#[tokio::test]
async fn e2e_missing_paths_always_yield_error_status() {
    let dir = tempfile::tempdir().unwrap();
    let registry = default_registry(&ToolOptions::default());
    let ctx = ToolContext::new(dir.path());

    let cases = [
        ("read_file", serde_json::json!({"path": "ghost.txt"})),
        ("get_file_lines", serde_json::json!({"path": "ghost.txt", "start_line": 1, "end_line": 2})),
        ("search_in_file", serde_json::json!({"path": "ghost.txt", "search_text": "x"})),
        ("copy_file", serde_json::json!({"source": "ghost.txt", "destination": "b.txt"})),
        ("move_file", serde_json::json!({"source": "ghost.txt", "destination": "b.txt"})),
        ("rename_file", serde_json::json!({"path": "ghost.txt", "new_name": "b.txt"})),
        ("delete_file", serde_json::json!({"path": "ghost.txt"})),
        ("get_file_info", serde_json::json!({"path": "ghost.txt"})),
        ("chdir", serde_json::json!({"dir_name": "ghost"})),
        ("delete_directory", serde_json::json!({"path": "ghost"})),
        ("copy_directory", serde_json::json!({"source": "ghost", "destination": "copy"})),
        ("list_directory", serde_json::json!({"path": "ghost"})),
        ("list_files", serde_json::json!({"directory": "ghost"})),
        ("change_file_permissions", serde_json::json!({"path": "ghost.txt", "mode": "644"})),
    ];

    for (name, args) in cases {
        let outcome = run_tool(&registry, &ctx, name, args).await;
        assert_eq!(outcome["status"], "error", "{name} should fail: {outcome}");
        assert!(outcome["message"].is_string(), "{name} should explain: {outcome}");
    }
}

#[tokio::test]
async fn e2e_batch_delete_statuses() {
    let dir = tempfile::tempdir().unwrap();
    let registry = default_registry(&ToolOptions::default());
    let ctx = ToolContext::new(dir.path());
    for name in ["a", "b", "c"] {
        std::fs::write(dir.path().join(name), name).unwrap();
    }

    let outcome = run_tool(
        &registry,
        &ctx,
        "delete_files",
        serde_json::json!({"paths": ["a", "b", "missing1", "missing2", "c"]}),
    )
    .await;
    assert_eq!(outcome["status"], "partial");
    assert_eq!(outcome["deleted_count"], 3);
    assert_eq!(outcome["failed_count"], 2);

    let outcome = run_tool(&registry, &ctx, "delete_files", serde_json::json!({"paths": ["a", "b"]})).await;
    assert_eq!(outcome["status"], "error");
    assert_eq!(outcome["deleted_count"], 0);

    let outcome = run_tool(&registry, &ctx, "delete_files", serde_json::json!({"paths": []})).await;
    assert_eq!(outcome["status"], "success");
    assert_eq!(outcome["deleted_count"], 0);
    assert_eq!(outcome["failed_count"], 0);
}

#[tokio::test]
async fn e2e_file_info_takes_path_argument() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
    let registry = default_registry(&ToolOptions::default());
    let ctx = ToolContext::new(dir.path());

    let args: serde_json::Value = serde_json::from_str(r#"{"path": "Cargo.toml"}"#).unwrap();
    let info = run_tool(&registry, &ctx, "get_file_info", args).await;
    assert_eq!(info["status"], "success");
    assert_eq!(info["name"], "Cargo.toml");
    assert_eq!(info["size"], 10);
}

#[tokio::test]
async fn e2e_file_round_trip_and_line_ranges() {
    let dir = tempfile::tempdir().unwrap();
    let registry = default_registry(&ToolOptions::default());
    let ctx = ToolContext::new(dir.path());

    let content: String = (1..=10).map(|i| format!("line {i}\n")).collect();
    let created = run_tool(
        &registry,
        &ctx,
        "create_file",
        serde_json::json!({"file_name": "ten.txt", "content": content}),
    )
    .await;
    assert_eq!(created["status"], "success");

    let read = run_tool(&registry, &ctx, "read_file", serde_json::json!({"path": "ten.txt"})).await;
    assert_eq!(read["content"], content.as_str());

    let lines = run_tool(
        &registry,
        &ctx,
        "get_file_lines",
        serde_json::json!({"path": "ten.txt", "start_line": 2, "end_line": 4}),
    )
    .await;
    assert_eq!(lines["start_line"], 2);
    assert_eq!(lines["end_line"], 4);
    assert_eq!(lines["lines"].as_array().unwrap().len(), 3);

    let clamped = run_tool(
        &registry,
        &ctx,
        "get_file_lines",
        serde_json::json!({"path": "ten.txt", "start_line": 8, "end_line": 50}),
    )
    .await;
    assert_eq!(clamped["status"], "success");
    assert_eq!(clamped["end_line"], 10);
    assert_eq!(clamped["total_lines"], 10);
}

#[tokio::test]
async fn e2e_mkdir_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let registry = default_registry(&ToolOptions::default());
    let ctx = ToolContext::new(dir.path());
    let args = serde_json::json!({"dir_location": dir.path().to_str().unwrap(), "dir_name": "same"});

    let first = run_tool(&registry, &ctx, "mkdir", args.clone()).await;
    let second = run_tool(&registry, &ctx, "mkdir", args).await;
    assert_eq!(first["status"], "success");
    assert_eq!(second["status"], "success");
    assert!(dir.path().join("same").is_dir());
}

// ── E2E: Configuration System ────────────────────────────────────────────

#[tokio::test]
async fn e2e_config_file_drives_runner_and_frontend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
api_key = "test-key"
model = "gemini-1.5-pro"

[agent]
profile = "file_ops"
max_iterations = 3

[telegram]
bot_token = "1:abc"
allowed_chat_ids = ["42"]
retry_delay_secs = 1

[uploads]
overwrite = true
"#,
    )
    .unwrap();

    let config = sysbot_config::AppConfig::load_from(&path).unwrap();
    let provider = sysbot_providers::build_from_config(&config).unwrap();
    let tools = Arc::new(default_registry(&ToolOptions::default()));
    let runner = AgentRunner::from_config(&config, provider, tools).unwrap();
    assert_eq!(runner.descriptor().name, "pro_agent");
    assert_eq!(runner.descriptor().model, "gemini-1.5-pro");

    let options = FrontendOptions::from_config(&config);
    assert!(options.overwrite_uploads);
    assert_eq!(options.retry_delay.as_secs(), 1);

    let telegram = sysbot_channels::TelegramConfig::from_settings(&config.telegram).unwrap();
    assert!(!format!("{telegram:?}").contains("1:abc"));
    assert!(ChatAllowlist::from_entries(&config.telegram.allowed_chat_ids).is_allowed(ChatId(42)));
}
