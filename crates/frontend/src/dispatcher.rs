//! The dispatch loop: one inbound message at a time, in receipt order.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use sysbot_agent::{AgentRuntime, SessionStore};
use sysbot_config::AppConfig;
use sysbot_core::channel::{Channel, ChatId, Document, Inbound, InboundKind};
use sysbot_core::error::Error;
use sysbot_security::{ChatAllowlist, SenderCheckResult};
use tracing::{debug, error, info, warn};

use crate::commands::{self, Command};
use crate::reply::{self, LONG_REPLY_CAPTION, PROCESSING_TEXT, UNAUTHORIZED_TEXT};
use crate::uploads;

/// Front end behaviour that comes from configuration.
#[derive(Debug, Clone)]
pub struct FrontendOptions {
    /// Pause before polling again after a failed poll.
    pub retry_delay: Duration,
    /// Replace existing files on upload instead of picking a new name.
    pub overwrite_uploads: bool,
    /// Tell allow-listed chats when the bot starts.
    pub notify_on_startup: bool,
    /// Where oversized replies are staged before being sent as a document.
    pub scratch_dir: PathBuf,
}

impl Default for FrontendOptions {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(5),
            overwrite_uploads: false,
            notify_on_startup: true,
            scratch_dir: std::env::temp_dir(),
        }
    }
}

impl FrontendOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            retry_delay: Duration::from_secs(config.telegram.retry_delay_secs),
            overwrite_uploads: config.uploads.overwrite,
            notify_on_startup: config.telegram.notify_on_startup,
            ..Self::default()
        }
    }
}

/// Routes inbound messages to commands, uploads or the agent runtime.
pub struct Dispatcher {
    channel: Arc<dyn Channel>,
    runtime: Arc<dyn AgentRuntime>,
    sessions: Arc<SessionStore>,
    allowlist: ChatAllowlist,
    options: FrontendOptions,
}

impl Dispatcher {
    pub fn new(
        channel: Arc<dyn Channel>,
        runtime: Arc<dyn AgentRuntime>,
        sessions: Arc<SessionStore>,
        allowlist: ChatAllowlist,
    ) -> Self {
        Self {
            channel,
            runtime,
            sessions,
            allowlist,
            options: FrontendOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FrontendOptions) -> Self {
        self.options = options;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Pre-create sessions for listed chats and announce that the bot is up.
    pub async fn startup(&self) {
        if self.allowlist.denies_everyone() {
            warn!("Allow-list is empty: every chat will be rejected");
        }
        for chat_id in self.allowlist.members() {
            let key = sysbot_agent::SessionKey::for_chat(chat_id);
            self.sessions.create(key.user_id, key.session_id).await;
        }

        if !self.options.notify_on_startup {
            return;
        }
        for chat_id in self.allowlist.members() {
            if let Err(e) = self.channel.send_text(chat_id, commands::ONLINE_TEXT, None).await {
                warn!(chat_id = %chat_id, error = %e, "Failed to send online notice");
            }
        }
    }

    /// Poll and handle messages until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(channel = %self.channel.name(), "Dispatch loop started");

        loop {
            let batch = tokio::select! {
                _ = &mut shutdown => break,
                batch = self.channel.poll() => batch,
            };

            match batch {
                Ok(messages) => {
                    for inbound in messages {
                        self.handle(inbound).await;
                    }
                }
                Err(e) => {
                    if e.is_transport() {
                        warn!(error = %e, "Connection error, retrying in {:?}", self.options.retry_delay);
                    } else {
                        error!(error = %e, "Polling failed, retrying in {:?}", self.options.retry_delay);
                    }
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(self.options.retry_delay) => {}
                    }
                }
            }
        }
        info!("Dispatch loop stopped");
    }

    /// Handle one inbound message. Never fails: errors are reported to the chat.
    pub async fn handle(&self, inbound: Inbound) {
        let chat_id = inbound.chat_id;

        if let SenderCheckResult::Denied { reason, .. } = self.allowlist.check(chat_id) {
            info!(chat_id = %chat_id, reason = %reason, "Rejected message from unauthorized chat");
            self.reply(&inbound, UNAUTHORIZED_TEXT).await;
            return;
        }

        match &inbound.kind {
            InboundKind::Text(text) => match Command::parse(text) {
                Some(command) => self.handle_command(&inbound, command).await,
                None => {
                    if let Err(e) = self.handle_text(&inbound, text).await {
                        warn!(chat_id = %chat_id, error = %e, "Failed to handle message");
                        self.reply(&inbound, &reply::error_reply(&e)).await;
                    }
                }
            },
            InboundKind::Document(document) => self.handle_document(&inbound, document).await,
            InboundKind::Unsupported => {
                debug!(chat_id = %chat_id, "Ignoring unsupported message type");
            }
        }
    }

    async fn handle_command(&self, inbound: &Inbound, command: Command) {
        let chat_id = inbound.chat_id;
        debug!(chat_id = %chat_id, command = ?command, "Handling command");

        match command {
            Command::Start => {
                self.reply(inbound, commands::WELCOME_TEXT).await;
                let notice = commands::new_user_notice(inbound);
                for admin in commands::notice_recipients(self.allowlist.members(), chat_id) {
                    if let Err(e) = self.channel.send_text(admin, &notice, None).await {
                        debug!(chat_id = %admin, error = %e, "Failed to notify admin");
                    }
                }
            }
            Command::Help => self.reply(inbound, commands::HELP_TEXT).await,
            Command::Clear => {
                self.sessions.clear(chat_id).await;
                self.reply(inbound, commands::CLEARED_TEXT).await;
            }
            Command::Info => {
                let cwd = match self.sessions.get(chat_id).await {
                    Some(session) => session.lock().await.context.cwd().await,
                    None => self.sessions.workspace_root().to_path_buf(),
                };
                self.reply(inbound, &commands::info_text(&cwd)).await;
            }
        }
    }

    async fn handle_text(&self, inbound: &Inbound, text: &str) -> Result<(), Error> {
        let chat_id = inbound.chat_id;
        if let Err(e) = self.channel.send_typing(chat_id).await {
            debug!(chat_id = %chat_id, error = %e, "Typing indicator failed");
        }
        self.channel
            .send_text(chat_id, PROCESSING_TEXT, inbound.message_id)
            .await?;

        let session = self.sessions.get_or_create(chat_id).await;
        let events = {
            let mut session = session.lock().await;
            self.runtime.run(&mut session, text).await?
        };
        info!(chat_id = %chat_id, events = events.len(), "Agent run finished");

        self.deliver(chat_id, &reply::collect_reply(&events)).await
    }

    /// Send `text` as a message, or as a document when it exceeds the
    /// channel's ceiling. The staged file is removed whether or not the
    /// upload succeeded.
    async fn deliver(&self, chat_id: ChatId, text: &str) -> Result<(), Error> {
        if text.chars().count() <= self.channel.max_message_chars() {
            self.channel.send_text(chat_id, text, None).await?;
            return Ok(());
        }

        let path = self.options.scratch_dir.join(format!(
            "response_{chat_id}_{}.txt",
            chrono::Utc::now().timestamp()
        ));
        tokio::fs::write(&path, text).await?;
        debug!(chat_id = %chat_id, path = %path.display(), "Reply too long, sending as document");

        let sent = self
            .channel
            .send_document(chat_id, &path, Some(LONG_REPLY_CAPTION))
            .await;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove staged reply");
        }
        sent?;
        Ok(())
    }

    async fn handle_document(&self, inbound: &Inbound, document: &Document) {
        self.reply(inbound, "📥 Uploading file...").await;
        match self.save_document(inbound.chat_id, document).await {
            Ok(path) => {
                info!(chat_id = %inbound.chat_id, path = %path.display(), "Saved uploaded document");
                let text = format!(
                    "✅ File uploaded successfully!\n📁 Saved to: {}",
                    path.display()
                );
                self.reply(inbound, &text).await;
            }
            Err(e) => {
                warn!(chat_id = %inbound.chat_id, error = %e, "Upload failed");
                self.reply(inbound, &format!("❌ Failed to upload file: {e}")).await;
            }
        }
    }

    async fn save_document(&self, chat_id: ChatId, document: &Document) -> Result<PathBuf, Error> {
        let bytes = self.channel.download(document).await?;
        let dir = {
            let session = self.sessions.get_or_create(chat_id).await;
            let session = session.lock().await;
            session.context.cwd().await
        };
        let name = uploads::sanitize_file_name(document.file_name.as_deref());
        Ok(uploads::save_upload(&dir, &name, &bytes, self.options.overwrite_uploads).await?)
    }

    /// Best-effort reply to `inbound`; delivery failures are only logged.
    async fn reply(&self, inbound: &Inbound, text: &str) {
        if let Err(e) = self
            .channel
            .send_text(inbound.chat_id, text, inbound.message_id)
            .await
        {
            warn!(chat_id = %inbound.chat_id, error = %e, "Failed to send reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use sysbot_agent::Session;
    use sysbot_core::error::{ChannelError, ProviderError};
    use sysbot_core::event::{AgentEvent, EventPart};

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Text(ChatId, String),
        Document {
            chat_id: ChatId,
            path: PathBuf,
            content: String,
            caption: Option<String>,
        },
    }

    #[derive(Default)]
    struct MockChannel {
        batches: Mutex<VecDeque<Result<Vec<Inbound>, ChannelError>>>,
        sent: Mutex<Vec<Sent>>,
        files: Mutex<Vec<(String, Vec<u8>)>>,
        fail_documents: bool,
        polls: AtomicUsize,
    }

    impl MockChannel {
        fn texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter_map(|s| match s {
                    Sent::Text(_, text) => Some(text.clone()),
                    _ => None,
                })
                .collect()
        }

        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Channel for MockChannel {
        fn name(&self) -> &str {
            "mock"
        }

        async fn poll(&self) -> Result<Vec<Inbound>, ChannelError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let next = self.batches.lock().unwrap().pop_front();
            match next {
                Some(batch) => batch,
                None => std::future::pending().await,
            }
        }

        async fn send_text(
            &self,
            chat_id: ChatId,
            text: &str,
            _reply_to: Option<i64>,
        ) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(Sent::Text(chat_id, text.to_string()));
            Ok(())
        }

        async fn send_document(
            &self,
            chat_id: ChatId,
            path: &Path,
            caption: Option<&str>,
        ) -> Result<(), ChannelError> {
            let content = std::fs::read_to_string(path).unwrap_or_default();
            self.sent.lock().unwrap().push(Sent::Document {
                chat_id,
                path: path.to_path_buf(),
                content,
                caption: caption.map(String::from),
            });
            if self.fail_documents {
                return Err(ChannelError::DeliveryFailed {
                    chat_id: chat_id.to_string(),
                    reason: "too big".into(),
                });
            }
            Ok(())
        }

        async fn download(&self, document: &Document) -> Result<Vec<u8>, ChannelError> {
            self.files
                .lock()
                .unwrap()
                .iter()
                .find(|(id, _)| *id == document.file_id)
                .map(|(_, bytes)| bytes.clone())
                .ok_or_else(|| ChannelError::DownloadFailed("no such file".into()))
        }
    }

    /// Replies with canned events and records every prompt.
    #[derive(Default)]
    struct MockRuntime {
        reply: String,
        fail: bool,
        prompts: Mutex<Vec<String>>,
    }

    impl MockRuntime {
        fn replying(reply: impl Into<String>) -> Self {
            Self {
                reply: reply.into(),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AgentRuntime for MockRuntime {
        async fn run(&self, session: &mut Session, text: &str) -> Result<Vec<AgentEvent>, Error> {
            self.prompts.lock().unwrap().push(text.to_string());
            if self.fail {
                return Err(ProviderError::Network("connection reset".into()).into());
            }
            session.conversation.push(sysbot_core::Message::user(text));
            Ok(vec![
                AgentEvent::intermediate(
                    "mock",
                    vec![EventPart::FunctionCall {
                        id: "1".into(),
                        name: "get_cwd".into(),
                        args: serde_json::json!({}),
                    }],
                ),
                AgentEvent::final_text("mock", self.reply.clone()),
            ])
        }
    }

    struct Fixture {
        channel: Arc<MockChannel>,
        runtime: Arc<MockRuntime>,
        dispatcher: Dispatcher,
        dir: tempfile::TempDir,
    }

    fn fixture(channel: MockChannel, runtime: MockRuntime, allow: &[&str]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let channel = Arc::new(channel);
        let runtime = Arc::new(runtime);
        let dispatcher = Dispatcher::new(
            channel.clone(),
            runtime.clone(),
            Arc::new(SessionStore::new(dir.path())),
            ChatAllowlist::from_entries(allow),
        )
        .with_options(FrontendOptions {
            retry_delay: Duration::from_millis(10),
            scratch_dir: dir.path().to_path_buf(),
            ..FrontendOptions::default()
        });
        Fixture {
            channel,
            runtime,
            dispatcher,
            dir,
        }
    }

    #[tokio::test]
    async fn unauthorized_chat_is_rejected_without_running_agent() {
        let f = fixture(MockChannel::default(), MockRuntime::replying("hi"), &["1"]);
        f.dispatcher.handle(Inbound::text(ChatId(2), "delete everything")).await;

        assert_eq!(f.channel.texts(), vec![UNAUTHORIZED_TEXT.to_string()]);
        assert_eq!(f.runtime.calls(), 0);
        assert!(f.dispatcher.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn empty_allowlist_rejects_everyone() {
        let f = fixture(MockChannel::default(), MockRuntime::replying("hi"), &[]);
        f.dispatcher.handle(Inbound::text(ChatId(1), "/help")).await;
        assert_eq!(f.channel.texts(), vec![UNAUTHORIZED_TEXT.to_string()]);
    }

    #[tokio::test]
    async fn free_text_runs_agent_and_replies() {
        let f = fixture(MockChannel::default(), MockRuntime::replying("All done."), &["1"]);
        f.dispatcher.handle(Inbound::text(ChatId(1), "where am I?")).await;

        let texts = f.channel.texts();
        assert_eq!(texts[0], PROCESSING_TEXT);
        assert_eq!(texts[1], "All done.\n\n🔧 Tool call: get_cwd\n{}");
        assert_eq!(f.runtime.prompts.lock().unwrap()[0], "where am I?");
        assert_eq!(f.dispatcher.sessions().len().await, 1);
    }

    #[tokio::test]
    async fn runtime_failure_becomes_error_reply() {
        let runtime = MockRuntime {
            fail: true,
            ..MockRuntime::default()
        };
        let f = fixture(MockChannel::default(), runtime, &["*"]);
        f.dispatcher.handle(Inbound::text(ChatId(5), "hello")).await;

        let last = f.channel.texts().pop().unwrap();
        assert!(last.starts_with("❌ Error: "));
        assert!(last.contains("connection reset"));
        assert!(last.ends_with("Please try again or rephrase your request."));
    }

    #[tokio::test]
    async fn long_reply_is_sent_as_document_and_cleaned_up() {
        let long = "x".repeat(5000);
        let f = fixture(MockChannel::default(), MockRuntime::replying(long.clone()), &["1"]);
        f.dispatcher.handle(Inbound::text(ChatId(1), "dump")).await;

        let doc = f
            .channel
            .sent()
            .into_iter()
            .find_map(|s| match s {
                Sent::Document { path, content, caption, chat_id } => Some((path, content, caption, chat_id)),
                _ => None,
            })
            .expect("document sent");
        let (path, content, caption, chat_id) = doc;
        assert_eq!(chat_id, ChatId(1));
        assert!(content.starts_with(&long));
        assert_eq!(caption.as_deref(), Some(LONG_REPLY_CAPTION));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("response_1_") && name.ends_with(".txt"));
        assert!(!path.exists());
        assert!(!f.dir.path().read_dir().unwrap().any(|e| {
            e.unwrap().file_name().to_string_lossy().starts_with("response_")
        }));
    }

    #[tokio::test]
    async fn staged_file_removed_even_when_upload_fails() {
        let channel = MockChannel {
            fail_documents: true,
            ..MockChannel::default()
        };
        let f = fixture(channel, MockRuntime::replying("y".repeat(5000)), &["1"]);
        f.dispatcher.handle(Inbound::text(ChatId(1), "dump")).await;

        let path = f
            .channel
            .sent()
            .into_iter()
            .find_map(|s| match s {
                Sent::Document { path, .. } => Some(path),
                _ => None,
            })
            .unwrap();
        assert!(!path.exists());
        assert!(f.channel.texts().last().unwrap().starts_with("❌ Error: "));
    }

    #[tokio::test]
    async fn commands_do_not_reach_agent() {
        let f = fixture(MockChannel::default(), MockRuntime::replying("x"), &["1"]);
        f.dispatcher.handle(Inbound::text(ChatId(1), "/help@sysbot")).await;
        f.dispatcher.handle(Inbound::text(ChatId(1), "/info")).await;

        let texts = f.channel.texts();
        assert_eq!(texts[0], commands::HELP_TEXT);
        assert!(texts[1].contains(&f.dir.path().display().to_string()));
        assert_eq!(f.runtime.calls(), 0);
    }

    #[tokio::test]
    async fn clear_evicts_session() {
        let f = fixture(MockChannel::default(), MockRuntime::replying("ok"), &["1"]);
        f.dispatcher.handle(Inbound::text(ChatId(1), "hello")).await;
        assert_eq!(f.dispatcher.sessions().len().await, 1);

        f.dispatcher.handle(Inbound::text(ChatId(1), "/clear")).await;
        assert!(f.dispatcher.sessions().is_empty().await);
        assert_eq!(f.channel.texts().last().unwrap(), commands::CLEARED_TEXT);

        f.dispatcher.handle(Inbound::text(ChatId(1), "again")).await;
        let session = f.dispatcher.sessions().get(ChatId(1)).await.unwrap();
        assert_eq!(session.lock().await.conversation.turns(), 1);
    }

    #[tokio::test]
    async fn start_from_other_chat_notifies_admins() {
        let f = fixture(MockChannel::default(), MockRuntime::replying("x"), &["*", "1"]);
        let mut inbound = Inbound::text(ChatId(7), "/start");
        inbound.username = Some("newcomer".into());
        f.dispatcher.handle(inbound).await;

        let sent = f.channel.sent();
        assert_eq!(sent[0], Sent::Text(ChatId(7), commands::WELCOME_TEXT.into()));
        match &sent[1] {
            Sent::Text(chat, text) => {
                assert_eq!(*chat, ChatId(1));
                assert!(text.contains("@newcomer"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn start_from_admin_sends_no_notice() {
        let f = fixture(MockChannel::default(), MockRuntime::replying("x"), &["1"]);
        f.dispatcher.handle(Inbound::text(ChatId(1), "/start")).await;
        assert_eq!(f.channel.sent().len(), 1);
    }

    #[tokio::test]
    async fn document_is_saved_in_session_cwd() {
        let channel = MockChannel {
            files: Mutex::new(vec![("f1".into(), b"payload".to_vec())]),
            ..MockChannel::default()
        };
        let f = fixture(channel, MockRuntime::default(), &["1"]);
        let sub = f.dir.path().join("inbox");
        std::fs::create_dir(&sub).unwrap();
        let session = f.dispatcher.sessions().get_or_create(ChatId(1)).await;
        session.lock().await.context.set_cwd(&sub).await;

        let upload = |name: &str| Inbound {
            chat_id: ChatId(1),
            message_id: Some(3),
            username: None,
            first_name: None,
            kind: InboundKind::Document(Document {
                file_id: "f1".into(),
                file_name: Some(name.into()),
                mime_type: None,
                file_size: Some(7),
            }),
        };
        f.dispatcher.handle(upload("../escape.txt")).await;
        f.dispatcher.handle(upload("escape.txt")).await;

        assert_eq!(std::fs::read(sub.join("escape.txt")).unwrap(), b"payload");
        assert!(sub.join("escape (1).txt").exists());
        assert!(!f.dir.path().join("escape.txt").exists());
        let texts = f.channel.texts();
        assert_eq!(texts[0], "📥 Uploading file...");
        assert!(texts[1].starts_with("✅ File uploaded successfully!"));
    }

    #[tokio::test]
    async fn failed_download_is_reported() {
        let f = fixture(MockChannel::default(), MockRuntime::default(), &["1"]);
        let inbound = Inbound {
            kind: InboundKind::Document(Document {
                file_id: "missing".into(),
                file_name: Some("a.txt".into()),
                mime_type: None,
                file_size: None,
            }),
            ..Inbound::text(ChatId(1), "")
        };
        f.dispatcher.handle(inbound).await;
        assert!(f.channel.texts()[1].starts_with("❌ Failed to upload file:"));
    }

    #[tokio::test]
    async fn startup_announces_and_precreates_sessions() {
        let f = fixture(MockChannel::default(), MockRuntime::default(), &["1", "2"]);
        f.dispatcher.startup().await;
        assert_eq!(f.dispatcher.sessions().len().await, 2);
        assert_eq!(
            f.channel.sent(),
            vec![
                Sent::Text(ChatId(1), commands::ONLINE_TEXT.into()),
                Sent::Text(ChatId(2), commands::ONLINE_TEXT.into()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_survives_poll_errors() {
        let channel = MockChannel::default();
        {
            let mut batches = channel.batches.lock().unwrap();
            batches.push_back(Err(ChannelError::ConnectionLost("reset".into())));
            batches.push_back(Ok(vec![Inbound::text(ChatId(1), "hello")]));
        }
        let f = fixture(channel, MockRuntime::replying("hi"), &["1"]);

        let shutdown = async {
            while f.runtime.calls() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        f.dispatcher.run(shutdown).await;

        assert_eq!(f.runtime.calls(), 1);
        assert!(f.channel.polls.load(Ordering::SeqCst) >= 2);
    }
}
