//! Telegram channel adapter.
//!
//! Talks to the Telegram Bot API directly over HTTPS: `getUpdates` long
//! polling with offset tracking, `sendMessage`, multipart `sendDocument`,
//! `sendChatAction` and `getFile` downloads.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use sysbot_config::TelegramSettings;
use sysbot_core::channel::{Channel, ChatId, Document, Inbound, InboundKind};
use sysbot_core::error::ChannelError;
use tracing::{debug, info, warn};

/// Extra time on top of the long-poll timeout before the HTTP client gives up.
const HTTP_GRACE_SECS: u64 = 15;

/// Telegram channel configuration.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub bot_token: String,
    pub api_base: String,
    pub poll_timeout_secs: u64,
    pub max_message_chars: usize,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        let defaults = TelegramSettings::default();
        Self {
            bot_token: bot_token.into(),
            api_base: defaults.api_base,
            poll_timeout_secs: defaults.poll_timeout_secs,
            max_message_chars: defaults.max_message_chars,
        }
    }

    /// Build from the `[telegram]` config section. Fails without a token.
    pub fn from_settings(settings: &TelegramSettings) -> Result<Self, ChannelError> {
        let token = settings
            .bot_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ChannelError::NotConfigured(
                    "telegram bot token missing (set BOT_TOKEN or telegram.bot_token)".into(),
                )
            })?;
        Ok(Self {
            bot_token: token.to_string(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            poll_timeout_secs: settings.poll_timeout_secs,
            max_message_chars: settings.max_message_chars,
        })
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("max_message_chars", &self.max_message_chars)
            .finish()
    }
}

// --- Bot API wire types ---

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    message_id: i64,
    chat: TelegramChat,
    #[serde(default)]
    from: Option<TelegramUser>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    document: Option<TelegramDocument>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TelegramUser {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramDocument {
    file_id: String,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TelegramFile {
    #[serde(default)]
    file_path: Option<String>,
}

/// Map an update to an inbound message. Updates without a message are skipped.
fn to_inbound(update: Update) -> Option<Inbound> {
    let message = update.message?;
    let kind = if let Some(doc) = message.document {
        InboundKind::Document(Document {
            file_id: doc.file_id,
            file_name: doc.file_name,
            mime_type: doc.mime_type,
            file_size: doc.file_size,
        })
    } else if let Some(text) = message.text {
        InboundKind::Text(text)
    } else {
        InboundKind::Unsupported
    };
    let (username, first_name) = match message.from {
        Some(user) => (user.username, user.first_name),
        None => (None, None),
    };
    Some(Inbound {
        chat_id: ChatId(message.chat.id),
        message_id: Some(message.message_id),
        username,
        first_name,
        kind,
    })
}

fn unwrap_response<T>(method: &str, response: ApiResponse<T>) -> Result<T, ChannelError> {
    if !response.ok {
        return Err(ChannelError::Api(format!(
            "{method}: {}",
            response.description.unwrap_or_else(|| "request rejected".into())
        )));
    }
    response
        .result
        .ok_or_else(|| ChannelError::Api(format!("{method}: response has no result")))
}

/// Telegram channel adapter.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    /// Next update id to request; 0 until the first batch arrives.
    offset: AtomicI64,
}

impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannel")
            .field("config", &self.config)
            .field("offset", &self.offset.load(Ordering::Relaxed))
            .finish()
    }
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + HTTP_GRACE_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config,
            client,
            offset: AtomicI64::new(0),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.config.api_base, self.config.bot_token)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.config.api_base,
            self.config.bot_token,
            file_path.trim_start_matches('/')
        )
    }

    /// POST a JSON body to a Bot API method and unwrap the `result`.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, ChannelError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::ConnectionLost(format!("{method}: {}", e.without_url())))?;

        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ChannelError::Api(format!("{method}: bad response: {}", e.without_url())))?;
        unwrap_response(method, parsed)
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn poll(&self) -> Result<Vec<Inbound>, ChannelError> {
        let mut body = serde_json::json!({
            "timeout": self.config.poll_timeout_secs,
            "allowed_updates": ["message"],
        });
        let offset = self.offset.load(Ordering::Relaxed);
        if offset > 0 {
            body["offset"] = offset.into();
        }

        let updates: Vec<Update> = self.call("getUpdates", &body).await?;
        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.offset.store(last + 1, Ordering::Relaxed);
        }
        debug!(count = updates.len(), "Polled updates");
        Ok(updates.into_iter().filter_map(to_inbound).collect())
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({ "chat_id": chat_id.0, "text": text });
        if let Some(id) = reply_to {
            body["reply_to_message_id"] = id.into();
        }
        self.call::<serde_json::Value>("sendMessage", &body)
            .await
            .map(|_| ())
            .map_err(|e| ChannelError::DeliveryFailed {
                chat_id: chat_id.to_string(),
                reason: e.to_string(),
            })
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), ChannelError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| ChannelError::DeliveryFailed {
            chat_id: chat_id.to_string(),
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".into());

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", Part::bytes(bytes).file_name(file_name));
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let delivery_failed = |reason: String| ChannelError::DeliveryFailed {
            chat_id: chat_id.to_string(),
            reason,
        };
        let response = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| delivery_failed(e.without_url().to_string()))?;
        let parsed: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| delivery_failed(e.without_url().to_string()))?;
        unwrap_response("sendDocument", parsed)
            .map(|_| ())
            .map_err(|e| delivery_failed(e.to_string()))
    }

    async fn download(&self, document: &Document) -> Result<Vec<u8>, ChannelError> {
        let file: TelegramFile = self
            .call("getFile", &serde_json::json!({ "file_id": document.file_id }))
            .await?;
        let file_path = file
            .file_path
            .ok_or_else(|| ChannelError::DownloadFailed("file is not available for download".into()))?;

        let response = self
            .client
            .get(self.file_url(&file_path))
            .send()
            .await
            .map_err(|e| ChannelError::DownloadFailed(e.without_url().to_string()))?;
        if !response.status().is_success() {
            return Err(ChannelError::DownloadFailed(format!(
                "file server returned {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ChannelError::DownloadFailed(e.without_url().to_string()))?;
        debug!(file_id = %document.file_id, size = bytes.len(), "Downloaded document");
        Ok(bytes.to_vec())
    }

    async fn send_typing(&self, chat_id: ChatId) -> Result<(), ChannelError> {
        self.call::<bool>(
            "sendChatAction",
            &serde_json::json!({ "chat_id": chat_id.0, "action": "typing" }),
        )
        .await
        .map(|_| ())
    }

    fn max_message_chars(&self) -> usize {
        self.config.max_message_chars
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        match self.call::<serde_json::Value>("getMe", &serde_json::json!({})).await {
            Ok(me) => {
                info!(
                    bot = me.get("username").and_then(|v| v.as_str()).unwrap_or("?"),
                    "Telegram bot reachable"
                );
                Ok(true)
            }
            Err(ChannelError::Api(reason)) => {
                warn!(reason = %reason, "Telegram rejected getMe");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
