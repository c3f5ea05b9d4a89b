//! Configuration loading, validation, and management for SysBot.
//!
//! Loads configuration from `~/.sysbot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.sysbot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Provider label used in logs
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub agent: AgentSettings,

    #[serde(default)]
    pub telegram: TelegramSettings,

    #[serde(default)]
    pub tools: ToolSettings,

    #[serde(default)]
    pub uploads: UploadSettings,
}

fn default_api_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".into()
}
fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_true() -> bool {
    true
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("agent", &self.agent)
            .field("telegram", &self.telegram)
            .field("tools", &self.tools)
            .field("uploads", &self.uploads)
            .finish()
    }
}

/// Which agent descriptor to run and how far it may go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Built-in profile: "system" or "file_ops"
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Maximum model round-trips per user message
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Replace the profile's instruction text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction_override: Option<String>,
}

fn default_profile() -> String {
    "system".into()
}
fn default_max_iterations() -> u32 {
    25
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            max_iterations: default_max_iterations(),
            instruction_override: None,
        }
    }
}

/// Telegram transport settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramSettings {
    /// Bot token from @BotFather
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Chat IDs allowed to talk to the bot. Empty = deny all, ["*"] = allow all.
    #[serde(default)]
    pub allowed_chat_ids: Vec<String>,

    /// Long-poll timeout passed to getUpdates
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Pause before polling again after a transport error
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Replies longer than this are sent as a document
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    /// Tell allow-listed chats when the bot comes online
    #[serde(default = "default_true")]
    pub notify_on_startup: bool,
}

fn default_poll_timeout() -> u64 {
    60
}
fn default_retry_delay() -> u64 {
    5
}
fn default_max_message_chars() -> usize {
    4096
}
fn default_telegram_api_base() -> String {
    "https://api.telegram.org".into()
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            allowed_chat_ids: vec![],
            poll_timeout_secs: default_poll_timeout(),
            retry_delay_secs: default_retry_delay(),
            max_message_chars: default_max_message_chars(),
            api_base: default_telegram_api_base(),
            notify_on_startup: true,
        }
    }
}

impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &redact(&self.bot_token))
            .field("allowed_chat_ids", &self.allowed_chat_ids)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("retry_delay_secs", &self.retry_delay_secs)
            .field("max_message_chars", &self.max_message_chars)
            .field("api_base", &self.api_base)
            .field("notify_on_startup", &self.notify_on_startup)
            .finish()
    }
}

/// Settings shared by the tool library.
#[derive(Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Starting working directory for every session (default: process cwd)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_dir: Option<PathBuf>,

    /// Default timeout for execute_command
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Passphrase used by encrypt_files/decrypt_files when none is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_passphrase: Option<String>,
}

fn default_command_timeout() -> u64 {
    60
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            workspace_dir: None,
            command_timeout_secs: default_command_timeout(),
            encryption_passphrase: None,
        }
    }
}

impl std::fmt::Debug for ToolSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSettings")
            .field("workspace_dir", &self.workspace_dir)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .field("encryption_passphrase", &redact(&self.encryption_passphrase))
            .finish()
    }
}

/// Document upload handling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Replace an existing file of the same name instead of picking a new name
    #[serde(default)]
    pub overwrite: bool,
}

impl AppConfig {
    /// Load configuration from the default path (~/.sysbot/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in production.
    ///
    /// - `BOT_TOKEN` / `SYSBOT_BOT_TOKEN`
    /// - `AUTHORIZED_CHAT_IDS` (comma separated)
    /// - `SYSBOT_API_KEY`, then `GEMINI_API_KEY`, `GOOGLE_API_KEY`, `OPENAI_API_KEY`
    /// - `SYSBOT_API_URL`, `SYSBOT_MODEL`, `SYSBOT_PROFILE`
    /// - `SYSBOT_ENCRYPTION_PASSPHRASE`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("SYSBOT_BOT_TOKEN").or_else(|| non_empty("BOT_TOKEN")) {
            self.telegram.bot_token = Some(token);
        }

        if let Some(ids) = non_empty("AUTHORIZED_CHAT_IDS") {
            self.telegram.allowed_chat_ids = ids
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(key) = ["SYSBOT_API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY", "OPENAI_API_KEY"]
            .into_iter()
            .find_map(|k| non_empty(k))
        {
            self.api_key = Some(key);
        }

        if let Some(url) = non_empty("SYSBOT_API_URL") {
            self.api_url = url;
        }
        if let Some(model) = non_empty("SYSBOT_MODEL") {
            self.model = model;
        }
        if let Some(profile) = non_empty("SYSBOT_PROFILE") {
            self.agent.profile = profile;
        }
        if let Some(pass) = non_empty("SYSBOT_ENCRYPTION_PASSPHRASE") {
            self.tools.encryption_passphrase = Some(pass);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".sysbot")
    }

    /// The directory new sessions start in.
    pub fn workspace_dir(&self) -> PathBuf {
        self.tools
            .workspace_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.telegram.max_message_chars == 0 {
            return Err(ConfigError::ValidationError(
                "telegram.max_message_chars must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            agent: AgentSettings::default(),
            telegram: TelegramSettings::default(),
            tools: ToolSettings::default(),
            uploads: UploadSettings::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
