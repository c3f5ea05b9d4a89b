//! Session store — per-chat conversation history and working directory.
//!
//! Sessions live in memory for the lifetime of the process. Each one is
//! behind its own mutex so a long agent run on one chat never blocks lookups
//! for another.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sysbot_core::channel::ChatId;
use sysbot_core::context::ToolContext;
use sysbot_core::message::Conversation;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Identifies a session: one per chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }

    /// The key used for a chat: user `<chat_id>`, session `session_<chat_id>`.
    pub fn for_chat(chat_id: ChatId) -> Self {
        Self::new(chat_id.to_string(), format!("session_{chat_id}"))
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user_id, self.session_id)
    }
}

/// Conversation state for one chat.
#[derive(Debug)]
pub struct Session {
    pub key: SessionKey,
    pub conversation: Conversation,
    pub context: ToolContext,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Session {
    pub fn new(key: SessionKey, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            conversation: Conversation::with_id(key.session_id.clone()),
            context: ToolContext::new(workspace_root),
            key,
            created_at: chrono::Utc::now(),
        }
    }
}

pub type SharedSession = Arc<Mutex<Session>>;

/// In-memory map from session key to session.
#[derive(Debug)]
pub struct SessionStore {
    workspace_root: PathBuf,
    sessions: RwLock<HashMap<SessionKey, SharedSession>>,
}

impl SessionStore {
    /// New sessions start with `workspace_root` as their working directory.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Register a session. Returns the existing one if already present.
    pub async fn create(
        &self,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> SharedSession {
        let key = SessionKey::new(user_id, session_id);
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(key)
            .or_insert_with_key(|key| {
                debug!(session = %key, "Creating session");
                Arc::new(Mutex::new(Session::new(key.clone(), &self.workspace_root)))
            })
            .clone()
    }

    pub async fn get(&self, chat_id: ChatId) -> Option<SharedSession> {
        self.sessions
            .read()
            .await
            .get(&SessionKey::for_chat(chat_id))
            .cloned()
    }

    pub async fn get_or_create(&self, chat_id: ChatId) -> SharedSession {
        if let Some(session) = self.get(chat_id).await {
            return session;
        }
        let key = SessionKey::for_chat(chat_id);
        self.create(key.user_id, key.session_id).await
    }

    /// Drop a chat's session. Returns whether one existed.
    pub async fn clear(&self, chat_id: ChatId) -> bool {
        let removed = self
            .sessions
            .write()
            .await
            .remove(&SessionKey::for_chat(chat_id))
            .is_some();
        if removed {
            debug!(chat_id = %chat_id, "Cleared session");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
