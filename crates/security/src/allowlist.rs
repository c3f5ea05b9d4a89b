//! Chat allow-list — which chat identifiers may use the bot.
//!
//! The list is fixed at startup and never mutated afterwards.

use std::collections::BTreeSet;
use sysbot_core::channel::ChatId;
use tracing::warn;

/// Result of checking a sender against the allowlist.
#[derive(Debug, Clone, PartialEq)]
pub enum SenderCheckResult {
    /// Sender is allowed
    Allowed,
    /// Sender is denied
    Denied { chat_id: ChatId, reason: String },
}

/// Immutable set of authorized chats.
///
/// Rules:
/// - empty list → deny all (secure by default)
/// - `"*"` entry → allow all
/// - otherwise the chat ID must be listed
#[derive(Debug, Clone, Default)]
pub struct ChatAllowlist {
    ids: BTreeSet<ChatId>,
    allow_all: bool,
}

impl ChatAllowlist {
    /// Build from configured entries. Entries that are neither `"*"` nor a
    /// numeric chat ID are logged and skipped.
    pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> Self {
        let mut list = Self::default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry == "*" {
                list.allow_all = true;
                continue;
            }
            match entry.parse::<ChatId>() {
                Ok(id) => {
                    list.ids.insert(id);
                }
                Err(_) => warn!(entry = %entry, "Ignoring invalid chat ID in allowlist"),
            }
        }
        list
    }

    pub fn check(&self, chat_id: ChatId) -> SenderCheckResult {
        if self.allow_all || self.ids.contains(&chat_id) {
            return SenderCheckResult::Allowed;
        }

        let reason = if self.ids.is_empty() {
            "No chats configured (deny by default)".to_string()
        } else {
            format!(
                "Chat '{}' not in allowlist ({} chats configured)",
                chat_id,
                self.ids.len()
            )
        };
        SenderCheckResult::Denied { chat_id, reason }
    }

    pub fn is_allowed(&self, chat_id: ChatId) -> bool {
        self.check(chat_id) == SenderCheckResult::Allowed
    }

    /// Explicitly listed chats, in ascending order. Excludes the wildcard.
    pub fn members(&self) -> impl Iterator<Item = ChatId> + '_ {
        self.ids.iter().copied()
    }

    pub fn is_wildcard(&self) -> bool {
        self.allow_all
    }

    /// True when nobody can use the bot.
    pub fn denies_everyone(&self) -> bool {
        !self.allow_all && self.ids.is_empty()
    }
}
