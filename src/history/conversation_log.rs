use super::HistoryStore;
use crate::models::conversation::{ ConversationEntry, Role };
use chrono::Utc;
use log::warn;
use std::error::Error;

pub const CONVERSATION_KEY: &str = "amiko_conversation_v2";
pub const HISTORY_PREVIEW_CHARS: usize = 80;

/// Append-only record of one chat, stored as a single JSON array under `key`.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    key: String,
    entries: Vec<ConversationEntry>,
}

impl ConversationLog {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), entries: Vec::new() }
    }

    /// Loads the log stored under `key`. Unreadable data starts an empty log.
    pub async fn restore(store: &dyn HistoryStore, key: &str) -> Self {
        let mut log = Self::new(key);
        let raw = match store.get_item(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                return log;
            }
            Err(e) => {
                warn!("Could not read conversation '{}': {}", key, e);
                return log;
            }
        };

        match serde_json::from_str::<Vec<ConversationEntry>>(&raw) {
            Ok(entries) => log.entries = entries,
            Err(e) => warn!("Discarding unreadable conversation '{}': {}", key, e),
        }
        log
    }

    pub async fn persist(&self, store: &dyn HistoryStore) -> Result<(), Box<dyn Error + Send + Sync>> {
        let json = serde_json::to_string(&self.entries)?;
        store.set_item(&self.key, &json).await
    }

    pub fn append(&mut self, role: Role, text: impl Into<String>) -> &ConversationEntry {
        let timestamp = Utc::now().timestamp_millis();
        self.entries.push(ConversationEntry::new(role, text, timestamp));
        &self.entries[self.entries.len() - 1]
    }

    pub fn clear(&mut self) {
        self.entries = Vec::new();
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One line per entry, newest first.
    pub fn history_lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .rev()
            .map(|entry| {
                let preview: String = entry.text.chars().take(HISTORY_PREVIEW_CHARS).collect();
                format!("{} · {} {}", entry.local_time(), entry.role.marker(), preview)
            })
            .collect()
    }

    pub fn transcript(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("[{}] {}: {}", entry.local_time(), entry.role.label(), entry.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
