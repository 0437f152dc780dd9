//! Chat persistence and search
//!
//! All chats, the active chat id and the UI language are kept in a single
//! JSON document under the data directory. Every mutation is followed by a
//! save from the caller; reloading reproduces the saved state exactly.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{Chat, ChatError, ChatMessage};
use std::fs;
use std::path::{Path, PathBuf};

pub const CHATS_FILE: &str = "chats.json";

const MAX_SEARCH_RESULTS: usize = 10;

/// What goes to disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    #[serde(default)]
    pub chats: Vec<Chat>,
    #[serde(default)]
    pub active_chat_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

pub struct ChatStore {
    path: PathBuf,
    state: StoreState,
}

impl ChatStore {
    /// Load from `dir`. A missing or unreadable file starts empty.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CHATS_FILE);
        let state = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<StoreState>(&content) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}; starting empty", path.display(), e);
                    StoreState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}; starting empty", path.display(), e);
                StoreState::default()
            }
        };
        let mut store = Self { path, state };
        // A dangling active id would point the UI at nothing
        if let Some(id) = store.state.active_chat_id.clone() {
            if store.get(&id).is_none() {
                store.state.active_chat_id = None;
            }
        }
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    /// Write through a temp file so a crash never leaves half a document.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    /// Chats, most recently updated first
    pub fn list(&self) -> Vec<&Chat> {
        let mut chats: Vec<&Chat> = self.state.chats.iter().collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        chats
    }

    pub fn get(&self, id: &str) -> Option<&Chat> {
        self.state.chats.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Chat> {
        self.state.chats.iter_mut().find(|c| c.id == id)
    }

    /// Insert a chat and return its id
    pub fn create(&mut self, chat: Chat) -> String {
        let id = chat.id.clone();
        self.state.chats.push(chat);
        id
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.state.chats.len();
        self.state.chats.retain(|c| c.id != id);
        if self.state.active_chat_id.as_deref() == Some(id) {
            self.state.active_chat_id = None;
        }
        self.state.chats.len() != before
    }

    pub fn active_id(&self) -> Option<&str> {
        self.state.active_chat_id.as_deref()
    }

    pub fn active(&self) -> Option<&Chat> {
        self.active_id().and_then(|id| self.get(id))
    }

    pub fn set_active(&mut self, id: Option<&str>) -> Result<(), ChatError> {
        if let Some(id) = id {
            if self.get(id).is_none() {
                return Err(ChatError::ChatNotFound(id.to_string()));
            }
        }
        self.state.active_chat_id = id.map(str::to_string);
        Ok(())
    }

    pub fn language(&self) -> Option<&str> {
        self.state.language.as_deref()
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.state.language = Some(language.into());
    }

    pub fn append(&mut self, chat_id: &str, msg: ChatMessage) -> Result<(), ChatError> {
        let chat = self
            .get_mut(chat_id)
            .ok_or_else(|| ChatError::ChatNotFound(chat_id.to_string()))?;
        chat.push(msg);
        Ok(())
    }

    /// Case-insensitive keyword search across every message
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        let query_lower = query.trim().to_lowercase();
        if query_lower.is_empty() {
            return Vec::new();
        }

        let mut results = Vec::new();
        for chat in self.list() {
            for msg in &chat.messages {
                if msg.text.to_lowercase().contains(&query_lower) {
                    results.push(SearchResult {
                        chat_id: chat.id.clone(),
                        chat_title: chat.title.clone(),
                        message_id: msg.id.clone(),
                        snippet: extract_snippet(&msg.text, &query_lower),
                        date: chat.updated_at,
                    });
                    if results.len() == MAX_SEARCH_RESULTS {
                        return results;
                    }
                }
            }
        }
        results
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chat_id: String,
    pub chat_title: String,
    pub message_id: String,
    pub snippet: String,
    pub date: DateTime<Utc>,
}

/// About 30 chars either side of the first hit, working in chars so
/// multi-byte text never splits mid code point.
fn extract_snippet(content: &str, query_lower: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let lower: Vec<char> = content.to_lowercase().chars().collect();
    let needle: Vec<char> = query_lower.chars().collect();

    // Lowercasing can change the char count; fall back to a prefix then
    let pos = if lower.len() == chars.len() {
        lower.windows(needle.len()).position(|w| w == needle.as_slice())
    } else {
        None
    };

    match pos {
        Some(pos) => {
            let start = pos.saturating_sub(30);
            let end = (pos + needle.len() + 30).min(chars.len());
            let mut snippet: String = chars[start..end].iter().collect();
            if start > 0 {
                snippet = format!("...{}", snippet);
            }
            if end < chars.len() {
                snippet.push_str("...");
            }
            snippet
        }
        None => chars.iter().take(60).collect(),
    }
}
