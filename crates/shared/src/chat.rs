//! Chat records persisted by the store and sent through the request builder.
//!
//! Everything here is a plain serializable record. The only invariants are
//! unique ids and append-only message ordering within a chat.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Maximum number of characters kept from the first prompt for a chat title
pub const TITLE_MAX_CHARS: usize = 40;

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// A file attached to a prompt (or an image produced by the model).
///
/// `data` is raw base64 without the `data:<mime>;base64,` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub data: String,
    pub mime_type: String,
    pub name: String,
}

impl Attachment {
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            data: STANDARD.encode(bytes),
            mime_type: mime_type.into(),
            name: name.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.data.as_bytes())
    }

    /// Decoded size in bytes (approximate when padding is malformed)
    pub fn size_bytes(&self) -> usize {
        STANDARD
            .decode(self.data.as_bytes())
            .map(|b| b.len())
            .unwrap_or(self.data.len() * 3 / 4)
    }
}

/// Framing modifier applied to the system instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CognitiveState {
    #[default]
    Focused,
    Creative,
    Critical,
    Synthetic,
}

impl CognitiveState {
    pub const ALL: [CognitiveState; 4] = [
        CognitiveState::Focused,
        CognitiveState::Creative,
        CognitiveState::Critical,
        CognitiveState::Synthetic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CognitiveState::Focused => "focused",
            CognitiveState::Creative => "creative",
            CognitiveState::Critical => "critical",
            CognitiveState::Synthetic => "synthetic",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            CognitiveState::Focused => "🎯",
            CognitiveState::Creative => "✨",
            CognitiveState::Critical => "🧐",
            CognitiveState::Synthetic => "🔄",
        }
    }
}

impl fmt::Display for CognitiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CognitiveState {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "focused" => Ok(CognitiveState::Focused),
            "creative" => Ok(CognitiveState::Creative),
            "critical" => Ok(CognitiveState::Critical),
            "synthetic" => Ok(CognitiveState::Synthetic),
            other => Err(ChatError::UnknownCognitiveState(other.to_string())),
        }
    }
}

/// Links an analysis reply back to the message it examined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisLink {
    pub source_message_id: String,
    pub lens: CognitiveState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisLink>,
    /// Set on inline error replies so they never go back upstream as history
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>, attachment: Option<Attachment>) -> Self {
        Self {
            id: new_id(),
            text: text.into(),
            sender: Sender::User,
            attachment,
            analysis: None,
            is_error: false,
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            text: text.into(),
            sender: Sender::Ai,
            attachment: None,
            analysis: None,
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::ai(text)
        }
    }

    pub fn with_attachment(mut self, attachment: Option<Attachment>) -> Self {
        self.attachment = attachment;
        self
    }

    pub fn with_analysis(mut self, source_message_id: impl Into<String>, lens: CognitiveState) -> Self {
        self.analysis = Some(AnalysisLink {
            source_message_id: source_message_id.into(),
            lens,
        });
        self
    }
}

/// A conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instruction: Option<String>,
    /// Pinned model; `None` means the router picks per message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default)]
    pub cognitive_state: CognitiveState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(title: impl Into<String>, persona_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            title: title.into(),
            messages: Vec::new(),
            persona_id,
            custom_instruction: None,
            model_id: None,
            cognitive_state: CognitiveState::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Title derived from the opening prompt: 40 chars, ellipsised when cut.
    pub fn title_from(text: &str) -> String {
        let mut title: String = text.chars().take(TITLE_MAX_CHARS).collect();
        if text.chars().count() > TITLE_MAX_CHARS {
            title.push_str("...");
        }
        title
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    pub fn message(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Picking a persona drops any custom instruction; clearing the persona keeps it.
    pub fn set_persona(&mut self, persona_id: Option<String>, custom_instruction: Option<String>) {
        self.custom_instruction = if persona_id.is_some() {
            None
        } else {
            custom_instruction.filter(|c| !c.trim().is_empty())
        };
        self.persona_id = persona_id;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Unknown cognitive state: {0}")]
    UnknownCognitiveState(String),

    #[error("Chat not found: {0}")]
    ChatNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Nothing to send")]
    EmptyMessage,
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_truncation() {
        assert_eq!(Chat::title_from("short"), "short");
        let long = "a".repeat(41);
        let title = Chat::title_from(&long);
        assert_eq!(title, format!("{}...", "a".repeat(40)));
        assert_eq!(Chat::title_from(&"b".repeat(40)), "b".repeat(40));
    }

    #[test]
    fn test_title_counts_chars_not_bytes() {
        let text = "é".repeat(45);
        let title = Chat::title_from(&text);
        assert_eq!(title.chars().count(), 43);
    }

    #[test]
    fn test_set_persona_clears_custom() {
        let mut chat = Chat::new("t", None);
        chat.set_persona(None, Some("Talk like a pirate".into()));
        assert_eq!(chat.custom_instruction.as_deref(), Some("Talk like a pirate"));

        chat.set_persona(Some("code-wizard".into()), Some("ignored".into()));
        assert_eq!(chat.persona_id.as_deref(), Some("code-wizard"));
        assert!(chat.custom_instruction.is_none());
    }

    #[test]
    fn test_cognitive_state_parse() {
        assert_eq!("Creative".parse::<CognitiveState>().unwrap(), CognitiveState::Creative);
        assert!("sleepy".parse::<CognitiveState>().is_err());
        assert_eq!(CognitiveState::default(), CognitiveState::Focused);
    }

    #[test]
    fn test_message_serde_shape() {
        let msg = ChatMessage::user("hi", None);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["sender"], "user");
        assert!(json.get("attachment").is_none());
        assert!(json.get("isError").is_none());

        let err = ChatMessage::error("boom");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["sender"], "ai");
        assert_eq!(json["isError"], true);
    }

    #[test]
    fn test_attachment_from_bytes() {
        let att = Attachment::from_bytes("a.png", "image/png", b"hello");
        assert_eq!(att.data, "aGVsbG8=");
        assert!(att.is_image());
        assert_eq!(att.size_bytes(), 5);
    }
}
