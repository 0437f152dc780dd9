pub mod catalog;
pub mod chat;

pub use chat::{AnalysisLink, Attachment, Chat, ChatError, ChatMessage, CognitiveState, Sender};

pub mod settings {
    use serde::{Deserialize, Serialize};
    use std::path::PathBuf;

    fn default_language() -> String {
        "en-US".into()
    }

    fn default_persona() -> String {
        "default-assistant".into()
    }

    fn default_model() -> String {
        crate::catalog::FLASH_MODEL.into()
    }

    fn default_timeout() -> u64 {
        120
    }

    fn default_true() -> bool {
        true
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct GeminiSettings {
        /// Falls back to GEMINI_API_KEY / API_KEY when unset
        #[serde(default)]
        pub api_key: Option<String>,
        /// Override for proxies; defaults to the public endpoint
        #[serde(default)]
        pub base_url: Option<String>,
        #[serde(default = "default_model")]
        pub default_model: String,
        #[serde(default = "default_timeout")]
        pub timeout_secs: u64,
    }

    impl Default for GeminiSettings {
        fn default() -> Self {
            Self {
                api_key: None,
                base_url: None,
                default_model: default_model(),
                timeout_secs: default_timeout(),
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AppSettings {
        #[serde(default = "default_language")]
        pub language: String,
        #[serde(default = "default_persona")]
        pub default_persona_id: String,
        /// Attach Google Search grounding to requests that support it
        #[serde(default)]
        pub search_grounding: bool,
        /// Let the model router pick per message when a chat has no pinned model
        #[serde(default = "default_true")]
        pub auto_route: bool,
        /// Stream replies token by token instead of waiting for the full text
        #[serde(default = "default_true")]
        pub stream: bool,
        #[serde(default)]
        pub gemini: GeminiSettings,
        /// Where chats and downloaded-model state live; platform data dir when unset
        #[serde(default)]
        pub data_dir: Option<PathBuf>,
    }

    impl Default for AppSettings {
        fn default() -> Self {
            Self {
                language: default_language(),
                default_persona_id: default_persona(),
                search_grounding: false,
                auto_route: true,
                stream: true,
                gemini: GeminiSettings::default(),
                data_dir: None,
            }
        }
    }
}

pub mod agent_api {
    use crate::chat::Attachment;

    /// Incremental output from a streaming generation
    #[derive(Debug, Clone, PartialEq)]
    pub enum StreamChunk {
        Text(String),
        /// Inline image produced by an image-capable model
        Image(Attachment),
        Done { finish_reason: Option<String> },
        Error(String),
    }
}
