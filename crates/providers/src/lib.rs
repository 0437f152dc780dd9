//! Upstream model access: heuristic routing, request composition and the
//! Gemini HTTP client.

pub mod gemini;
pub mod model_router;
pub mod sse;

use anyhow::Result;
use async_trait::async_trait;
use shared::agent_api::StreamChunk;
use shared::{Attachment, ChatMessage};
use tokio::sync::mpsc::UnboundedSender;

pub use gemini::GeminiClient;
pub use model_router::{resolve_model, route, route_model, Route, RouteReason};

/// Everything needed to compose one upstream call
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    /// Prior turns, oldest first, not including `message`
    pub history: Vec<ChatMessage>,
    pub message: String,
    pub attachment: Option<Attachment>,
    pub system_instruction: String,
    pub search_grounding: bool,
}

/// A web page the answer was grounded on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub text: String,
    pub images: Vec<Attachment>,
    pub sources: Vec<Source>,
    pub finish_reason: Option<String>,
}

impl Reply {
    /// Reply text with a numbered source list appended when grounding was used
    pub fn text_with_sources(&self) -> String {
        let mut out = self.text.clone();
        out.push_str(&format_sources(&self.sources));
        out
    }
}

pub fn format_sources(sources: &[Source]) -> String {
    if sources.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n\n**Sources**\n");
    for (i, s) in sources.iter().enumerate() {
        let title = if s.title.is_empty() { &s.uri } else { &s.title };
        out.push_str(&format!("{}. [{}]({})\n", i + 1, title, s.uri));
    }
    out
}

/// Seam between the conversation engine and a concrete model provider.
///
/// Streaming contract: if the connection fails before any chunk is sent,
/// return `Err`. Once streaming has started, failures are reported as
/// `StreamChunk::Error` and the call returns `Ok(())`.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn generate(&self, req: &GenerateRequest) -> Result<Reply>;

    async fn generate_stream(
        &self,
        req: &GenerateRequest,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()>;
}
