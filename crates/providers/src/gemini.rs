use crate::sse::SseParser;
use crate::{ChatBackend, GenerateRequest, Reply, Source};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::StreamChunk;
use shared::catalog;
use shared::settings::GeminiSettings;
use shared::{Attachment, ChatMessage, Sender};
use std::env;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Sent when a turn would otherwise have no parts at all
const EMPTY_TURN_PLACEHOLDER: &str = "(attachment)";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    /// Thought summaries from thinking models; never shown as answer text
    #[serde(default, skip_serializing)]
    pub thought: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiTool {
    pub google_search: serde_json::Value,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

/// Wire body for `generateContent` / `streamGenerateContent`
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<GeminiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    #[serde(default)]
    uri: String,
    #[serde(default)]
    title: String,
}

fn text_part(text: impl Into<String>) -> GeminiPart {
    GeminiPart {
        text: Some(text.into()),
        ..Default::default()
    }
}

fn data_part(attachment: &Attachment) -> GeminiPart {
    GeminiPart {
        inline_data: Some(InlineData {
            mime_type: attachment.mime_type.clone(),
            data: attachment.data.clone(),
        }),
        ..Default::default()
    }
}

/// Parts for one turn: file data first, then the instruction text.
fn turn_parts(text: &str, attachment: Option<&Attachment>) -> Vec<GeminiPart> {
    let mut parts = Vec::new();
    if let Some(att) = attachment {
        parts.push(data_part(att));
    }
    if !text.trim().is_empty() {
        parts.push(text_part(text));
    }
    parts
}

fn history_turn(msg: &ChatMessage) -> Option<GeminiContent> {
    if msg.is_error {
        return None;
    }
    let parts = turn_parts(&msg.text, msg.attachment.as_ref());
    if parts.is_empty() {
        return None;
    }
    // Gemini roles are "user" | "model"
    let role = match msg.sender {
        Sender::User => "user",
        Sender::Ai => "model",
    };
    Some(GeminiContent {
        role: Some(role.to_string()),
        parts,
    })
}

/// Compose the wire payload for a request.
pub fn build_payload(req: &GenerateRequest) -> GeminiRequest {
    let mut contents: Vec<GeminiContent> = req.history.iter().filter_map(history_turn).collect();

    let mut parts = turn_parts(&req.message, req.attachment.as_ref());
    if parts.is_empty() {
        parts.push(text_part(EMPTY_TURN_PLACEHOLDER));
    }
    contents.push(GeminiContent {
        role: Some("user".to_string()),
        parts,
    });

    let system_instruction = if req.system_instruction.trim().is_empty() {
        None
    } else {
        Some(GeminiContent {
            role: None,
            parts: vec![text_part(req.system_instruction.clone())],
        })
    };

    let tools = if req.search_grounding && catalog::supports_tools(&req.model) {
        vec![GeminiTool {
            google_search: serde_json::json!({}),
        }]
    } else {
        Vec::new()
    };

    let generation_config = catalog::generates_images(&req.model).then(|| GenerationConfig {
        response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
    });

    GeminiRequest {
        contents,
        system_instruction,
        tools,
        generation_config,
    }
}

/// Collects text, images and grounding sources from response chunks.
#[derive(Default)]
struct ReplyAccumulator {
    reply: Reply,
    image_count: usize,
}

impl ReplyAccumulator {
    /// Absorb one response and return the new text and images it carried.
    fn absorb(&mut self, resp: GeminiResponse) -> Result<(String, Vec<Attachment>)> {
        if resp.candidates.is_empty() {
            if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(anyhow!("gemini blocked the prompt: {}", reason));
            }
        }

        let mut new_text = String::new();
        let mut new_images = Vec::new();
        let Some(candidate) = resp.candidates.into_iter().next() else {
            return Ok((new_text, new_images));
        };

        if let Some(content) = candidate.content {
            for part in content.parts {
                if part.thought {
                    continue;
                }
                if let Some(text) = part.text {
                    new_text.push_str(&text);
                }
                if let Some(data) = part.inline_data {
                    self.image_count += 1;
                    let ext = data.mime_type.rsplit('/').next().unwrap_or("bin").to_string();
                    new_images.push(Attachment {
                        data: data.data,
                        mime_type: data.mime_type,
                        name: format!("generated-{}.{}", self.image_count, ext),
                    });
                }
            }
        }

        if let Some(meta) = candidate.grounding_metadata {
            for chunk in meta.grounding_chunks {
                if let Some(web) = chunk.web {
                    if !web.uri.is_empty() && !self.reply.sources.iter().any(|s| s.uri == web.uri) {
                        self.reply.sources.push(Source {
                            title: web.title,
                            uri: web.uri,
                        });
                    }
                }
            }
        }

        if candidate.finish_reason.is_some() {
            self.reply.finish_reason = candidate.finish_reason;
        }
        self.reply.text.push_str(&new_text);
        self.reply.images.extend(new_images.iter().cloned());
        Ok((new_text, new_images))
    }

    fn finish(self) -> Reply {
        self.reply
    }
}

pub struct GeminiClient {
    http: Client,
    auth_token: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            auth_token: api_key.into(),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    pub fn from_settings(settings: &GeminiSettings) -> Result<Self> {
        let auth_token = if let Some(key) = settings.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            key.clone()
        } else {
            env::var("GEMINI_API_KEY")
                .or_else(|_| env::var("API_KEY"))
                .map_err(|_| anyhow!("No Gemini API key configured (set GEMINI_API_KEY)"))?
        };
        Self::new(
            auth_token,
            settings.base_url.as_deref(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn endpoint(&self, model: &str, stream: bool) -> Result<Url> {
        let method = if stream {
            "streamGenerateContent"
        } else {
            "generateContent"
        };
        let mut url = Url::parse(&format!("{}/models/{}:{}", self.base_url, model, method))
            .with_context(|| format!("invalid Gemini base url: {}", self.base_url))?;
        if stream {
            url.query_pairs_mut().append_pair("alt", "sse");
        }
        Ok(url)
    }

    async fn post(&self, url: Url, body: &GeminiRequest) -> Result<reqwest::Response> {
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.auth_token)
            .json(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.trim().chars().take(800).collect();
            if detail.is_empty() {
                return Err(anyhow!("gemini error: {}", status));
            }
            return Err(anyhow!("gemini error: {}\n{}", status, detail));
        }
        Ok(resp)
    }
}

#[async_trait]
impl ChatBackend for GeminiClient {
    async fn generate(&self, req: &GenerateRequest) -> Result<Reply> {
        let body = build_payload(req);
        tracing::debug!("gemini generate: model={} turns={}", req.model, body.contents.len());
        let resp = self.post(self.endpoint(&req.model, false)?, &body).await?;
        let parsed: GeminiResponse = resp.json().await.context("invalid gemini response")?;
        let mut acc = ReplyAccumulator::default();
        acc.absorb(parsed)?;
        Ok(acc.finish())
    }

    async fn generate_stream(
        &self,
        req: &GenerateRequest,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()> {
        let body = build_payload(req);
        tracing::debug!("gemini stream: model={} turns={}", req.model, body.contents.len());
        let resp = self.post(self.endpoint(&req.model, true)?, &body).await?;

        let mut stream = resp.bytes_stream();
        let mut parser = SseParser::new();
        let mut acc = ReplyAccumulator::default();

        let handle = |data: &str, acc: &mut ReplyAccumulator| -> bool {
            match serde_json::from_str::<GeminiResponse>(data) {
                Ok(parsed) => match acc.absorb(parsed) {
                    Ok((text, images)) => {
                        if !text.is_empty() {
                            let _ = tx.send(StreamChunk::Text(text));
                        }
                        for image in images {
                            let _ = tx.send(StreamChunk::Image(image));
                        }
                        true
                    }
                    Err(e) => {
                        let _ = tx.send(StreamChunk::Error(e.to_string()));
                        false
                    }
                },
                Err(e) => {
                    let _ = tx.send(StreamChunk::Error(format!(
                        "Failed to parse Gemini stream: {}",
                        e
                    )));
                    false
                }
            }
        };

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    let _ = tx.send(StreamChunk::Error(format!("stream read error: {}", e)));
                    return Ok(());
                }
            };
            for event in parser.feed(&bytes) {
                if event.is_done_marker() {
                    continue;
                }
                if !handle(&event.data, &mut acc) {
                    return Ok(());
                }
            }
        }
        if let Some(event) = parser.finish() {
            if !event.is_done_marker() && !handle(&event.data, &mut acc) {
                return Ok(());
            }
        }

        let reply = acc.finish();
        let sources = crate::format_sources(&reply.sources);
        if !sources.is_empty() {
            let _ = tx.send(StreamChunk::Text(sources));
        }
        let _ = tx.send(StreamChunk::Done {
            finish_reason: reply.finish_reason,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::catalog::{FLASH_MODEL, IMAGE_EDIT_MODEL};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc::unbounded_channel;

    fn request(model: &str) -> GenerateRequest {
        GenerateRequest {
            model: model.to_string(),
            history: vec![],
            message: "hello".into(),
            attachment: None,
            system_instruction: "Be nice.".into(),
            search_grounding: false,
        }
    }

    #[test]
    fn test_history_roles_and_order() {
        let mut req = request(FLASH_MODEL);
        req.history = vec![ChatMessage::user("hi", None), ChatMessage::ai("hello there")];
        req.message = "how are you".into();
        let json = serde_json::to_value(build_payload(&req)).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "how are you");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be nice.");
        assert!(json["systemInstruction"].get("role").is_none());
        assert!(json.get("tools").is_none());
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_error_messages_skipped() {
        let mut req = request(FLASH_MODEL);
        req.history = vec![ChatMessage::user("hi", None), ChatMessage::error("Sorry, failed")];
        let payload = build_payload(&req);
        assert_eq!(payload.contents.len(), 2);
        assert_eq!(payload.contents[1].parts[0].text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_inline_image_part_first() {
        let mut req = request(IMAGE_EDIT_MODEL);
        req.attachment = Some(Attachment::from_bytes("cat.png", "image/png", b"png"));
        req.message = "add a hat".into();
        let json = serde_json::to_value(build_payload(&req)).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "cG5n");
        assert_eq!(parts[1]["text"], "add a hat");
        assert_eq!(json["generationConfig"]["responseModalities"], json!(["TEXT", "IMAGE"]));
    }

    #[test]
    fn test_attachment_only_turn() {
        let mut req = request(FLASH_MODEL);
        req.message = "  ".into();
        req.attachment = Some(Attachment::from_bytes("a.pdf", "application/pdf", b"%PDF"));
        let payload = build_payload(&req);
        assert_eq!(payload.contents[0].parts.len(), 1);
        assert!(payload.contents[0].parts[0].inline_data.is_some());
    }

    #[test]
    fn test_empty_turn_gets_placeholder() {
        let mut req = request(FLASH_MODEL);
        req.message = String::new();
        let payload = build_payload(&req);
        assert_eq!(payload.contents[0].parts[0].text.as_deref(), Some(EMPTY_TURN_PLACEHOLDER));
    }

    #[test]
    fn test_search_grounding_toggle() {
        let mut req = request(FLASH_MODEL);
        req.search_grounding = true;
        let json = serde_json::to_value(build_payload(&req)).unwrap();
        assert_eq!(json["tools"], json!([{ "googleSearch": {} }]));

        // The image model rejects tools, so grounding is dropped
        let mut req = request(IMAGE_EDIT_MODEL);
        req.search_grounding = true;
        let json = serde_json::to_value(build_payload(&req)).unwrap();
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn test_accumulator_text_images_sources() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [
                    { "text": "thinking...", "thought": true },
                    { "text": "Here you go" },
                    { "inlineData": { "mimeType": "image/png", "data": "AAAA" } }
                ]},
                "finishReason": "STOP",
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://a.example", "title": "A" } },
                    { "web": { "uri": "https://a.example", "title": "A again" } }
                ]}
            }]
        }))
        .unwrap();
        let mut acc = ReplyAccumulator::default();
        let (text, images) = acc.absorb(resp).unwrap();
        assert_eq!(text, "Here you go");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "generated-1.png");

        let reply = acc.finish();
        assert_eq!(reply.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(reply.sources.len(), 1);
    }

    #[test]
    fn test_blocked_prompt_is_error() {
        let resp: GeminiResponse =
            serde_json::from_value(json!({ "promptFeedback": { "blockReason": "SAFETY" } })).unwrap();
        let mut acc = ReplyAccumulator::default();
        let err = acc.absorb(resp).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_endpoints() {
        let client = GeminiClient::new("k", Some("http://localhost:9/v1beta/"), Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.endpoint(FLASH_MODEL, false).unwrap().as_str(),
            "http://localhost:9/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            client.endpoint(FLASH_MODEL, true).unwrap().as_str(),
            "http://localhost:9/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn test_settings_key_wins() {
        let settings = GeminiSettings {
            api_key: Some("from-settings".into()),
            ..Default::default()
        };
        let client = GeminiClient::from_settings(&settings).unwrap();
        assert_eq!(client.auth_token, "from-settings");
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    fn http_response(status: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\ncontent-type: {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        )
    }

    /// Read one request, headers and body, so the client never sees a reset
    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + len {
                return;
            }
        }
    }

    /// Serve a single canned response on a local port; returns the base url.
    async fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{}/v1beta", addr)
    }

    fn local_client(base_url: &str) -> GeminiClient {
        GeminiClient::new("k", Some(base_url), Duration::from_secs(5)).unwrap()
    }

    async fn collect_stream(base_url: &str) -> (Result<()>, Vec<StreamChunk>) {
        let (tx, mut rx) = unbounded_channel();
        let result = local_client(base_url).generate_stream(&request(FLASH_MODEL), tx).await;
        let mut chunks = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            chunks.push(chunk);
        }
        (result, chunks)
    }

    #[tokio::test]
    async fn test_generate_over_http() {
        let body = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hi there" }] },
                "finishReason": "STOP",
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://a.example", "title": "A" } }
                ]}
            }]
        })
        .to_string();
        let base = serve_once(http_response("200 OK", "application/json", &body)).await;

        let reply = local_client(&base).generate(&request(FLASH_MODEL)).await.unwrap();
        assert_eq!(reply.text, "Hi there");
        assert_eq!(reply.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(reply.sources[0].uri, "https://a.example");
    }

    #[tokio::test]
    async fn test_http_error_carries_status_and_short_detail() {
        let body = "x".repeat(2000);
        let base = serve_once(http_response("500 Internal Server Error", "text/plain", &body)).await;

        let err = local_client(&base).generate(&request(FLASH_MODEL)).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("gemini error: 500"), "{}", msg);
        let (_, detail) = msg.split_once('\n').unwrap();
        assert_eq!(detail.len(), 800);
    }

    #[tokio::test]
    async fn test_stream_connect_failure_returns_err() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (result, chunks) = collect_stream(&format!("http://{}/v1beta", addr)).await;
        assert!(result.is_err());
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_stream_http_error_returns_err() {
        let base = serve_once(http_response("429 Too Many Requests", "text/plain", "slow down")).await;
        let (result, chunks) = collect_stream(&base).await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("429") && err.contains("slow down"), "{}", err);
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_stream_sources_arrive_before_done() {
        let first = json!({ "candidates": [{ "content": { "parts": [{ "text": "Hello" }] } }] });
        let last = json!({ "candidates": [{
            "content": { "parts": [{ "text": " world" }] },
            "finishReason": "STOP",
            "groundingMetadata": { "groundingChunks": [
                { "web": { "uri": "https://a.example", "title": "A" } }
            ]}
        }]});
        let body = format!("data: {}\r\n\r\ndata: {}\r\n\r\n", first, last);
        let base = serve_once(http_response("200 OK", "text/event-stream", &body)).await;

        let (result, chunks) = collect_stream(&base).await;
        assert!(result.is_ok());
        let sources = crate::format_sources(&[Source {
            title: "A".into(),
            uri: "https://a.example".into(),
        }]);
        assert_eq!(
            chunks,
            vec![
                StreamChunk::Text("Hello".into()),
                StreamChunk::Text(" world".into()),
                StreamChunk::Text(sources),
                StreamChunk::Done {
                    finish_reason: Some("STOP".into())
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_bad_event_after_text_sends_error() {
        let first = json!({ "candidates": [{ "content": { "parts": [{ "text": "Hello" }] } }] });
        let body = format!("data: {}\n\ndata: {{not json\n\n", first);
        let base = serve_once(http_response("200 OK", "text/event-stream", &body)).await;

        let (result, chunks) = collect_stream(&base).await;
        assert!(result.is_ok());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], StreamChunk::Text("Hello".into()));
        assert!(matches!(&chunks[1], StreamChunk::Error(e) if e.starts_with("Failed to parse Gemini stream")));
    }

    #[tokio::test]
    async fn test_stream_cut_off_mid_body_sends_error() {
        let first = json!({ "candidates": [{ "content": { "parts": [{ "text": "Hello" }] } }] });
        let partial = format!("data: {}\n\n", first);
        // Promise more bytes than are sent, then hang up
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncontent-length: {}\r\n\r\n{}",
            partial.len() + 500,
            partial
        );
        let base = serve_once(response).await;

        let (result, chunks) = collect_stream(&base).await;
        assert!(result.is_ok());
        assert_eq!(chunks[0], StreamChunk::Text("Hello".into()));
        assert!(matches!(chunks.last(), Some(StreamChunk::Error(e)) if e.starts_with("stream read error")));
        assert!(!chunks.iter().any(|c| matches!(c, StreamChunk::Done { .. })));
    }
}
