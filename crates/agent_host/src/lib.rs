//! Agent Host - the conversation engine
//!
//! This crate turns user input into upstream requests and keeps the chat
//! history consistent:
//! - Persona and custom system instructions per chat
//! - Cognitive lens framing and lens-based analysis of earlier replies
//! - Model routing per message (or a pinned model)
//! - Inline error replies when the upstream call fails
//! - Voice helpers for read-aloud and dictation (library API; the terminal
//!   front end has no speech engine)

pub mod cognitive;
pub mod languages;
pub mod personas;
pub mod prompts;
pub mod voice;

pub use personas::{Persona, DEFAULT_PERSONA_ID, PERSONAS};
pub use prompts::{compose_system_instruction, system_instruction_for_chat};

use anyhow::{anyhow, Result};
use providers::{resolve_model, ChatBackend, GenerateRequest, Reply};
use services::ChatStore;
use shared::agent_api::StreamChunk;
use shared::catalog;
use shared::settings::AppSettings;
use shared::{Attachment, Chat, ChatError, ChatMessage, CognitiveState};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

/// Shown in place of a reply when the upstream call fails
pub const ERROR_REPLY: &str =
    "Sorry, I encountered an error. Please check your API key and network connection and try again.";

/// Settings staged for the next chat created from the welcome screen
#[derive(Debug, Clone, Default)]
struct Draft {
    cognitive_state: CognitiveState,
    model_id: Option<String>,
}

/// Result of one send
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub chat_id: String,
    pub model_id: String,
    pub user_message: ChatMessage,
    pub reply: ChatMessage,
}

pub struct AgentHost {
    pub settings: AppSettings,
    store: ChatStore,
    backend: Arc<dyn ChatBackend>,
    draft: Draft,
}

impl AgentHost {
    pub fn new(settings: AppSettings, store: ChatStore, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            settings,
            store,
            backend,
            draft: Draft::default(),
        }
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn active_chat(&self) -> Option<&Chat> {
        self.store.active()
    }

    /// Persisted UI language, falling back to settings
    pub fn language(&self) -> &str {
        self.store.language().unwrap_or(&self.settings.language)
    }

    pub fn set_language(&mut self, code: &str) -> Result<()> {
        if !languages::is_supported(code) {
            return Err(anyhow!("Unsupported language: {}", code));
        }
        self.store.set_language(code);
        self.persist();
        Ok(())
    }

    /// Lens that will apply to the next message
    pub fn cognitive_state(&self) -> CognitiveState {
        self.active_chat()
            .map(|c| c.cognitive_state)
            .unwrap_or(self.draft.cognitive_state)
    }

    /// Send a prompt on the active chat, creating a chat when none is active.
    ///
    /// Upstream failures never surface as `Err`: they become an inline AI
    /// message. `Err` is reserved for invalid input.
    pub async fn send_message(
        &mut self,
        text: &str,
        attachment: Option<Attachment>,
        tx: Option<&UnboundedSender<StreamChunk>>,
    ) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() && attachment.is_none() {
            return Err(ChatError::EmptyMessage.into());
        }

        let user_message = ChatMessage::user(text, attachment.clone());
        let (chat_id, history) = match self.store.active_id().map(str::to_string) {
            Some(id) => {
                let history = self
                    .store
                    .get(&id)
                    .map(|c| c.messages.clone())
                    .unwrap_or_default();
                (id, history)
            }
            None => (self.start_chat(text, attachment.as_ref())?, Vec::new()),
        };
        self.store.append(&chat_id, user_message.clone())?;
        self.persist();

        let (model_id, reply) = self
            .dispatch(&chat_id, history, text.to_string(), attachment, None, tx)
            .await?;

        self.store.append(&chat_id, reply.clone())?;
        self.persist();

        Ok(SendOutcome {
            chat_id,
            model_id,
            user_message,
            reply,
        })
    }

    /// Re-read an earlier message of the active chat through `lens`.
    ///
    /// The lens applies to this one call only; the chat keeps its own state.
    pub async fn analyze_message(
        &mut self,
        message_id: &str,
        lens: CognitiveState,
        tx: Option<&UnboundedSender<StreamChunk>>,
    ) -> Result<SendOutcome> {
        let chat = self
            .store
            .active()
            .ok_or_else(|| anyhow!("No active chat"))?;
        let source = chat
            .message(message_id)
            .ok_or_else(|| ChatError::MessageNotFound(message_id.to_string()))?;
        let prompt = cognitive::analysis_prompt(lens, &source.text);
        let chat_id = chat.id.clone();
        let history = chat.messages.clone();

        let user_message = ChatMessage::user(
            format!("{} Analyze through the {} lens", lens.icon(), cognitive::label(lens)),
            None,
        );
        self.store.append(&chat_id, user_message.clone())?;
        self.persist();

        let (model_id, reply) = self
            .dispatch(&chat_id, history, prompt, None, Some(lens), tx)
            .await?;
        let reply = reply.with_analysis(message_id, lens);

        self.store.append(&chat_id, reply.clone())?;
        self.persist();

        Ok(SendOutcome {
            chat_id,
            model_id,
            user_message,
            reply,
        })
    }

    /// Go back to the welcome state; the next send creates a chat
    pub fn new_chat(&mut self) {
        if self.store.set_active(None).is_ok() {
            self.persist();
        }
    }

    pub fn select_chat(&mut self, id: &str) -> Result<()> {
        self.store.set_active(Some(id))?;
        self.persist();
        Ok(())
    }

    pub fn delete_chat(&mut self, id: &str) -> bool {
        let deleted = self.store.delete(id);
        if deleted {
            self.persist();
        }
        deleted
    }

    pub fn set_persona(&mut self, persona_id: Option<&str>, custom_instruction: Option<&str>) -> Result<()> {
        if let Some(id) = persona_id {
            if personas::find_persona(id).is_none() {
                return Err(anyhow!("Unknown persona: {}", id));
            }
        }
        let chat = self.active_chat_mut()?;
        chat.set_persona(
            persona_id.map(str::to_string),
            custom_instruction.map(str::to_string),
        );
        self.persist();
        Ok(())
    }

    pub fn set_cognitive_state(&mut self, state: CognitiveState) {
        match self.active_chat_mut() {
            Ok(chat) => {
                chat.cognitive_state = state;
                self.persist();
            }
            Err(_) => self.draft.cognitive_state = state,
        }
    }

    /// Pin a catalog model, or `None` to route automatically.
    pub fn set_model(&mut self, model_id: Option<&str>) -> Result<()> {
        if let Some(id) = model_id {
            if catalog::find_model(id).is_none() {
                return Err(anyhow!("Unknown model: {}", id));
            }
        }
        let model_id = model_id.map(str::to_string);
        match self.active_chat_mut() {
            Ok(chat) => {
                chat.model_id = model_id;
                self.persist();
            }
            Err(_) => self.draft.model_id = model_id,
        }
        Ok(())
    }

    /// Surface a dictation error in the active chat.
    /// Returns false when there is no active chat to show it in.
    ///
    /// Called by speech-capable front ends; see [`voice`].
    pub fn record_error(&mut self, text: &str) -> bool {
        let Some(id) = self.store.active_id().map(str::to_string) else {
            return false;
        };
        let msg = ChatMessage::error(format!("Voice Assistant Error: {}", text));
        if self.store.append(&id, msg).is_err() {
            return false;
        }
        self.persist();
        true
    }

    fn start_chat(&mut self, text: &str, attachment: Option<&Attachment>) -> Result<String> {
        let title_source = if text.is_empty() {
            attachment.map(|a| a.name.as_str()).unwrap_or("New chat")
        } else {
            text
        };
        let mut chat = Chat::new(
            Chat::title_from(title_source),
            Some(self.settings.default_persona_id.clone()),
        );
        chat.cognitive_state = self.draft.cognitive_state;
        chat.model_id = self.draft.model_id.take();
        let id = self.store.create(chat);
        self.store.set_active(Some(&id))?;
        tracing::info!("Started chat {}", id);
        Ok(id)
    }

    fn active_chat_mut(&mut self) -> Result<&mut Chat> {
        let id = self
            .store
            .active_id()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("No active chat"))?;
        self.store
            .get_mut(&id)
            .ok_or_else(|| ChatError::ChatNotFound(id).into())
    }

    /// Compose and send one request, returning the reply message to append.
    async fn dispatch(
        &self,
        chat_id: &str,
        history: Vec<ChatMessage>,
        message: String,
        attachment: Option<Attachment>,
        lens_override: Option<CognitiveState>,
        tx: Option<&UnboundedSender<StreamChunk>>,
    ) -> Result<(String, ChatMessage)> {
        let chat = self
            .store
            .get(chat_id)
            .ok_or_else(|| ChatError::ChatNotFound(chat_id.to_string()))?;

        let model = resolve_model(
            chat.model_id.as_deref(),
            self.settings.auto_route,
            &self.settings.gemini.default_model,
            &message,
            attachment.as_ref(),
        );
        let req = GenerateRequest {
            model: model.clone(),
            history,
            message,
            attachment,
            system_instruction: system_instruction_for_chat(chat, lens_override, self.language()),
            search_grounding: self.settings.search_grounding,
        };

        let reply = match self.call_backend(&req, tx).await {
            Ok(reply) if reply.text.trim().is_empty() && reply.images.is_empty() => {
                tracing::warn!(
                    "Empty reply from {} (finish reason: {:?})",
                    model,
                    reply.finish_reason
                );
                ChatMessage::error(ERROR_REPLY)
            }
            Ok(reply) => ChatMessage::ai(reply.text).with_attachment(reply.images.into_iter().next()),
            Err(e) => {
                tracing::error!("Error in Gemini API call: {:#}", e);
                if let Some(tx) = tx {
                    let _ = tx.send(StreamChunk::Error(e.to_string()));
                }
                ChatMessage::error(ERROR_REPLY)
            }
        };
        Ok((model, reply))
    }

    async fn call_backend(
        &self,
        req: &GenerateRequest,
        tx: Option<&UnboundedSender<StreamChunk>>,
    ) -> Result<Reply> {
        let Some(tx) = tx else {
            let mut reply = self.backend.generate(req).await?;
            reply.text = reply.text_with_sources();
            reply.sources.clear();
            return Ok(reply);
        };

        let (inner_tx, mut inner_rx) = unbounded_channel();
        let forward = async {
            let mut reply = Reply::default();
            let mut stream_error = None;
            while let Some(chunk) = inner_rx.recv().await {
                match &chunk {
                    StreamChunk::Text(t) => reply.text.push_str(t),
                    StreamChunk::Image(img) => reply.images.push(img.clone()),
                    StreamChunk::Done { finish_reason } => reply.finish_reason = finish_reason.clone(),
                    StreamChunk::Error(e) => stream_error = Some(e.clone()),
                }
                let _ = tx.send(chunk);
            }
            (reply, stream_error)
        };

        let (result, (mut reply, stream_error)) =
            tokio::join!(self.backend.generate_stream(req, inner_tx), forward);
        result?;

        if let Some(err) = stream_error {
            if reply.text.trim().is_empty() && reply.images.is_empty() {
                return Err(anyhow!(err));
            }
            tracing::warn!("Stream ended early: {}", err);
            reply.text.push_str("\n\n_(response interrupted)_");
        }
        Ok(reply)
    }

    fn persist(&self) {
        if let Err(e) = self.store.save() {
            tracing::error!("Failed to save chats: {:#}", e);
        }
    }
}
