//! System instruction assembly.
//!
//! Final instruction = base (custom / persona / default) + cognitive framing
//! + formatting and language requirements.

use crate::cognitive;
use crate::languages::language_name;
use crate::personas::system_instruction_for;
use shared::{Chat, CognitiveState};

pub fn compose_system_instruction(base: &str, state: CognitiveState, language: &str) -> String {
    format!(
        "{base}\n\n{framing}\n\nYour responses should be visually appealing and well-structured. You must respond in {language}.",
        base = base.trim(),
        framing = cognitive::framing(state),
        language = language_name(language),
    )
}

/// Instruction for the next turn of `chat`, optionally under a different lens
pub fn system_instruction_for_chat(
    chat: &Chat,
    lens_override: Option<CognitiveState>,
    language: &str,
) -> String {
    let base = system_instruction_for(chat.persona_id.as_deref(), chat.custom_instruction.as_deref());
    compose_system_instruction(base, lens_override.unwrap_or(chat.cognitive_state), language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_layers() {
        let s = compose_system_instruction("You are X.", CognitiveState::Creative, "fr-FR");
        assert!(s.starts_with("You are X.\n\nCognitive state: CREATIVE."));
        assert!(s.ends_with("You must respond in French."));
    }

    #[test]
    fn test_chat_instruction_uses_custom_and_override() {
        let mut chat = Chat::new("t", Some("code-wizard".into()));
        let s = system_instruction_for_chat(&chat, None, "en-US");
        assert!(s.contains("Code Wizard"));
        assert!(s.contains("FOCUSED"));

        chat.set_persona(None, Some("Only answer in haiku.".into()));
        let s = system_instruction_for_chat(&chat, Some(CognitiveState::Critical), "xx");
        assert!(s.starts_with("Only answer in haiku."));
        assert!(s.contains("CRITICAL"));
        assert!(s.ends_with("respond in English."));
    }
}
