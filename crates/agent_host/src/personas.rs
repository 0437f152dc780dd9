//! Named system-instruction presets.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Persona {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub system_instruction: &'static str,
}

pub const DEFAULT_PERSONA_ID: &str = "default-assistant";

pub static PERSONAS: &[Persona] = &[
    Persona {
        id: DEFAULT_PERSONA_ID,
        name: "Assistant",
        description: "Helpful, knowledgeable and concise",
        icon: "🤖",
        system_instruction: "You are Bhargava GPT, a helpful and comprehensive AI assistant. You can access the capabilities of many different large language models to provide the best possible response. You are friendly, knowledgeable, and always aim to provide clear and concise answers.",
    },
    Persona {
        id: "creative-writer",
        name: "Creative Writer",
        description: "Imaginative stories, poems and scripts",
        icon: "✍️",
        system_instruction: "You are a creative writer and storyteller. Your responses should be imaginative, descriptive, and engaging. You can write poems, stories, scripts, and other creative content. You should avoid being a generic AI and instead adopt a more artistic and expressive personality.",
    },
    Persona {
        id: "code-wizard",
        name: "Code Wizard",
        description: "Expert programming help and debugging",
        icon: "💻",
        system_instruction: "You are a Code Wizard, an expert programmer with deep knowledge of various programming languages, algorithms, and software development principles. Provide accurate, efficient, and well-explained code snippets. When debugging, explain the error and the solution clearly. Use markdown for all code blocks.",
    },
    Persona {
        id: "socratic-tutor",
        name: "Socratic Tutor",
        description: "Guides you to answers with questions",
        icon: "🤔",
        system_instruction: "You are a tutor who uses the Socratic method. Instead of giving direct answers, guide the user to their own conclusions by asking thought-provoking questions. Help them break down complex problems and explore different perspectives. Be patient and encouraging.",
    },
];

pub fn find_persona(id: &str) -> Option<&'static Persona> {
    PERSONAS.iter().find(|p| p.id == id)
}

pub fn default_persona() -> &'static Persona {
    find_persona(DEFAULT_PERSONA_ID).unwrap_or(&PERSONAS[0])
}

/// Base instruction for a chat: custom text, else persona, else the default.
pub fn system_instruction_for<'a>(
    persona_id: Option<&str>,
    custom_instruction: Option<&'a str>,
) -> &'a str {
    if let Some(custom) = custom_instruction.filter(|c| !c.trim().is_empty()) {
        return custom;
    }
    persona_id
        .and_then(find_persona)
        .unwrap_or_else(default_persona)
        .system_instruction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_wins() {
        assert_eq!(
            system_instruction_for(Some("code-wizard"), Some("Be terse.")),
            "Be terse."
        );
    }

    #[test]
    fn test_persona_lookup() {
        assert!(system_instruction_for(Some("code-wizard"), None).starts_with("You are a Code Wizard"));
        assert!(system_instruction_for(Some("socratic-tutor"), Some("  ")).contains("Socratic"));
    }

    #[test]
    fn test_fallback_to_default() {
        let default = default_persona().system_instruction;
        assert_eq!(system_instruction_for(None, None), default);
        assert_eq!(system_instruction_for(Some("ghost"), None), default);
        assert!(default.starts_with("You are Bhargava GPT"));
    }
}
