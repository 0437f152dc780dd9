//! Supported response languages (BCP-47 code -> display name).

pub const DEFAULT_LANGUAGE: &str = "en-US";

pub static LANGUAGES: &[(&str, &str)] = &[
    ("en-US", "English"),
    ("hi-IN", "Hindi"),
    ("es-ES", "Spanish"),
    ("fr-FR", "French"),
    ("de-DE", "German"),
    ("ja-JP", "Japanese"),
    ("zh-CN", "Chinese"),
    ("ar-SA", "Arabic"),
    ("pt-BR", "Portuguese"),
    ("bn-IN", "Bengali"),
];

pub fn is_supported(code: &str) -> bool {
    LANGUAGES.iter().any(|(c, _)| *c == code)
}

/// Display name for a language code, English when unknown
pub fn language_name(code: &str) -> &'static str {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or("English")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_name() {
        assert_eq!(language_name("hi-IN"), "Hindi");
        assert_eq!(language_name("xx-YY"), "English");
        assert!(is_supported(DEFAULT_LANGUAGE));
        assert!(!is_supported("klingon"));
    }
}
