//! Heuristic model selection.
//!
//! Looks at the prompt text and attachment and picks an upstream model id.
//! Rules are checked in a fixed priority order:
//! image edit > code > long/creative > default.
//! Same input always gives the same model.

use regex::Regex;
use shared::catalog::{self, FLASH_MODEL, IMAGE_EDIT_MODEL, PRO_MODEL};
use shared::Attachment;
use std::sync::LazyLock;

/// Prompts longer than this (in chars, after trimming) go to the larger model
pub const LONG_PROMPT_CHARS: usize = 600;

static CODE_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(code|coding|function|method|debug|debugging|bug|compile|compiler|refactor|algorithm|regex|sql|query|stack\s*trace|exception|segfault|syntax|api|endpoint|python|javascript|typescript|rust|java|golang|kotlin|swift|html|css|bash|shell\s*script|unit\s*test)\b",
    )
    .expect("code term regex")
});

static CODE_SHAPES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(```|^\s*(fn|def|class|#include)\s|=>|^\s*\};?\s*$)")
        .expect("code shape regex")
});

static CREATIVE_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(story|stories|poem|poetry|haiku|sonnet|essay|novel|lyrics|song|screenplay|script|fiction|fantasy|brainstorm|imagine|creative|narrative|character)\b",
    )
    .expect("creative term regex")
});

/// Why a model was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteReason {
    ImageEdit,
    Code,
    LongOrCreative,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub model_id: &'static str,
    pub reason: RouteReason,
}

pub fn route(text: &str, attachment: Option<&Attachment>) -> Route {
    let trimmed = text.trim();

    // An image plus any instruction reads as an edit request
    if attachment.is_some_and(|a| a.is_image()) && !trimmed.is_empty() {
        return Route {
            model_id: IMAGE_EDIT_MODEL,
            reason: RouteReason::ImageEdit,
        };
    }

    if looks_like_code(trimmed) || attachment.is_some_and(is_code_attachment) {
        return Route {
            model_id: PRO_MODEL,
            reason: RouteReason::Code,
        };
    }

    if trimmed.chars().count() > LONG_PROMPT_CHARS || CREATIVE_TERMS.is_match(trimmed) {
        return Route {
            model_id: PRO_MODEL,
            reason: RouteReason::LongOrCreative,
        };
    }

    Route {
        model_id: FLASH_MODEL,
        reason: RouteReason::Default,
    }
}

pub fn route_model(text: &str, attachment: Option<&Attachment>) -> &'static str {
    route(text, attachment).model_id
}

/// Picks the model for one send.
///
/// A pinned catalog model always wins. Otherwise the router decides, or the
/// configured default is used when auto-routing is off. Pinned ids missing
/// from the catalog are ignored.
pub fn resolve_model(
    pinned: Option<&str>,
    auto_route: bool,
    default_model: &str,
    text: &str,
    attachment: Option<&Attachment>,
) -> String {
    if let Some(model) = pinned.and_then(catalog::find_model) {
        return model.id.to_string();
    }
    if let Some(id) = pinned {
        tracing::warn!("Pinned model {} is not in the catalog, routing instead", id);
    }
    if auto_route {
        let r = route(text, attachment);
        tracing::debug!("Routed to {} ({:?})", r.model_id, r.reason);
        r.model_id.to_string()
    } else {
        default_model.to_string()
    }
}

fn looks_like_code(text: &str) -> bool {
    CODE_TERMS.is_match(text) || CODE_SHAPES.is_match(text)
}

fn is_code_attachment(attachment: &Attachment) -> bool {
    let mime = attachment.mime_type.as_str();
    if mime.starts_with("text/x-")
        || matches!(
            mime,
            "application/json"
                | "application/javascript"
                | "application/x-python"
                | "application/x-sh"
                | "application/sql"
                | "application/xml"
                | "text/javascript"
        )
    {
        return true;
    }
    let name = attachment.name.to_lowercase();
    [
        ".rs", ".py", ".js", ".ts", ".tsx", ".jsx", ".go", ".java", ".c", ".cpp", ".h", ".cs",
        ".rb", ".kt", ".swift", ".sql", ".sh",
    ]
    .iter()
    .any(|ext| name.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> Attachment {
        Attachment::from_bytes("cat.png", "image/png", b"\x89PNG")
    }

    #[test]
    fn test_image_with_text_is_edit() {
        let r = route("make the sky purple", Some(&image()));
        assert_eq!(r.model_id, IMAGE_EDIT_MODEL);
        assert_eq!(r.reason, RouteReason::ImageEdit);
    }

    #[test]
    fn test_image_without_text_is_not_edit() {
        assert_eq!(route("   ", Some(&image())).model_id, FLASH_MODEL);
    }

    #[test]
    fn test_image_edit_beats_code() {
        // Priority: an image with an instruction stays an edit even with code words
        let r = route("debug this screenshot of my python function", Some(&image()));
        assert_eq!(r.reason, RouteReason::ImageEdit);
    }

    #[test]
    fn test_code_terms() {
        assert_eq!(route("Why does my Rust function not compile?", None).reason, RouteReason::Code);
        assert_eq!(route("write a SQL query for top customers", None).reason, RouteReason::Code);
        assert_eq!(route("```\nlet x = 1;\n```", None).reason, RouteReason::Code);
        assert_eq!(route("def foo():\n    return 1", None).reason, RouteReason::Code);
    }

    #[test]
    fn test_class_definition_is_code() {
        let r = route("class Dog(Animal):\n    pass", None);
        assert_eq!(r.reason, RouteReason::Code);
        assert_eq!(r.model_id, PRO_MODEL);
        // Mid-sentence "class" is prose
        assert_eq!(route("Which class should I take?", None).reason, RouteReason::Default);
    }

    #[test]
    fn test_code_beats_creative() {
        let r = route("write a poem generator in python", None);
        assert_eq!(r.reason, RouteReason::Code);
    }

    #[test]
    fn test_code_attachment() {
        let att = Attachment::from_bytes("main.rs", "text/plain", b"fn main() {}");
        assert_eq!(route("what does this do", Some(&att)).reason, RouteReason::Code);
        let json = Attachment::from_bytes("data", "application/json", b"{}");
        assert_eq!(route("summarize", Some(&json)).reason, RouteReason::Code);
    }

    #[test]
    fn test_long_and_creative() {
        assert_eq!(route("Tell me a story about a dragon", None).reason, RouteReason::LongOrCreative);
        let long = "word ".repeat(200);
        assert_eq!(route(&long, None).reason, RouteReason::LongOrCreative);
        assert_eq!(route(&long, None).model_id, PRO_MODEL);
    }

    #[test]
    fn test_default_route() {
        let r = route("What is the capital of France?", None);
        assert_eq!(r.model_id, FLASH_MODEL);
        assert_eq!(r.reason, RouteReason::Default);
        let pdf = Attachment::from_bytes("doc.pdf", "application/pdf", b"%PDF");
        assert_eq!(route("summarize this", Some(&pdf)).model_id, FLASH_MODEL);
    }

    #[test]
    fn test_route_is_deterministic() {
        let inputs = ["hello", "fix this bug", "a poem please", ""];
        for text in inputs {
            assert_eq!(route_model(text, None), route_model(text, None));
        }
    }

    #[test]
    fn test_word_boundaries() {
        // "codex" and "scripture" must not trip the keyword lists
        assert_eq!(route("Explain the codex of scripture", None).reason, RouteReason::Default);
    }

    #[test]
    fn test_resolve_model() {
        assert_eq!(resolve_model(Some(PRO_MODEL), true, FLASH_MODEL, "hi", None), PRO_MODEL);
        assert_eq!(resolve_model(Some("bogus"), true, FLASH_MODEL, "a story", None), PRO_MODEL);
        assert_eq!(resolve_model(None, false, "gemini-2.5-flash-lite", "a story", None), "gemini-2.5-flash-lite");
        assert_eq!(resolve_model(None, true, FLASH_MODEL, "fix my bug", None), PRO_MODEL);
    }
}
