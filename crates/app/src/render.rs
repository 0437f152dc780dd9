//! Lightweight markdown renderer for terminal output.
//!
//! Handles the subset of markdown that the models actually produce:
//! - `# Heading` through `#### Heading`
//! - `**bold**` and `` `inline code` ``
//! - `- bullet` and `* bullet` list items
//! - `[text](url)` links
//! - fenced code blocks, labelled with their language

const BOLD: &str = "\x1b[1m";
const CODE: &str = "\x1b[36m";
const DIM: &str = "\x1b[2m";
const UNDERLINE: &str = "\x1b[4m";
const RESET: &str = "\x1b[0m";

/// Escape sequences to use; all empty when output is not a terminal
#[derive(Debug, Clone, Copy)]
pub struct Style {
    bold: &'static str,
    code: &'static str,
    dim: &'static str,
    underline: &'static str,
    reset: &'static str,
}

impl Style {
    pub fn ansi() -> Self {
        Self {
            bold: BOLD,
            code: CODE,
            dim: DIM,
            underline: UNDERLINE,
            reset: RESET,
        }
    }

    pub fn plain() -> Self {
        Self {
            bold: "",
            code: "",
            dim: "",
            underline: "",
            reset: "",
        }
    }

    pub fn dim(&self, text: &str) -> String {
        format!("{}{}{}", self.dim, text, self.reset)
    }

    pub fn bold(&self, text: &str) -> String {
        format!("{}{}{}", self.bold, text, self.reset)
    }

    pub fn detect() -> Self {
        use std::io::IsTerminal;
        if std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none() {
            Self::ansi()
        } else {
            Self::plain()
        }
    }
}

pub fn render_markdown(text: &str, style: Style) -> String {
    let mut out = String::new();
    let mut in_code = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if let Some(lang) = trimmed.strip_prefix("```") {
            if in_code {
                out.push_str(&format!("{}└──{}\n", style.dim, style.reset));
            } else {
                let lang = if lang.trim().is_empty() { "code" } else { lang.trim() };
                out.push_str(&format!("{}┌── {}{}\n", style.dim, lang, style.reset));
            }
            in_code = !in_code;
            continue;
        }

        if in_code {
            // Keep indentation inside code
            out.push_str(&format!("{}│{} {}{}{}\n", style.dim, style.reset, style.code, line, style.reset));
            continue;
        }

        if trimmed.is_empty() {
            out.push('\n');
            continue;
        }

        let heading = ["#### ", "### ", "## ", "# "]
            .iter()
            .find_map(|p| trimmed.strip_prefix(p));
        if let Some(rest) = heading {
            out.push_str(&format!("{}{}{}\n", style.bold, render_inline(rest, style), style.reset));
            continue;
        }

        let bullet = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* "));
        if let Some(rest) = bullet {
            out.push_str(&format!("  • {}\n", render_inline(rest, style)));
            continue;
        }

        out.push_str(&render_inline(trimmed, style));
        out.push('\n');
    }

    // Unterminated fence
    if in_code {
        out.push_str(&format!("{}└──{}\n", style.dim, style.reset));
    }
    out
}

/// Render a single line with inline formatting: **bold**, `code`, [links](url).
fn render_inline(text: &str, style: Style) -> String {
    let mut out = String::new();
    let mut remaining = text;

    while let Some((pos, kind)) = find_next_marker(remaining) {
        out.push_str(&remaining[..pos]);
        match kind {
            MarkerKind::Bold => {
                remaining = &remaining[pos + 2..];
                match remaining.find("**") {
                    Some(end) => {
                        out.push_str(&format!("{}{}{}", style.bold, &remaining[..end], style.reset));
                        remaining = &remaining[end + 2..];
                    }
                    None => {
                        out.push_str("**");
                    }
                }
            }
            MarkerKind::Code => {
                remaining = &remaining[pos + 1..];
                match remaining.find('`') {
                    Some(end) => {
                        out.push_str(&format!("{}{}{}", style.code, &remaining[..end], style.reset));
                        remaining = &remaining[end + 1..];
                    }
                    None => out.push('`'),
                }
            }
            MarkerKind::Link => {
                remaining = &remaining[pos + 1..];
                let close_bracket = remaining.find("](");
                let close_paren = close_bracket.and_then(|cb| remaining[cb + 2..].find(')').map(|cp| (cb, cb + 2 + cp)));
                match close_paren {
                    Some((cb, cp)) => {
                        let label = &remaining[..cb];
                        let url = &remaining[cb + 2..cp];
                        out.push_str(&format!("{}{}{} ({})", style.underline, label, style.reset, url));
                        remaining = &remaining[cp + 1..];
                    }
                    None => out.push('['),
                }
            }
        }
    }
    out.push_str(remaining);
    out
}

#[derive(Debug)]
enum MarkerKind {
    Bold,
    Code,
    Link,
}

fn find_next_marker(text: &str) -> Option<(usize, MarkerKind)> {
    let candidates = [
        text.find("**").map(|p| (p, MarkerKind::Bold)),
        text.find('`').map(|p| (p, MarkerKind::Code)),
        // Only a link when followed by ]( somewhere
        text.find('[')
            .filter(|&p| text[p..].contains("]("))
            .map(|p| (p, MarkerKind::Link)),
    ];
    candidates.into_iter().flatten().min_by_key(|(p, _)| *p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> String {
        render_markdown(text, Style::plain())
    }

    #[test]
    fn test_headings_and_bullets() {
        assert_eq!(plain("## Title\n- one\n* two"), "Title\n  • one\n  • two\n");
    }

    #[test]
    fn test_inline_markers() {
        assert_eq!(plain("use **this** and `that`"), "use this and that\n");
        assert_eq!(
            plain("see [docs](https://x.example) now"),
            "see docs (https://x.example) now\n"
        );
    }

    #[test]
    fn test_unclosed_markers_kept() {
        assert_eq!(plain("a ** b"), "a ** b\n");
        assert_eq!(plain("tick ` only"), "tick ` only\n");
        assert_eq!(plain("[not a link] (x)"), "[not a link] (x)\n");
    }

    #[test]
    fn test_code_block_labelled() {
        let out = plain("```rust\nfn main() {\n    **x**\n}\n```\nafter");
        assert_eq!(
            out,
            "┌── rust\n│ fn main() {\n│     **x**\n│ }\n└──\nafter\n"
        );
        assert!(plain("```\nx").starts_with("┌── code\n"));
        assert!(plain("```\nx").ends_with("└──\n"));
    }

    #[test]
    fn test_ansi_bold() {
        let out = render_markdown("**hi**", Style::ansi());
        assert_eq!(out, format!("{}hi{}\n", BOLD, RESET));
    }
}
