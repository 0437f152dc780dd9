//! Built-in prompt templates with category filter and search.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use strsim::jaro_winkler;

/// Word similarity needed for a fuzzy hit when no substring matches
const FUZZY_THRESHOLD: f64 = 0.88;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptCategory {
    Productivity,
    Creative,
    Marketing,
    Technology,
    HumanResources,
}

impl PromptCategory {
    pub const ALL: [PromptCategory; 5] = [
        PromptCategory::Productivity,
        PromptCategory::Creative,
        PromptCategory::Marketing,
        PromptCategory::Technology,
        PromptCategory::HumanResources,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptCategory::Productivity => "productivity",
            PromptCategory::Creative => "creative",
            PromptCategory::Marketing => "marketing",
            PromptCategory::Technology => "technology",
            PromptCategory::HumanResources => "human_resources",
        }
    }
}

impl fmt::Display for PromptCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        PromptCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s || (s == "hr" && *c == PromptCategory::HumanResources))
            .ok_or_else(|| format!("Unknown prompt category: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub id: &'static str,
    pub category: PromptCategory,
    pub title: &'static str,
    pub description: &'static str,
    /// Body with `{{param}}` placeholders
    pub template: &'static str,
}

impl PromptTemplate {
    /// Placeholder names in order of first appearance
    pub fn params(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        let mut rest = self.template;
        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else { break };
            let name = &after[..end];
            if !out.contains(&name) {
                out.push(name);
            }
            rest = &after[end + 2..];
        }
        out
    }

    pub fn fill(&self, params: &HashMap<String, String>) -> String {
        fill(self.template, params)
    }
}

/// Replace every `{{key}}` in one pass over `template`; unknown
/// placeholders are left in place and substituted values are not rescanned.
pub fn fill(template: &str, params: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        match params.get(&after[..end]) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

pub static PROMPT_LIBRARY: &[PromptTemplate] = &[
    PromptTemplate {
        id: "email-professional",
        category: PromptCategory::Productivity,
        title: "Professional email",
        description: "Draft a clear, polite email for work",
        template: "Write a professional email to {{recipient}} about {{topic}}. Keep it concise and courteous, and end with a clear next step.",
    },
    PromptTemplate {
        id: "summarize-text",
        category: PromptCategory::Productivity,
        title: "Summarize text",
        description: "Condense a long passage into key points",
        template: "Summarize the following text into five bullet points, then give a one-sentence takeaway:\n\n{{text}}",
    },
    PromptTemplate {
        id: "brainstorm-ideas",
        category: PromptCategory::Productivity,
        title: "Brainstorm ideas",
        description: "Generate a list of fresh ideas on any subject",
        template: "Brainstorm ten distinct ideas for {{subject}}. For each, add one line on why it could work.",
    },
    PromptTemplate {
        id: "social-media-post",
        category: PromptCategory::Marketing,
        title: "Social media post",
        description: "Create an engaging post for a product or event",
        template: "Write an engaging {{platform}} post announcing {{product}}. Include a hook, two benefits and a call to action.",
    },
    PromptTemplate {
        id: "blog-post-outline",
        category: PromptCategory::Marketing,
        title: "Blog post outline",
        description: "Structure a blog post with headings and key points",
        template: "Create a detailed outline for a blog post titled \"{{title}}\" with an introduction, four sections and a conclusion.",
    },
    PromptTemplate {
        id: "ad-copy",
        category: PromptCategory::Marketing,
        title: "Ad copy",
        description: "Persuasive advertising copy in three variants",
        template: "Write three variants of ad copy for {{product}} aimed at {{audience}}. Keep each under 40 words.",
    },
    PromptTemplate {
        id: "explain-code",
        category: PromptCategory::Technology,
        title: "Explain code",
        description: "Walk through what a piece of code does",
        template: "Explain what this code does, step by step, and point out any bugs or risks:\n\n```\n{{code}}\n```",
    },
    PromptTemplate {
        id: "write-sql-query",
        category: PromptCategory::Technology,
        title: "Write SQL query",
        description: "Turn a plain-language question into SQL",
        template: "Write a SQL query that answers: {{question}}. The relevant tables are: {{schema}}. Explain the query briefly.",
    },
    PromptTemplate {
        id: "regex-generator",
        category: PromptCategory::Technology,
        title: "Regex generator",
        description: "Build a regular expression from a description",
        template: "Write a regular expression that matches {{description}}. Show three matching and three non-matching examples.",
    },
    PromptTemplate {
        id: "job-description",
        category: PromptCategory::HumanResources,
        title: "Job description",
        description: "Draft an inclusive job posting",
        template: "Write an inclusive job description for a {{role}} at {{company}}, covering responsibilities, requirements and benefits.",
    },
    PromptTemplate {
        id: "interview-questions",
        category: PromptCategory::HumanResources,
        title: "Interview questions",
        description: "Behavioral and technical questions for a role",
        template: "Suggest ten interview questions for a {{role}} candidate: five behavioral and five technical, with what a strong answer covers.",
    },
];

pub fn find(id: &str) -> Option<&'static PromptTemplate> {
    PROMPT_LIBRARY.iter().find(|p| p.id == id)
}

/// Templates in `category` (all when `None`) matching `query`.
///
/// Substring match on title and description first; when nothing matches,
/// fall back to fuzzy word similarity so small typos still find results.
pub fn filter(category: Option<PromptCategory>, query: &str) -> Vec<&'static PromptTemplate> {
    let in_category: Vec<&'static PromptTemplate> = PROMPT_LIBRARY
        .iter()
        .filter(|p| category.map_or(true, |c| p.category == c))
        .collect();

    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return in_category;
    }

    let exact: Vec<_> = in_category
        .iter()
        .copied()
        .filter(|p| {
            p.title.to_lowercase().contains(&query) || p.description.to_lowercase().contains(&query)
        })
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    in_category
        .into_iter()
        .filter(|p| {
            let haystack = format!("{} {}", p.title, p.description).to_lowercase();
            query.split_whitespace().all(|q| {
                haystack
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|word| jaro_winkler(q, word) >= FUZZY_THRESHOLD)
            })
        })
        .collect()
}
