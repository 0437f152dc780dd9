//! Slash command parsing. Anything that is not a command is a message.

use anyhow::{anyhow, bail, Result};
use services::PromptCategory;
use shared::CognitiveState;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    New,
    Chats,
    Open(String),
    Delete(String),
    /// Persona id, or free text used as a custom instruction
    Persona(String),
    Personas,
    Lens(CognitiveState),
    /// `None` switches back to automatic routing
    Model(Option<String>),
    Models,
    Download(String),
    Cancel(String),
    Remove(String),
    Export(String),
    Attach(PathBuf),
    Detach,
    Prompts {
        category: Option<PromptCategory>,
        query: String,
    },
    Use {
        prompt_id: String,
        params: HashMap<String, String>,
    },
    Analyze {
        message_id: String,
        lens: CognitiveState,
    },
    Search(String),
    Lang(Option<String>),
    Help,
    Quit,
    Message(String),
}

pub const HELP: &str = "\
Commands:
  /new                         start a new chat
  /chats                       list chats
  /open <id>                   open a chat (id prefix is enough)
  /delete <id>                 delete a chat
  /persona <id|text>           pick a persona, or set a custom instruction
  /personas                    list personas
  /lens <focused|creative|critical|synthetic>
  /model <id|auto>             pin a model or go back to auto routing
  /models                      list models and offline status
  /download <id>  /cancel <id>  /remove <id>  /export <id>
  /attach <path>  /detach      attach a file to the next message
  /prompts [category] [query]  browse the prompt library
  /use <prompt-id> key=value   send a filled prompt template
  /analyze <message-id> <lens> re-read a reply through a lens
  /search <query>              search all chats
  /lang [code]                 show or set the response language
  /help  /quit";

pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    let Some(body) = line.strip_prefix('/') else {
        return Ok(Command::Message(line.to_string()));
    };
    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };
    let required = |what: &str| -> Result<String> {
        if rest.is_empty() {
            Err(anyhow!("Usage: /{} <{}>", name, what))
        } else {
            Ok(rest.to_string())
        }
    };

    let cmd = match name {
        "new" => Command::New,
        "chats" => Command::Chats,
        "open" => Command::Open(required("id")?),
        "delete" => Command::Delete(required("id")?),
        "persona" => Command::Persona(required("id|text")?),
        "personas" => Command::Personas,
        "lens" => Command::Lens(required("state")?.parse()?),
        "model" => match required("id|auto")?.as_str() {
            "auto" => Command::Model(None),
            id => Command::Model(Some(id.to_string())),
        },
        "models" => Command::Models,
        "download" => Command::Download(required("model-id")?),
        "cancel" => Command::Cancel(required("model-id")?),
        "remove" => Command::Remove(required("model-id")?),
        "export" => Command::Export(required("model-id")?),
        "attach" => Command::Attach(PathBuf::from(required("path")?)),
        "detach" => Command::Detach,
        "prompts" => parse_prompts(rest),
        "use" => {
            let (prompt_id, args) = match required("prompt-id")?.split_once(char::is_whitespace) {
                Some((id, args)) => (id.to_string(), parse_params(args)?),
                None => (rest.to_string(), HashMap::new()),
            };
            Command::Use { prompt_id, params: args }
        }
        "analyze" => {
            let mut parts = rest.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(id), Some(lens)) => Command::Analyze {
                    message_id: id.to_string(),
                    lens: lens.parse()?,
                },
                _ => bail!("Usage: /analyze <message-id> <lens>"),
            }
        }
        "search" => Command::Search(required("query")?),
        "lang" => Command::Lang((!rest.is_empty()).then(|| rest.to_string())),
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("Unknown command /{} (try /help)", other),
    };
    Ok(cmd)
}

/// `[category] [query...]`, where the first word counts as a category only
/// when it names one
fn parse_prompts(rest: &str) -> Command {
    let (first, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    match first.parse::<PromptCategory>() {
        Ok(category) if !first.is_empty() => Command::Prompts {
            category: Some(category),
            query: tail.trim().to_string(),
        },
        _ => Command::Prompts {
            category: None,
            query: rest.to_string(),
        },
    }
}

/// `key=value` pairs; words without `=` continue the previous value
fn parse_params(args: &str) -> Result<HashMap<String, String>> {
    let mut params = HashMap::new();
    let mut current: Option<String> = None;
    for word in args.split_whitespace() {
        match word.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                params.insert(key.to_string(), value.to_string());
                current = Some(key.to_string());
            }
            _ => {
                let key = current
                    .as_ref()
                    .ok_or_else(|| anyhow!("Expected key=value, got '{}'", word))?;
                if let Some(value) = params.get_mut(key) {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(word);
                }
            }
        }
    }
    Ok(params)
}
