//! Interactive terminal loop: reads lines, runs commands, prints replies.

use crate::commands::{parse_command, Command, HELP};
use crate::render::{render_markdown, Style};
use crate::utils::{load_attachment, save_attachment};
use agent_host::{cognitive, languages, personas, AgentHost, SendOutcome};
use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use services::{prompt_library, ModelManager, ModelStatus};
use shared::agent_api::StreamChunk;
use shared::catalog;
use shared::{Attachment, ChatMessage, CognitiveState, Sender};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc::unbounded_channel;

const SHORT_ID: usize = 8;

enum Turn {
    Send {
        text: String,
        attachment: Option<Attachment>,
    },
    Analyze {
        message_id: String,
        lens: CognitiveState,
    },
}

pub struct Repl {
    host: AgentHost,
    models: ModelManager,
    data_dir: PathBuf,
    pending: Option<Attachment>,
    style: Style,
}

impl Repl {
    pub fn new(host: AgentHost, models: ModelManager, data_dir: PathBuf, style: Style) -> Self {
        Self {
            host,
            models,
            data_dir,
            pending: None,
            style,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("{}", self.style.bold("Bhargava GPT"));
        println!("{}", self.style.dim("Type a message, or /help for commands."));
        if let Some(chat) = self.host.active_chat() {
            println!("{}", self.style.dim(&format!("Resuming \"{}\"", chat.title)));
        }

        let history_path = self.data_dir.join("history.txt");
        let mut rl = DefaultEditor::new().context("cannot open the terminal for input")?;
        let _ = rl.load_history(&history_path);

        loop {
            let prompt = self.prompt_text();
            let line = match tokio::task::block_in_place(|| rl.readline(&prompt)) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read input");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let _ = rl.add_history_entry(line.as_str());
            let result = match parse_command(&line) {
                Ok(Command::Quit) => break,
                Ok(cmd) => self.execute(cmd).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                println!("{} {:#}", self.style.bold("Error:"), e);
            }
        }
        if let Err(e) = rl.save_history(&history_path) {
            tracing::warn!(error = %e, "Failed to save history");
        }
        println!();
        Ok(())
    }

    /// Persona icon, lens icon, pinned model and a clip when a file waits
    fn prompt_text(&self) -> String {
        let chat = self.host.active_chat();
        let persona = chat
            .and_then(|c| c.persona_id.as_deref())
            .and_then(personas::find_persona)
            .map(|p| p.icon)
            .unwrap_or(if chat.is_some() { "✏️" } else { "🤖" });
        let model = chat
            .and_then(|c| c.model_id.as_deref())
            .unwrap_or("auto");
        let attach = if self.pending.is_some() { " 📎" } else { "" };
        format!(
            "{} {} {}{} › ",
            persona,
            self.host.cognitive_state().icon(),
            self.style.dim(model),
            attach
        )
    }

    async fn execute(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::Message(text) => {
                let attachment = self.pending.take();
                self.run_turn(Turn::Send { text, attachment }).await?;
            }
            Command::New => {
                self.host.new_chat();
                println!("Started a new chat.");
            }
            Command::Chats => self.list_chats(),
            Command::Open(prefix) => {
                let id = self.resolve_chat(&prefix)?;
                self.host.select_chat(&id)?;
                self.print_history();
            }
            Command::Delete(prefix) => {
                let id = self.resolve_chat(&prefix)?;
                if self.host.delete_chat(&id) {
                    println!("Deleted chat {}.", short(&id));
                }
            }
            Command::Persona(arg) => {
                match personas::find_persona(&arg) {
                    Some(p) => {
                        self.host.set_persona(Some(p.id), None)?;
                        println!("{} Persona: {}", p.icon, p.name);
                    }
                    None => {
                        self.host.set_persona(None, Some(&arg))?;
                        println!("✏️ Custom instruction set.");
                    }
                }
            }
            Command::Personas => self.list_personas(),
            Command::Lens(state) => {
                self.host.set_cognitive_state(state);
                println!("{} Lens: {}", state.icon(), cognitive::label(state));
            }
            Command::Model(id) => {
                self.host.set_model(id.as_deref())?;
                match id {
                    Some(id) => println!("Pinned {}.", id),
                    None => println!("Automatic model routing."),
                }
            }
            Command::Models => self.list_models(),
            Command::Download(id) => {
                self.models.download(&id)?;
                println!("Downloading {} (see /models for progress).", id);
            }
            Command::Cancel(id) => {
                self.models.cancel(&id);
                println!("Canceling {}.", id);
            }
            Command::Remove(id) => {
                self.models.delete(&id)?;
                println!("Removed offline copy of {}.", id);
            }
            Command::Export(id) => {
                let model = catalog::find_model(&id).ok_or_else(|| anyhow!("Unknown model: {}", id))?;
                let dir = directories::UserDirs::new()
                    .and_then(|d| d.download_dir().map(|p| p.to_path_buf()))
                    .unwrap_or_else(|| self.data_dir.join("exports"));
                let path = self.models.export(model, &dir)?;
                println!("Exported to {}", path.display());
            }
            Command::Attach(path) => {
                let att = load_attachment(&path)?;
                println!(
                    "📎 {} ({}, {} KB) will be sent with your next message.",
                    att.name,
                    att.mime_type,
                    att.size_bytes().div_ceil(1024)
                );
                self.pending = Some(att);
            }
            Command::Detach => {
                if self.pending.take().is_some() {
                    println!("Attachment removed.");
                }
            }
            Command::Prompts { category, query } => {
                let found = prompt_library::filter(category, &query);
                if found.is_empty() {
                    println!("No prompts match.");
                }
                for p in found {
                    println!(
                        "{} {} {}\n    {}",
                        self.style.bold(p.id),
                        self.style.dim(&format!("[{}]", p.category)),
                        p.title,
                        p.description
                    );
                }
            }
            Command::Use { prompt_id, params } => {
                let template = prompt_library::find(&prompt_id)
                    .ok_or_else(|| anyhow!("Unknown prompt: {}", prompt_id))?;
                let missing: Vec<&str> = template
                    .params()
                    .into_iter()
                    .filter(|p| !params.contains_key(*p))
                    .collect();
                if !missing.is_empty() {
                    bail!(
                        "Missing values. Usage: /use {} {}",
                        prompt_id,
                        missing.iter().map(|p| format!("{}=...", p)).collect::<Vec<_>>().join(" ")
                    );
                }
                let text = template.fill(&params);
                let attachment = self.pending.take();
                self.run_turn(Turn::Send { text, attachment }).await?;
            }
            Command::Analyze { message_id, lens } => {
                let chat = self.host.active_chat().context("Open a chat first")?;
                let id = resolve_id(chat.messages.iter().map(|m| m.id.as_str()), &message_id)?;
                self.run_turn(Turn::Analyze { message_id: id, lens }).await?;
            }
            Command::Search(query) => {
                let results = self.host.store().search(&query);
                if results.is_empty() {
                    println!("No matches.");
                }
                for r in results {
                    println!(
                        "{} {} {}\n    ...{}...",
                        self.style.bold(short(&r.chat_id)),
                        r.chat_title,
                        self.style.dim(&r.date.with_timezone(&Local).format("%Y-%m-%d").to_string()),
                        r.snippet
                    );
                }
            }
            Command::Lang(None) => {
                let current = self.host.language().to_string();
                for (code, name) in languages::LANGUAGES {
                    let marker = if *code == current { "*" } else { " " };
                    println!("{} {:<6} {}", marker, code, name);
                }
            }
            Command::Lang(Some(code)) => {
                self.host.set_language(&code)?;
                println!("Responses will be in {}.", languages::language_name(&code));
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => {}
        }
        Ok(())
    }

    /// Send one request, printing lens progress until the reply starts.
    async fn run_turn(&mut self, turn: Turn) -> Result<()> {
        let lens = match &turn {
            Turn::Analyze { lens, .. } => *lens,
            Turn::Send { .. } => self.host.cognitive_state(),
        };
        let flow = tokio::spawn(show_flow(cognitive::flow_steps(lens), self.style));

        let (outcome, streamed) = if self.host.settings.stream {
            let (tx, mut rx) = unbounded_channel();
            let flow_abort = flow.abort_handle();
            let style = self.style;
            let printer = tokio::spawn(async move {
                let mut streamed = false;
                while let Some(chunk) = rx.recv().await {
                    flow_abort.abort();
                    match chunk {
                        StreamChunk::Text(t) => {
                            if !streamed {
                                println!();
                                streamed = true;
                            }
                            print!("{}", t);
                            let _ = std::io::stdout().flush();
                        }
                        StreamChunk::Image(img) => println!("\n{}", style.dim(&format!("[image: {}]", img.name))),
                        StreamChunk::Done { .. } => println!(),
                        StreamChunk::Error(e) => println!("\n{}", style.dim(&format!("[stream error: {}]", e))),
                    }
                }
                streamed
            });
            let result = self.dispatch(turn, Some(&tx)).await;
            drop(tx);
            let streamed = printer.await.unwrap_or(false);
            (result, streamed)
        } else {
            (self.dispatch(turn, None).await, false)
        };
        flow.abort();
        let outcome = outcome?;

        if outcome.reply.is_error || !streamed {
            println!();
            self.print_message(&outcome.reply);
        }
        if let Some(img) = &outcome.reply.attachment {
            match save_attachment(img, &self.data_dir.join("images")) {
                Ok(path) => println!("🖼  Saved {}", path.display()),
                Err(e) => tracing::error!("Failed to save generated image: {:#}", e),
            }
        }
        println!(
            "{}",
            self.style.dim(&format!("via {} · {}", outcome.model_id, short(&outcome.reply.id)))
        );
        Ok(())
    }

    async fn dispatch(
        &mut self,
        turn: Turn,
        tx: Option<&tokio::sync::mpsc::UnboundedSender<StreamChunk>>,
    ) -> Result<SendOutcome> {
        match turn {
            Turn::Send { text, attachment } => self.host.send_message(&text, attachment, tx).await,
            Turn::Analyze { message_id, lens } => self.host.analyze_message(&message_id, lens, tx).await,
        }
    }

    fn resolve_chat(&self, prefix: &str) -> Result<String> {
        let chats = self.host.store().list();
        resolve_id(chats.iter().map(|c| c.id.as_str()), prefix)
    }

    fn list_chats(&self) {
        let chats = self.host.store().list();
        if chats.is_empty() {
            println!("No chats yet.");
            return;
        }
        let active = self.host.active_chat().map(|c| c.id.as_str());
        for chat in chats {
            let marker = if Some(chat.id.as_str()) == active { "*" } else { " " };
            println!(
                "{} {} {} {}",
                marker,
                self.style.bold(short(&chat.id)),
                chat.title,
                self.style.dim(&format!(
                    "({} messages, {})",
                    chat.messages.len(),
                    chat.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                ))
            );
        }
    }

    fn list_personas(&self) {
        let current = self.host.active_chat().and_then(|c| c.persona_id.as_deref());
        for p in personas::PERSONAS {
            let marker = if Some(p.id) == current { "*" } else { " " };
            println!("{} {} {} {}", marker, p.icon, self.style.bold(p.id), p.description);
        }
    }

    fn list_models(&self) {
        let pinned = self.host.active_chat().and_then(|c| c.model_id.as_deref());
        for m in catalog::MODELS {
            let marker = if Some(m.id) == pinned { "*" } else { " " };
            let mut line = format!("{} {} {} ({})", marker, self.style.bold(m.id), m.name, m.provider);
            if m.is_downloadable {
                line.push_str(&format!(" [{}]", describe_status(&self.models, m.id)));
            }
            println!("{}", line);
        }
    }

    fn print_history(&self) {
        let Some(chat) = self.host.active_chat() else {
            return;
        };
        println!("{}", self.style.bold(&chat.title));
        for msg in &chat.messages {
            self.print_message(msg);
        }
    }

    fn print_message(&self, msg: &ChatMessage) {
        let who = match (msg.sender, msg.is_error) {
            (Sender::User, _) => "You",
            (Sender::Ai, true) => "⚠️ Bhargava",
            (Sender::Ai, false) => "Bhargava",
        };
        let mut header = format!("{} {}", self.style.bold(who), self.style.dim(short(&msg.id)));
        if let Some(link) = &msg.analysis {
            header.push_str(&self.style.dim(&format!(
                " {} analysis of {}",
                cognitive::label(link.lens),
                short(&link.source_message_id)
            )));
        }
        println!("{}", header);
        if let Some(att) = &msg.attachment {
            println!("{}", self.style.dim(&format!("📎 {} ({})", att.name, att.mime_type)));
        }
        print!("{}", render_markdown(&msg.text, self.style));
    }
}

fn short(id: &str) -> &str {
    id.get(..SHORT_ID).unwrap_or(id)
}

/// Full id for a unique prefix
fn resolve_id<'a>(ids: impl IntoIterator<Item = &'a str>, prefix: &str) -> Result<String> {
    let matches: Vec<&str> = ids.into_iter().filter(|id| id.starts_with(prefix)).collect();
    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        [] => bail!("Nothing matches id {}", prefix),
        _ => bail!("Id {} is ambiguous ({} matches)", prefix, matches.len()),
    }
}

fn describe_status(models: &ModelManager, id: &str) -> String {
    match models.status(id) {
        ModelStatus::Downloading => format!(
            "{} {}%",
            ModelStatus::Downloading.label(),
            models.progress(id).unwrap_or(0)
        ),
        ModelStatus::Error => format!("{}, retry with /download {}", ModelStatus::Error.label(), id),
        status => status.label().to_string(),
    }
}

async fn show_flow(steps: &'static [&'static str], style: Style) {
    let start = tokio::time::Instant::now();
    for (i, step) in steps.iter().enumerate() {
        tokio::time::sleep_until(start + cognitive::step_completion_delay(i)).await;
        println!("{}", style.dim(&format!("  ✓ {}", step)));
    }
}
