mod commands;
mod config;
mod render;
mod repl;
mod utils;

use agent_host::AgentHost;
use anyhow::{Context, Result};
use providers::GeminiClient;
use services::{ChatStore, ModelManager};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let settings = config::load_settings();
    let data_dir = config::data_dir(&settings)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let backend = GeminiClient::from_settings(&settings.gemini)
        .context("Gemini is not configured; add an api_key to settings.json or set GEMINI_API_KEY")?;
    let store = ChatStore::load(&data_dir);
    let models = ModelManager::load(&data_dir);

    let host = AgentHost::new(settings, store, Arc::new(backend));
    let mut repl = repl::Repl::new(host, models, data_dir, render::Style::detect());
    repl.run().await
}
