use crate::svc::chat::Chat;
use anyhow::{Context, Result};
use twinchat_core::config::Config;
use twinchat_core::model::ModelProvider;

mod commands;
mod compl;
mod repl;

/// Starts an interactive REPL session against `provider`.
pub async fn execute(
    provider: ModelProvider,
    model: Option<String>,
    config: &Config,
) -> Result<()> {
    let chat = Chat::new(config, provider, model).context("Failed to initialize chat service")?;
    repl::run(chat).await
}
