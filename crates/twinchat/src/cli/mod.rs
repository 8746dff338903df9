//! twinchat cli definition and entrypoint.
mod chat;
mod status;
pub mod ux;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use twinchat_core::config::get_config;
use twinchat_core::model::ModelProvider;
use twinchat_core::provider::ollama;

use crate::log::setup_logging;

/// twinchat - chat with a hosted or a local large language model.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show verbose logs.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Chat with the hosted Gemini API.
    Gemini {
        /// Model to use for chat, must be a gemini model defined in the config.
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Chat with a model served by a local Ollama server.
    Ollama {
        /// Model to use for chat, must be an ollama model defined in the config.
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Check the connection to the local Ollama server.
    Status,
}

/// Runs the main CLI application.
pub async fn run_app() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        setup_logging().context("Failed to set up logging")?;
    }

    let config = get_config(None).context("Failed to load configuration")?;

    match cli.command {
        Commands::Gemini { model } => chat::execute(ModelProvider::Gemini, model, &config).await,
        Commands::Ollama { model } => chat::execute(ModelProvider::Ollama, model, &config).await,
        Commands::Status => {
            let base_url = config
                .ollama
                .model
                .get_setting::<String>("base_url")
                .unwrap_or_else(|| ollama::DEFAULT_BASE_URL.to_string());
            status::execute(&base_url).await
        }
    }
}
