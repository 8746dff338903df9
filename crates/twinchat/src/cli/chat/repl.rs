use crate::cli::chat::commands::{Action, CliCommand, parse_command_line};
use crate::cli::chat::compl::Repl;
use crate::cli::status::TROUBLESHOOTING;
use crate::cli::ux::{
    ChatMessageType, GenerationSpinner, format_footer, format_prompt, format_turn,
    style_chat_text,
};
use crate::svc::chat::Chat;
use anyhow::Result;
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Editor};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, warn};
use twinchat_core::get_data_dir;
use twinchat_core::model::ModelProvider;
use twinchat_core::session::Outcome;

fn history_path() -> Option<PathBuf> {
    get_data_dir().ok().map(|dir| dir.join("history.txt"))
}

/// Runs the read-eval-print loop until the user exits.
pub async fn run(mut chat: Chat<'_>) -> Result<()> {
    println!(
        "Welcome to twinchat! Chatting with {} on {}. Type '/help' for commands, '/q' to exit.",
        chat.model_display_name(),
        chat.provider().as_str()
    );

    let config = rustyline::Config::builder()
        .history_ignore_dups(true)?
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let model_names = chat
        .available_model_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let mut rl: Editor<Repl, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(Repl::new(model_names)));

    let history = history_path();
    if let Some(path) = &history {
        if let Err(e) = rl.load_history(path) {
            debug!("No REPL history loaded from {}: {e}", path.display());
        }
    }

    let result = repl_loop(&mut chat, &mut rl).await;

    if let Some(path) = &history {
        if let Err(e) = rl.save_history(path) {
            warn!("Failed to save REPL history to {}: {e}", path.display());
        }
    }
    result
}

async fn repl_loop(chat: &mut Chat<'_>, rl: &mut Editor<Repl, DefaultHistory>) -> Result<()> {
    loop {
        let prompt = format_prompt(chat.provider().as_str(), chat.model_key());
        match rl.readline(&prompt) {
            Ok(line) => {
                rl.add_history_entry(&line)?;
                if process_line(chat, &line).await? == Action::Exit {
                    return Ok(());
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Type /quit to exit.");
            }
            Err(ReadlineError::Eof) => {
                println!("\nBye!");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Handles one line of user input: a `/` command or a message for the model.
async fn process_line(chat: &mut Chat<'_>, line: &str) -> Result<Action> {
    let trimmed_line = line.trim();
    if trimmed_line.is_empty() {
        return Ok(Action::Continue);
    }

    if !trimmed_line.starts_with('/') {
        process_message(chat, trimmed_line).await;
        return Ok(Action::Continue);
    }

    match CliCommand::try_parse_from(parse_command_line(trimmed_line)) {
        Ok(cli_command) => match cli_command.command.execute(chat).await? {
            Action::Submit(question) => {
                println!("{}", style_chat_text(&question, ChatMessageType::User));
                process_message(chat, &question).await;
                Ok(Action::Continue)
            }
            action => Ok(action),
        },
        Err(e) => {
            e.print()?;
            Ok(Action::Continue)
        }
    }
}

/// Sends `input` to the model and prints the reply, or the inline error when there is none.
async fn process_message(chat: &mut Chat<'_>, input: &str) -> Outcome {
    let spinner = GenerationSpinner::new("Thinking...".to_string());
    let start = Instant::now();
    let outcome = chat.submit(input).await;
    spinner.clear();

    match &outcome {
        Outcome::Appended => {
            if let Some(turn) = chat.session().last_assistant_turn() {
                println!("\n{}", format_turn(turn));
            }
            println!("\n{}", format_footer(start.elapsed(), chat.session()));
        }
        Outcome::Dropped(message) => {
            let error = format!("Error: {message}");
            eprintln!("{}", style_chat_text(&error, ChatMessageType::Error));
            if let Some(help) = failure_help(chat.provider()) {
                eprintln!("{help}");
            }
        }
    }
    outcome
}

/// Extra guidance printed after a failed request.
fn failure_help(provider: ModelProvider) -> Option<&'static str> {
    match provider {
        ModelProvider::Ollama => Some(TROUBLESHOOTING),
        ModelProvider::Gemini => None,
    }
}
