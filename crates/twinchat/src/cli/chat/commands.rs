use crate::cli::status;
use crate::cli::ux::{ChatMessageType, format_turn, style_chat_text};
use crate::svc::chat::Chat;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::str::FromStr;
use twinchat_core::generation::{SafetyCategory, SafetyThreshold};
use twinchat_core::model::ModelProvider;

const HOSTED_QUESTIONS: [&str; 6] = [
    "Explain quantum computing simply",
    "Write Python code for Fibonacci",
    "Best practices for mental health",
    "Summarize the benefits of AI",
    "How to learn programming fast",
    "Tell me a motivational story",
];

const LOCAL_QUESTIONS: [&str; 4] = [
    "Explain quantum computing simply",
    "Write a Python function for factorial",
    "What is machine learning?",
    "Tell me a short story",
];

/// Canned questions offered by `/examples` for each backend.
pub fn quick_questions(provider: ModelProvider) -> &'static [&'static str] {
    match provider {
        ModelProvider::Gemini => &HOSTED_QUESTIONS,
        ModelProvider::Ollama => &LOCAL_QUESTIONS,
    }
}

/// Generation parameters accepted by `/set`.
pub const PARAMETER_NAMES: [&str; 4] = ["temperature", "max_tokens", "top_p", "top_k"];

// -------------
// REPL commands
// -------------
#[derive(Parser, Debug)]
#[command(multicall = true)]
pub struct CliCommand {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Clear chat history
    Clear,
    /// Show the whole conversation
    #[command(alias = "h")]
    History,
    /// Show message count and estimated tokens
    Stats,
    /// Set a generation parameter: temperature, max_tokens, top_p or top_k
    Set {
        /// Parameter name
        param: String,
        /// New value
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Show or change safety thresholds.
    ///
    /// With no arguments, shows the threshold of every category.
    Safety {
        /// Category: harassment, hate_speech, sexual or dangerous
        category: Option<String>,
        /// Threshold: block_none, block_low_and_above or block_medium_and_above
        threshold: Option<String>,
    },
    /// Show the current generation settings
    Config,
    /// Manage chat models.
    ///
    /// With no arguments, shows the current model and available models.
    #[command(alias = "m")]
    Model {
        /// Model name to switch to
        name: Option<String>,
    },
    /// List example questions, or ask the one at INDEX
    #[command(alias = "ex")]
    Examples {
        /// 1-based position in the list
        index: Option<usize>,
    },
    /// Check the connection to the local model server
    Status,
    /// Exit the chat session
    #[command(alias = "q", alias = "quit")]
    Exit,
}

/// What the REPL should do after a command ran.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Continue,
    /// Send this text as if the user typed it.
    Submit(String),
    Exit,
}

fn print_error(message: &str) {
    eprintln!("{}", style_chat_text(message, ChatMessageType::Error));
}

impl Command {
    /// Executes a REPL command.
    pub async fn execute(self, chat: &mut Chat<'_>) -> Result<Action> {
        match self {
            Command::Clear => Ok(execute_clear(chat)),
            Command::History => Ok(execute_history(chat)),
            Command::Stats => Ok(execute_stats(chat)),
            Command::Set { param, value } => Ok(execute_set(chat, &param, &value)),
            Command::Safety {
                category,
                threshold,
            } => Ok(execute_safety(chat, category.as_deref(), threshold.as_deref())),
            Command::Config => execute_config(chat),
            Command::Model { name } => Ok(execute_model(chat, name.as_deref())),
            Command::Examples { index } => Ok(execute_examples(chat, index)),
            Command::Status => {
                status::execute(&chat.local_base_url()).await?;
                Ok(Action::Continue)
            }
            Command::Exit => {
                println!("Bye!");
                Ok(Action::Exit)
            }
        }
    }
}

fn execute_clear(chat: &mut Chat<'_>) -> Action {
    chat.clear_messages();
    println!("Chat history cleared");
    Action::Continue
}

fn execute_history(chat: &Chat<'_>) -> Action {
    let history = chat.session().history();
    if history.is_empty() {
        println!("No messages yet.");
    }
    for turn in history {
        println!("{}\n", format_turn(turn));
    }
    Action::Continue
}

/// `/stats` output lines.
pub fn format_stats(chat: &Chat<'_>) -> String {
    let session = chat.session();
    let mut out = format!(
        "Total messages: {}\nEstimated tokens: {}",
        session.message_count(),
        session.token_estimate()
    );
    let unanswered = session.unpaired_user_turns();
    if unanswered > 0 {
        out.push_str(&format!("\nUnanswered messages: {unanswered}"));
    }
    out
}

fn execute_stats(chat: &Chat<'_>) -> Action {
    println!("{}", format_stats(chat));
    Action::Continue
}

fn execute_set(chat: &mut Chat<'_>, param: &str, value: &str) -> Action {
    match chat.generation_mut().set(param, value) {
        Ok(()) => println!("{param} set to {value}"),
        Err(e) => print_error(&format!("Error updating settings: {e}")),
    }
    Action::Continue
}

/// `/safety` listing, one `CATEGORY: THRESHOLD` per line.
pub fn format_safety(chat: &Chat<'_>) -> String {
    SafetyCategory::ALL
        .iter()
        .map(|c| format!("{c}: {}", chat.generation().safety_threshold(*c)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn execute_safety(chat: &mut Chat<'_>, category: Option<&str>, threshold: Option<&str>) -> Action {
    if chat.provider() != ModelProvider::Gemini {
        println!(
            "{}",
            style_chat_text(
                "Safety settings only apply to the hosted backend.",
                ChatMessageType::Warning
            )
        );
    }

    let Some(category) = category else {
        println!("{}", format_safety(chat));
        return Action::Continue;
    };

    let category = match SafetyCategory::from_str(category) {
        Ok(c) => c,
        Err(e) => {
            print_error(&format!("{e}"));
            return Action::Continue;
        }
    };

    match threshold.map(SafetyThreshold::from_str) {
        None => println!("{category}: {}", chat.generation().safety_threshold(category)),
        Some(Ok(threshold)) => {
            chat.generation_mut().set_safety(category, threshold);
            println!("{category} set to {threshold}");
        }
        Some(Err(e)) => print_error(&format!("{e}")),
    }
    Action::Continue
}

fn execute_config(chat: &Chat<'_>) -> Result<Action> {
    let yaml = serde_yaml::to_string(chat.generation())?;
    print!("{yaml}"); // `to_string` includes a newline
    Ok(Action::Continue)
}

fn execute_model(chat: &mut Chat<'_>, name: Option<&str>) -> Action {
    match name {
        Some(name) => match chat.set_model(name) {
            Ok(()) => println!("Model switched to: {name}"),
            Err(e) => print_error(&format!("Error switching model: {e:#}")),
        },
        None => {
            println!(
                "Current model: {} ({})",
                chat.model_key(),
                chat.model_display_name()
            );
            let model_names = chat.available_model_names();
            if !model_names.is_empty() {
                println!("Available models: {}", model_names.join(", "));
            }
        }
    }
    Action::Continue
}

fn execute_examples(chat: &Chat<'_>, index: Option<usize>) -> Action {
    let questions = quick_questions(chat.provider());
    match index {
        None => {
            for (i, question) in questions.iter().enumerate() {
                println!("{}. {question}", i + 1);
            }
            Action::Continue
        }
        Some(i) => match i.checked_sub(1).and_then(|i| questions.get(i)) {
            Some(question) => Action::Submit(question.to_string()),
            None => {
                print_error(&format!(
                    "No example {i}, choose between 1 and {}",
                    questions.len()
                ));
                Action::Continue
            }
        },
    }
}

/// Splits a command line into arguments, honouring shell quoting where possible.
pub fn parse_command_line(line: &str) -> Vec<String> {
    let trimmed_line = line.trim();
    // Unbalanced quotes fall back to plain whitespace splitting
    shlex::split(trimmed_line).unwrap_or_else(|| {
        trimmed_line
            .split_whitespace()
            .map(|s| s.to_string())
            .collect()
    })
}
