use crate::cli::chat::commands::{CliCommand, PARAMETER_NAMES};
use crate::cli::ux::{ChatMessageType, style_chat_text};
use clap::CommandFactory;
use rustyline::completion::{Candidate, Completer};
use rustyline::error::ReadlineError;
use rustyline::hint::Hinter;
use rustyline::{Helper, Highlighter, Validator};
use twinchat_core::generation::{SafetyCategory, SafetyThreshold};

/// Completion candidate for the REPL.
#[derive(Debug)]
pub struct CompletionCandidate {
    text: String,
    display_string: String,
}

impl CompletionCandidate {
    pub fn new(text: &str) -> Self {
        let display_string = style_chat_text(text, ChatMessageType::Footer).to_string();
        Self {
            text: text.to_owned(),
            display_string,
        }
    }
}

impl Candidate for CompletionCandidate {
    fn display(&self) -> &str {
        &self.display_string
    }

    fn replacement(&self) -> &str {
        &self.text
    }
}

/// REPL runtime state for command line editing.
#[derive(Helper, Validator, Highlighter)]
pub struct Repl {
    pub command_names: Vec<String>,
    pub model_names: Vec<String>,
}

impl Repl {
    pub fn new(model_names: Vec<String>) -> Self {
        let command_names = CliCommand::command()
            .get_subcommands()
            .flat_map(|c| c.get_name_and_visible_aliases())
            .map(|s| format!("/{s}"))
            .collect();
        Self {
            command_names,
            model_names,
        }
    }
}

impl Completer for Repl {
    type Candidate = CompletionCandidate;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> Result<(usize, Vec<Self::Candidate>), ReadlineError> {
        let line_to_pos = &line[..pos];
        if !line_to_pos.starts_with('/') {
            return Ok((0, Vec::new()));
        }

        let Some((command, _)) = line_to_pos.split_once(' ') else {
            let candidates = self
                .command_names
                .iter()
                .filter(|name| name.starts_with(line_to_pos))
                .map(|name| CompletionCandidate::new(name))
                .collect();
            return Ok((0, candidates));
        };

        let cli = CliCommand::command();
        let Some(subcommand) = cli.find_subcommand(command.trim_start_matches('/')) else {
            return Ok((0, Vec::new()));
        };

        // Position of the argument under the cursor, 1 for the first one
        let arg_index = line_to_pos.split(' ').filter(|s| !s.is_empty()).count()
            + usize::from(line_to_pos.ends_with(' '))
            - 1;

        match (subcommand.get_name(), arg_index) {
            ("model", 1) => Ok(word_compl(line_to_pos, &self.model_names)),
            ("set", 1) => Ok(word_compl(line_to_pos, &PARAMETER_NAMES)),
            ("safety", 1) => {
                let names = SafetyCategory::ALL.map(|c| c.as_str().to_lowercase());
                Ok(word_compl(line_to_pos, &names))
            }
            ("safety", 2) => {
                let names = SafetyThreshold::ALL.map(|t| t.as_str().to_lowercase());
                Ok(word_compl(line_to_pos, &names))
            }
            _ => Ok((0, Vec::new())),
        }
    }
}

impl Hinter for Repl {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if line.is_empty() || pos < line.len() || !line.starts_with('/') {
            return None;
        }
        self.command_names
            .iter()
            .find(|&cmd_name| cmd_name.starts_with(line))
            .map(|cmd_name| cmd_name[line.len()..].into())
    }
}

/// Completes the word ending at the end of `line_to_pos` from `names`.
fn word_compl<S: AsRef<str>>(line_to_pos: &str, names: &[S]) -> (usize, Vec<CompletionCandidate>) {
    let prefix_start = line_to_pos.rfind(' ').map_or(0, |p| p + 1);
    let prefix = &line_to_pos[prefix_start..];
    let candidates = names
        .iter()
        .map(|name| name.as_ref())
        .filter(|name| name.starts_with(prefix))
        .map(CompletionCandidate::new)
        .collect();
    (prefix_start, candidates)
}
