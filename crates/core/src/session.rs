//! A session is the in-memory conversation between a human and one model.
//!
//! The session owns the ordered history of turns and a running word based estimate of the
//! tokens spent. It is created by the caller of the chat loop and passed explicitly to request
//! handling; it never outlives the process.
use crate::completion::BackendResult;
use chrono::Local;

/// Assistant text recorded when the backend returned no candidates.
pub const EMPTY_RESPONSE_NOTICE: &str = "No response generated by the model";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl From<Role> for String {
    fn from(val: Role) -> Self {
        val.as_str().into()
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match &self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in the conversation. Turns are never mutated once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Local wall clock time, `HH:MM:SS`.
    pub timestamp: String,
    pub model_name: Option<String>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: now(),
            model_name: None,
        }
    }

    pub fn assistant(content: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: now(),
            model_name: Some(model_name.into()),
        }
    }
}

fn now() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Number of whitespace delimited words in `s`.
pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// What [`Session::record_result`] did with a backend result.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// An assistant turn was appended.
    Appended,
    /// Nothing was appended; the message is for inline display only.
    Dropped(String),
}

#[derive(Debug, Default)]
pub struct Session {
    history: Vec<Turn>,
    token_estimate: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a turn and adds its word count to the token estimate.
    pub fn append(&mut self, turn: Turn) {
        self.token_estimate += word_count(&turn.content);
        self.history.push(turn);
    }

    /// Empties the history and resets the token estimate.
    pub fn clear(&mut self) {
        self.history.clear();
        self.token_estimate = 0;
    }

    pub fn add_user_turn(&mut self, text: &str) {
        self.append(Turn::user(text));
    }

    /// Turns a backend result into the next assistant turn.
    ///
    /// `Success`, `Blocked` and `Empty` always produce a turn. A `Failure` produces none, which
    /// leaves the preceding user turn without a reply.
    pub fn record_result(&mut self, result: BackendResult, model_name: &str) -> Outcome {
        let content = match result {
            BackendResult::Success(text) => text,
            BackendResult::Blocked(reason) => {
                format!("Response {reason}. Please rephrase your question.")
            }
            BackendResult::Empty => EMPTY_RESPONSE_NOTICE.to_string(),
            BackendResult::Failure(error) => return Outcome::Dropped(error),
        };
        self.append(Turn::assistant(content, model_name));
        Outcome::Appended
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn message_count(&self) -> usize {
        self.history.len()
    }

    pub fn token_estimate(&self) -> usize {
        self.token_estimate
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn last_assistant_turn(&self) -> Option<&Turn> {
        self.history.iter().rev().find(|t| t.role == Role::Assistant)
    }

    /// Number of user turns not followed by an assistant reply.
    pub fn unpaired_user_turns(&self) -> usize {
        let mut unpaired = 0;
        let mut waiting = false;
        for turn in &self.history {
            match turn.role {
                Role::User => {
                    if waiting {
                        unpaired += 1;
                    }
                    waiting = true;
                }
                Role::Assistant => waiting = false,
            }
        }
        unpaired + usize::from(waiting)
    }
}
