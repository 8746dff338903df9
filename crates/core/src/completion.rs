use crate::generation::GenerationConfig;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, instrument, warn};

/// Displayable outcome of one request to a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendResult {
    Success(String),
    Blocked(String),
    Empty,
    Failure(String),
}

impl BackendResult {
    pub fn kind(&self) -> &'static str {
        match self {
            BackendResult::Success(_) => "success",
            BackendResult::Blocked(_) => "blocked",
            BackendResult::Empty => "empty",
            BackendResult::Failure(_) => "failure",
        }
    }
}

impl fmt::Display for BackendResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendResult::Success(text) => write!(f, "{text}"),
            BackendResult::Blocked(reason) => write!(f, "Response {reason}"),
            BackendResult::Empty => write!(f, "No response generated by the model"),
            BackendResult::Failure(error) => write!(f, "Error: {error}"),
        }
    }
}

/// A generation backend.
///
/// Implementations run their own primary and fallback paths. Any error that escapes
/// `complete` is turned into [`BackendResult::Failure`] by [`dispatch`].
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Human readable model name recorded on assistant turns.
    fn display_name(&self) -> &str;

    async fn complete(&self, prompt: &str, config: &GenerationConfig) -> Result<BackendResult>;
}

/// Sends `input` to `model` and always returns a displayable result.
#[instrument(skip_all, fields(model = model.display_name()))]
pub async fn dispatch(
    model: &dyn CompletionModel,
    input: &str,
    config: &GenerationConfig,
) -> BackendResult {
    match model.complete(input, config).await {
        Ok(result) => {
            debug!(kind = result.kind(), "Backend responded");
            result
        }
        Err(err) => {
            warn!("Backend request failed: {err:#}");
            BackendResult::Failure(format!("{err:#}"))
        }
    }
}
