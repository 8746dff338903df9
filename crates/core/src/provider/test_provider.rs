//! A scripted model for unit testing purposes.
use crate::completion::{BackendResult, CompletionModel};
use crate::generation::GenerationConfig;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A `CompletionModel` that replays a fixed list of results.
///
/// Each call to `complete` pops the next entry; `Err` entries become errors with that message.
/// Once the script runs out every call fails. Prompts are recorded for assertions.
#[derive(Debug)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<BackendResult, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(script: Vec<Result<BackendResult, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    fn display_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str, _config: &GenerationConfig) -> Result<BackendResult> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("ScriptedModel script exhausted")),
        }
    }
}
