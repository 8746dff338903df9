//! Shared fixtures for the twinchat unit tests.
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs::File;
use std::io::Write;
use std::sync::Mutex;
use tempfile::Builder;
use twinchat_core::completion::{BackendResult, CompletionModel};
use twinchat_core::config::{Config, get_config};
use twinchat_core::generation::GenerationConfig;

/// A model that replays scripted results; `Err` entries become request errors.
pub struct MockModel {
    script: Mutex<VecDeque<Result<BackendResult, String>>>,
}

impl MockModel {
    pub fn new(script: Vec<Result<BackendResult, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

#[async_trait]
impl CompletionModel for MockModel {
    fn display_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, _prompt: &str, _config: &GenerationConfig) -> Result<BackendResult> {
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("MockModel script exhausted")),
        }
    }
}

/// Loads a config whose models all point at `base_url`.
///
/// # Panics
/// Panics if the temporary config cannot be written or parsed.
pub fn create_test_config(base_url: &str) -> Config {
    let content = format!(
        r#"
models:
  flash:
    name: models/gemini-2.5-flash
    display_name: Gemini 2.5 Flash
    type: gemini
    api_key: MOCK_GEMINI_API_KEY
    base_url: {base_url}
  llama2:
    type: ollama
    base_url: {base_url}
  mistral:
    type: ollama
    base_url: {base_url}
profiles:
  gemini:
    temperature: 0.7
    max_tokens: 1500
    top_p: 0.95
    top_k: 40
  ollama:
    temperature: 0.7
    max_tokens: 1000
gemini:
  model: flash
  profile: gemini
ollama:
  model: llama2
  profile: ollama
"#
    );

    let temp_dir = Builder::new()
        .prefix("twinchat-test")
        .rand_bytes(8)
        .tempdir()
        .unwrap();
    let config_path = temp_dir.path().join("twinchat.yml");
    File::create(&config_path)
        .unwrap()
        .write_all(content.as_bytes())
        .unwrap();
    let config = get_config(Some(config_path)).unwrap();
    drop(temp_dir);
    config
}
