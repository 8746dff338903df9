//! Local Ollama server backend.
use crate::completion::{BackendResult, CompletionModel};
use crate::generation::GenerationConfig;
use crate::model::{ModelConfig, ModelInitError};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Provide clear and accurate responses.";

const FALLBACK_TIMEOUT_SECS: u64 = 30;
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Deserialize)]
struct OllamaSettings {
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default = "default_system_prompt")]
    system_prompt: String,
    #[serde(default = "default_fallback_timeout")]
    fallback_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_fallback_timeout() -> u64 {
    FALLBACK_TIMEOUT_SECS
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

impl From<&GenerationConfig> for GenerateOptions {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            num_predict: config.max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// A model installed on the local server, as reported by `/api/tags`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocalModel {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<LocalModel>,
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    Url::parse(base_url).with_context(|| format!("Invalid base_url for Ollama: {base_url}"))
}

async fn ensure_success(response: Response, endpoint: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(anyhow!(
        "Ollama {endpoint} request failed with status {status}: {text}"
    ))
}

/// Lists the models installed on the server at `base_url`.
///
/// Doubles as the connectivity check; waits at most five seconds.
#[instrument]
pub async fn list_models(base_url: &str) -> Result<Vec<LocalModel>> {
    let url = parse_base_url(base_url)?.join("api/tags")?;
    let response = Client::new()
        .get(url)
        .timeout(STATUS_TIMEOUT)
        .send()
        .await
        .context("Ollama not running or not reachable")?;
    let tags: TagsResponse = ensure_success(response, "/api/tags")
        .await?
        .json()
        .await
        .context("Failed to parse JSON response from /api/tags")?;
    Ok(tags.models)
}

#[derive(Debug)]
pub struct OllamaModel {
    config: ModelConfig,
    client: Client,
    base_url: Url,
    system_prompt: String,
    fallback_timeout: Duration,
}

impl OllamaModel {
    pub fn new(model_config: ModelConfig) -> Result<Self> {
        let settings: OllamaSettings = serde_yaml::from_value(
            serde_yaml::to_value(&model_config.settings)
                .map_err(|_e| anyhow!("Invalid settings structure"))?,
        )
        .map_err(|e| ModelInitError::InvalidSettings {
            model: model_config.name.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            base_url: parse_base_url(&settings.base_url)?,
            config: model_config,
            client: Client::new(),
            system_prompt: settings.system_prompt,
            fallback_timeout: Duration::from_secs(settings.fallback_timeout_secs),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Primary path: a chat exchange with the system prompt in front of the user input.
    #[instrument(skip_all)]
    async fn chat(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.name,
            messages: vec![
                ChatRequestMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatRequestMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
            options: config.into(),
        };
        let response = self
            .client
            .post(self.base_url.join("api/chat")?)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to /api/chat")?;
        let body: ChatResponse = ensure_success(response, "/api/chat")
            .await?
            .json()
            .await
            .context("Failed to parse JSON response from /api/chat")?;
        Ok(body.message.content)
    }

    /// Fallback path: a direct, bounded call to the generation endpoint.
    #[instrument(skip_all)]
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let request = GenerateRequest {
            model: &self.config.name,
            prompt,
            stream: false,
            options: config.into(),
        };
        let response = self
            .client
            .post(self.base_url.join("api/generate")?)
            .timeout(self.fallback_timeout)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to /api/generate")?;
        let body: GenerateResponse = ensure_success(response, "/api/generate")
            .await?
            .json()
            .await
            .context("Failed to parse JSON response from /api/generate")?;
        Ok(body.response)
    }
}

#[async_trait]
impl CompletionModel for OllamaModel {
    fn display_name(&self) -> &str {
        self.config.display_name()
    }

    async fn complete(&self, prompt: &str, config: &GenerationConfig) -> Result<BackendResult> {
        let text = match self.chat(prompt, config).await {
            Ok(text) => text,
            Err(first) => {
                warn!("Chat request failed, trying direct generate API: {first:#}");
                self.generate(prompt, config).await.with_context(|| {
                    format!("Chat request failed ({first:#}); direct generate API also failed")
                })?
            }
        };
        debug!(words = crate::session::word_count(&text), "Ollama responded");
        Ok(BackendResult::Success(text))
    }
}
