//! Hosted Gemini API backend.
mod normalize;
mod types;

pub use normalize::{BLOCKED_REASON, NO_TEXT_CONTENT, RawResponse, UNEXTRACTABLE, normalize};
pub use types::{Candidate, Content, FinishReason, GenerateContentResponse, Part};

use crate::completion::{BackendResult, CompletionModel};
use crate::generation::GenerationConfig;
use crate::model::{ModelConfig, ModelInitError, resolve_credential};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use types::GenerateContentRequest;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const MODEL_NAMESPACE: &str = "models/";

#[derive(Debug, Clone, Deserialize)]
struct GeminiSettings {
    api_key: String,
    #[serde(default = "default_base_url")]
    base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// The model identifier in its other accepted form: with the namespace prefix removed when
/// present, added when absent.
pub fn alternate_model_name(name: &str) -> String {
    match name.strip_prefix(MODEL_NAMESPACE) {
        Some(bare) => bare.to_string(),
        None => format!("{MODEL_NAMESPACE}{name}"),
    }
}

#[derive(Debug)]
pub struct GeminiModel {
    config: ModelConfig,
    client: Client,
    api_key: String,
    base_url: Url,
}

impl GeminiModel {
    pub fn new(model_config: ModelConfig) -> Result<Self> {
        let settings: GeminiSettings = serde_yaml::from_value(
            serde_yaml::to_value(&model_config.settings)
                .map_err(|_e| anyhow!("Invalid settings structure"))?,
        )
        .map_err(|e| ModelInitError::InvalidSettings {
            model: model_config.name.clone(),
            reason: e.to_string(),
        })?;

        let api_key = resolve_credential(&settings.api_key)?;
        let base_url = Url::parse(&settings.base_url)
            .with_context(|| format!("Invalid base_url for Gemini: {}", settings.base_url))?;

        Ok(Self {
            config: model_config,
            client: Client::new(),
            api_key,
            base_url,
        })
    }

    /// One `generateContent` call using `model` verbatim in the request path.
    #[instrument(skip(self, prompt, config))]
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<RawResponse> {
        let url = self
            .base_url
            .join(&format!("v1beta/{model}:generateContent"))
            .with_context(|| format!("Invalid model name: {model}"))?;
        let request = GenerateContentRequest::new(prompt, config);

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Gemini API request failed with status {}: {}",
                status,
                text
            ));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse JSON response from Gemini API")?;
        debug!("Received Gemini response");
        RawResponse::from_json(body)
    }
}

#[async_trait]
impl CompletionModel for GeminiModel {
    fn display_name(&self) -> &str {
        self.config.display_name()
    }

    async fn complete(&self, prompt: &str, config: &GenerationConfig) -> Result<BackendResult> {
        let primary = self.config.name.as_str();
        let raw = match self.generate(primary, prompt, config).await {
            Ok(raw) => raw,
            Err(first) => {
                let alternate = alternate_model_name(primary);
                warn!("Request with model '{primary}' failed, retrying as '{alternate}': {first:#}");
                self.generate(&alternate, prompt, config)
                    .await
                    .with_context(|| {
                        format!(
                            "Request with model '{primary}' failed ({first:#}); \
                             alternative '{alternate}' also failed"
                        )
                    })?
            }
        };
        Ok(normalize(raw))
    }
}
