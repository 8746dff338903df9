use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Model configuration for the tool.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ModelConfig {
    /// Identifier sent to the backend, e.g. `models/gemini-2.5-flash` or `llama2`.
    #[serde(default)]
    pub name: String,
    /// Human readable name shown next to assistant turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(alias = "type")]
    pub provider: ModelProvider,
    #[serde(default, flatten)]
    pub settings: HashMap<String, serde_yaml::Value>,
}

impl ModelConfig {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Reads a provider specific setting, `None` if absent or of the wrong shape.
    pub fn get_setting<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.settings
            .get(key)
            .and_then(|v| serde_yaml::from_value(v.clone()).ok())
    }
}

/// Supported model provider integrations (serialized as lowercase strings).
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Gemini,
    Ollama,
}

impl From<ModelProvider> for String {
    fn from(val: ModelProvider) -> Self {
        val.as_str().into()
    }
}

impl ModelProvider {
    pub fn as_str(&self) -> &'static str {
        match &self {
            ModelProvider::Gemini => "gemini",
            ModelProvider::Ollama => "ollama",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ModelInitError {
    #[error(
        "{var} not found in the environment!\n\n\
         Steps to fix:\n  \
         1. Get a key from: https://aistudio.google.com/app/apikey\n  \
         2. Export it before starting: export {var}=your_actual_key_here"
    )]
    MissingCredential { var: String },
    #[error("Invalid settings for model '{model}': {reason}")]
    InvalidSettings { model: String, reason: String },
}

/// Resolves an `env:NAME` reference to the variable's value; other values pass through.
///
/// An unset or empty variable is a [`ModelInitError::MissingCredential`].
pub fn resolve_credential(raw: &str) -> Result<String, ModelInitError> {
    let Some(var) = raw.strip_prefix("env:") else {
        return Ok(raw.to_string());
    };
    let var = var.trim();
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ModelInitError::MissingCredential {
            var: var.to_string(),
        }),
    }
}
