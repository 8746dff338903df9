use crate::completion::CompletionModel;
use crate::model::ModelProvider;
use crate::provider::{gemini, ollama};
use anyhow::Result;
use tracing::instrument;

#[instrument(skip(model_config), fields(model = %model_config.name))]
pub fn get_completion_llm(
    model_config: crate::model::ModelConfig,
) -> Result<Box<dyn CompletionModel + Send + Sync>> {
    match model_config.provider {
        ModelProvider::Gemini => {
            let model = gemini::GeminiModel::new(model_config)?;
            Ok(Box::new(model))
        }
        ModelProvider::Ollama => {
            let model = ollama::OllamaModel::new(model_config)?;
            Ok(Box::new(model))
        }
    }
}
