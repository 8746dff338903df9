use anyhow::{Context, Result, anyhow};
use twinchat_core::completion::{CompletionModel, dispatch};
use twinchat_core::config::Config;
use twinchat_core::generation::GenerationConfig;
use twinchat_core::model::{ModelConfig, ModelProvider};
use twinchat_core::provider::ollama;
use twinchat_core::session::{Outcome, Session};
use tracing::info;

/// Chat conversation between human and one AI backend.
///
/// Owns the session and the generation settings for the lifetime of a front end.
pub struct Chat<'a> {
    config: &'a Config,
    provider: ModelProvider,
    model_key: String,
    model_config: ModelConfig,
    model: Box<dyn CompletionModel + Send + Sync>,
    generation: GenerationConfig,
    session: Session,
}

/// Looks up a configured model by key and checks that it belongs to `provider`.
fn resolve_model(config: &Config, provider: ModelProvider, key: &str) -> Result<ModelConfig> {
    let model = config
        .models
        .get(key)
        .cloned()
        .context(format!("Model '{key}' not found in config."))?;
    if model.provider != provider {
        return Err(anyhow!(
            "Model '{key}' is a {} model, not {}.",
            model.provider.as_str(),
            provider.as_str()
        ));
    }
    Ok(model)
}

impl<'a> Chat<'a> {
    /// Creates a chat for `provider`, using `model` or the front end's default model.
    pub fn new(config: &'a Config, provider: ModelProvider, model: Option<String>) -> Result<Self> {
        let mode = config.mode(provider);
        let (model_key, model_config) = match model {
            Some(key) => {
                let model_config = resolve_model(config, provider, &key)?;
                (key, model_config)
            }
            None => {
                if mode.model.provider != provider {
                    return Err(anyhow!(
                        "Default {} model '{}' is served by {}.",
                        provider.as_str(),
                        mode.model.name,
                        mode.model.provider.as_str()
                    ));
                }
                let key = config
                    .models
                    .iter()
                    .find(|(_, m)| **m == mode.model)
                    .map(|(k, _)| k.clone())
                    .unwrap_or_else(|| mode.model.name.clone());
                (key, mode.model.clone())
            }
        };

        let model = twinchat_core::get_completion_llm(model_config.clone())
            .with_context(|| format!("Failed to initialize model '{model_key}'"))?;

        Ok(Self::with_model(
            config,
            provider,
            model_key,
            model_config,
            model,
        ))
    }

    /// Creates a chat around an already constructed model.
    pub fn with_model(
        config: &'a Config,
        provider: ModelProvider,
        model_key: String,
        model_config: ModelConfig,
        model: Box<dyn CompletionModel + Send + Sync>,
    ) -> Self {
        Self {
            config,
            provider,
            model_key,
            model_config,
            model,
            generation: config.mode(provider).profile.clone(),
            session: Session::new(),
        }
    }

    /// Records the user input, sends it to the backend and records the reply.
    pub async fn submit(&mut self, input: &str) -> Outcome {
        self.session.add_user_turn(input);
        let result = dispatch(self.model.as_ref(), input, &self.generation).await;
        self.session
            .record_result(result, self.model.display_name())
    }

    pub fn clear_messages(&mut self) {
        self.session.clear();
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn provider(&self) -> ModelProvider {
        self.provider
    }

    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    pub fn generation_mut(&mut self) -> &mut GenerationConfig {
        &mut self.generation
    }

    pub fn model_key(&self) -> &str {
        &self.model_key
    }

    pub fn model_display_name(&self) -> &str {
        self.model.display_name()
    }

    /// Switches to another configured model of the same backend. History is kept.
    pub fn set_model(&mut self, key: &str) -> Result<()> {
        let model_config = resolve_model(self.config, self.provider, key)?;
        let model = twinchat_core::get_completion_llm(model_config.clone())
            .with_context(|| format!("Failed to initialize model '{key}'"))?;

        info!(from = %self.model_key, to = key, "Switching model");
        self.model = model;
        self.model_config = model_config;
        self.model_key = key.to_string();
        Ok(())
    }

    pub fn available_model_names(&self) -> Vec<&str> {
        self.config.model_names(self.provider)
    }

    /// Base URL of the local server for the current model, or its default.
    pub fn local_base_url(&self) -> String {
        self.model_config
            .get_setting::<String>("base_url")
            .unwrap_or_else(|| ollama::DEFAULT_BASE_URL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockModel, create_test_config};
    use twinchat_core::completion::BackendResult;

    fn mock_chat(config: &Config, script: Vec<Result<BackendResult, String>>) -> Chat<'_> {
        let model_config = config.ollama.model.clone();
        Chat::with_model(
            config,
            ModelProvider::Ollama,
            "llama2".to_string(),
            model_config,
            Box::new(MockModel::new(script)),
        )
    }

    #[tokio::test]
    async fn test_submit_success_appends_both_turns() {
        let config = create_test_config("http://localhost:11434");
        let mut chat = mock_chat(&config, vec![Ok(BackendResult::Success("4".to_string()))]);

        let outcome = chat.submit("2+2?").await;

        assert_eq!(outcome, Outcome::Appended);
        assert_eq!(chat.session().message_count(), 2);
        assert_eq!(chat.session().token_estimate(), 2);
        assert_eq!(
            chat.session().last_assistant_turn().unwrap().model_name.as_deref(),
            Some("mock")
        );
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_only_user_turn() {
        let config = create_test_config("http://localhost:11434");
        let mut chat = mock_chat(&config, vec![Err("connection refused".to_string())]);

        let outcome = chat.submit("hello").await;

        assert_eq!(outcome, Outcome::Dropped("connection refused".to_string()));
        assert_eq!(chat.session().message_count(), 1);
        assert_eq!(chat.session().unpaired_user_turns(), 1);
    }

    #[tokio::test]
    async fn test_clear_messages() {
        let config = create_test_config("http://localhost:11434");
        let mut chat = mock_chat(&config, vec![Ok(BackendResult::Empty)]);
        chat.submit("anything").await;
        assert_eq!(chat.session().message_count(), 2);

        chat.clear_messages();
        assert!(chat.session().is_empty());
        assert_eq!(chat.session().token_estimate(), 0);
    }

    #[test]
    fn test_new_uses_front_end_defaults() {
        let config = create_test_config("http://localhost:11434");
        let chat = Chat::new(&config, ModelProvider::Ollama, None).unwrap();

        assert_eq!(chat.model_key(), "llama2");
        assert_eq!(chat.provider(), ModelProvider::Ollama);
        assert_eq!(chat.generation().max_tokens, 1000);
        assert_eq!(chat.local_base_url(), "http://localhost:11434");
        assert_eq!(chat.available_model_names(), vec!["llama2", "mistral"]);
    }

    #[test]
    fn test_new_rejects_model_of_other_provider() {
        let config = create_test_config("http://localhost:11434");
        let err = Chat::new(&config, ModelProvider::Ollama, Some("flash".to_string()))
            .err()
            .unwrap();
        assert!(err.to_string().contains("is a gemini model, not ollama"));
    }

    #[test]
    fn test_new_rejects_default_model_of_other_provider() {
        let mut config = create_test_config("http://localhost:11434");
        config.gemini.model = config.ollama.model.clone();

        let err = Chat::new(&config, ModelProvider::Gemini, None)
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "Default gemini model 'llama2' is served by ollama."
        );
    }

    #[test]
    fn test_set_model() {
        let config = create_test_config("http://localhost:11434");
        let mut chat = Chat::new(&config, ModelProvider::Ollama, None).unwrap();

        chat.set_model("mistral").unwrap();
        assert_eq!(chat.model_key(), "mistral");
        assert_eq!(chat.model_display_name(), "mistral");

        let err = chat.set_model("missing").unwrap_err();
        assert!(err.to_string().contains("Model 'missing' not found in config."));
        assert_eq!(chat.model_key(), "mistral");
    }
}
