use std::{
    collections::HashMap,
    fs::{self, File},
    io::Write,
    path::PathBuf,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::{
    assets::{get_config_dir, get_default_config},
    generation::{GenerationConfig, GenerationConfigError},
    model::{ModelConfig, ModelProvider},
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File system error: {0}")]
    IO(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    YAMLError(#[from] serde_yaml::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid profile '{profile}': {source}")]
    Profile {
        profile: String,
        source: GenerationConfigError,
    },
}

/// Model and generation defaults for one front end.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModeConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub profile: GenerationConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub models: HashMap<String, ModelConfig>,
    pub profiles: HashMap<String, GenerationConfig>,
    pub gemini: ModeConfig,
    pub ollama: ModeConfig,
}

impl Config {
    pub fn mode(&self, provider: ModelProvider) -> &ModeConfig {
        match provider {
            ModelProvider::Gemini => &self.gemini,
            ModelProvider::Ollama => &self.ollama,
        }
    }

    /// Sorted names of the configured models served by `provider`.
    pub fn model_names(&self, provider: ModelProvider) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .models
            .iter()
            .filter(|(_, m)| m.provider == provider)
            .map(|(k, _)| k.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum StringOrObject<T> {
    String(String),
    Object(T),
}

#[derive(Deserialize, Debug)]
struct RawConfig {
    #[serde(default)]
    models: HashMap<String, ModelConfig>,
    #[serde(default)]
    profiles: HashMap<String, GenerationConfig>,
    gemini: RawModeConfig,
    ollama: RawModeConfig,
}

#[derive(Deserialize, Debug)]
struct RawModeConfig {
    model: StringOrObject<ModelConfig>,
    #[serde(default)]
    profile: Option<StringOrObject<GenerationConfig>>,
}

impl RawConfig {
    #[instrument]
    fn to_config(&self) -> Result<Config, ConfigError> {
        let mut models_with_names = HashMap::new();
        for (k, v) in &self.models {
            // Model name defaults to its key
            let model_name = if v.name.is_empty() {
                k.clone()
            } else {
                v.name.clone()
            };
            let model = ModelConfig {
                name: model_name,
                ..v.clone()
            };
            models_with_names.insert(k.clone(), model);
        }

        for (name, profile) in &self.profiles {
            profile.validate().map_err(|source| ConfigError::Profile {
                profile: name.clone(),
                source,
            })?;
        }

        let resolve_model = |model_entry: &StringOrObject<ModelConfig>,
                             provider: ModelProvider|
         -> Result<ModelConfig, ConfigError> {
            let model = match model_entry {
                StringOrObject::String(s) => models_with_names
                    .get(s)
                    .cloned()
                    .ok_or_else(|| ConfigError::Config(format!("Model '{s}' not found")))?,
                StringOrObject::Object(m) if m.name.is_empty() => {
                    return Err(ConfigError::Config(format!(
                        "Inline {} model needs a name",
                        provider.as_str()
                    )));
                }
                StringOrObject::Object(m) => m.clone(),
            };
            if model.provider != provider {
                return Err(ConfigError::Config(format!(
                    "Model '{}' for the {} front end is served by {}",
                    model.name,
                    provider.as_str(),
                    model.provider.as_str()
                )));
            }
            Ok(model)
        };

        let resolve_profile = |profile_entry: &Option<StringOrObject<GenerationConfig>>,
                               fallback: GenerationConfig|
         -> Result<GenerationConfig, ConfigError> {
            match profile_entry {
                Some(StringOrObject::String(s)) => self
                    .profiles
                    .get(s)
                    .cloned()
                    .ok_or_else(|| ConfigError::Config(format!("Profile '{s}' not found"))),
                Some(StringOrObject::Object(p)) => {
                    p.validate().map_err(|source| ConfigError::Profile {
                        profile: "<inline>".to_string(),
                        source,
                    })?;
                    Ok(p.clone())
                }
                None => Ok(fallback),
            }
        };

        let gemini_model = resolve_model(&self.gemini.model, ModelProvider::Gemini)?;
        let gemini_profile = resolve_profile(&self.gemini.profile, GenerationConfig::default())?;
        let ollama_model = resolve_model(&self.ollama.model, ModelProvider::Ollama)?;
        let ollama_profile =
            resolve_profile(&self.ollama.profile, GenerationConfig::local_default())?;

        Ok(Config {
            models: models_with_names,
            profiles: self.profiles.clone(),
            gemini: ModeConfig {
                model: gemini_model,
                profile: gemini_profile,
            },
            ollama: ModeConfig {
                model: ollama_model,
                profile: ollama_profile,
            },
        })
    }
}

#[instrument(skip(config_path))]
pub fn create_or_get_config_file(
    config_path: Option<PathBuf>,
) -> Result<(bool, PathBuf), ConfigError> {
    let actual_path = config_path.unwrap_or_else(|| get_config_dir().join("twinchat.yml"));

    let parent_dir = actual_path.parent().ok_or_else(|| {
        ConfigError::IO(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Config path has no parent directory",
        ))
    })?;

    if !parent_dir.exists() {
        fs::create_dir_all(parent_dir)?;
    }

    if actual_path.exists() {
        Ok((true, actual_path))
    } else {
        File::create(&actual_path)?.write_all(get_default_config().as_bytes())?;
        Ok((false, actual_path))
    }
}

#[instrument(skip(config_path))]
pub fn get_config(config_path: Option<PathBuf>) -> Result<Config, ConfigError> {
    let (_, config_file) = create_or_get_config_file(config_path)?;
    let content = fs::read_to_string(&config_file)?;
    let raw: RawConfig = serde_yaml::from_str(&content)?;
    raw.to_config()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::tempdir;

    use super::*;
    use crate::test_utils::{create_temp_config, dummy_model_config};

    const DUMMY_CONFIG_CONTENT: &str = r#"
models:
  flash:
    name: models/gemini-2.5-flash
    type: gemini
    api_key: env:GOOGLE_API_KEY
  llama2:
    type: ollama
    base_url: http://localhost:11434
  mistral:
    type: ollama
profiles:
  default:
    temperature: 0.7
    max_tokens: 1500
    top_p: 0.95
    top_k: 40
  precise:
    temperature: 0.1
    max_tokens: 800
    safety:
      DANGEROUS: BLOCK_NONE
gemini:
  model: flash
  profile: precise
ollama:
  model: llama2
"#;

    fn raw_mode(model: &str, profile: Option<&str>) -> RawModeConfig {
        RawModeConfig {
            model: StringOrObject::String(model.to_string()),
            profile: profile.map(|p| StringOrObject::String(p.to_string())),
        }
    }

    fn test_models() -> HashMap<String, ModelConfig> {
        HashMap::from([
            (
                "flash".to_string(),
                dummy_model_config("models/gemini-2.5-flash", ModelProvider::Gemini),
            ),
            (
                "llama2".to_string(),
                dummy_model_config("llama2", ModelProvider::Ollama),
            ),
        ])
    }

    #[test]
    fn test_raw_config_rejects_model_of_other_provider() {
        let raw_config = RawConfig {
            models: test_models(),
            profiles: HashMap::new(),
            gemini: raw_mode("llama2", None),
            ollama: raw_mode("llama2", None),
        };
        let err = raw_config.to_config().unwrap_err();
        assert!(
            matches!(&err, ConfigError::Config(msg) if msg == "Model 'llama2' for the gemini front end is served by ollama"),
            "unexpected error: {err}"
        );

        let raw_config = RawConfig {
            models: test_models(),
            profiles: HashMap::new(),
            gemini: raw_mode("flash", None),
            ollama: raw_mode("flash", None),
        };
        assert!(matches!(
            raw_config.to_config().unwrap_err(),
            ConfigError::Config(msg) if msg.contains("for the ollama front end is served by gemini")
        ));
    }

    #[test]
    fn test_raw_config_rejects_unnamed_inline_model() {
        let raw_config = RawConfig {
            models: test_models(),
            profiles: HashMap::new(),
            gemini: raw_mode("flash", None),
            ollama: RawModeConfig {
                model: StringOrObject::Object(dummy_model_config("", ModelProvider::Ollama)),
                profile: None,
            },
        };
        assert!(matches!(
            raw_config.to_config().unwrap_err(),
            ConfigError::Config(msg) if msg == "Inline ollama model needs a name"
        ));
    }

    #[test]
    fn test_get_config_rejects_front_end_provider_mismatch() {
        let content = DUMMY_CONFIG_CONTENT.replace("  model: flash\n", "  model: llama2\n");
        assert!(content.contains("gemini:\n  model: llama2"));
        let err = get_config(Some(create_temp_config(&content))).unwrap_err();
        assert!(err.to_string().contains("for the gemini front end is served by ollama"));
    }

    #[test]
    fn test_raw_config_to_config_valid() {
        let mut models = HashMap::new();
        models.insert(
            "flash".to_string(),
            dummy_model_config("", ModelProvider::Gemini),
        );
        models.insert(
            "llama2".to_string(),
            dummy_model_config("llama2", ModelProvider::Ollama),
        );

        let mut profiles = HashMap::new();
        profiles.insert(
            "creative".to_string(),
            GenerationConfig {
                temperature: 0.9,
                ..Default::default()
            },
        );

        let raw_config = RawConfig {
            models,
            profiles,
            gemini: raw_mode("flash", Some("creative")),
            ollama: raw_mode("llama2", None),
        };

        let config = raw_config.to_config().unwrap();

        assert_eq!(config.models.len(), 2);
        // Empty names default to the map key
        assert_eq!(config.gemini.model.name, "flash");
        assert_eq!(config.gemini.profile.temperature, 0.9);
        assert_eq!(config.ollama.model.name, "llama2");
        assert_eq!(config.ollama.profile, GenerationConfig::local_default());
    }

    #[test]
    fn test_raw_config_to_config_missing_model_reference() {
        let raw_config = RawConfig {
            models: HashMap::new(),
            profiles: HashMap::new(),
            gemini: raw_mode("non-existent-model", None),
            ollama: raw_mode("non-existent-model", None),
        };

        let err = raw_config.to_config().unwrap_err();
        assert!(
            matches!(err, ConfigError::Config(msg) if msg.contains("Model 'non-existent-model' not found"))
        );
    }

    #[test]
    fn test_raw_config_to_config_missing_profile_reference() {
        let raw_config = RawConfig {
            models: test_models(),
            profiles: HashMap::new(),
            gemini: raw_mode("flash", None),
            ollama: raw_mode("llama2", Some("non-existent-profile")),
        };

        let err = raw_config.to_config().unwrap_err();
        assert!(
            matches!(err, ConfigError::Config(msg) if msg.contains("Profile 'non-existent-profile' not found"))
        );
    }

    #[test]
    fn test_raw_config_to_config_inline_model_and_profile() {
        let raw_config = RawConfig {
            models: HashMap::new(),
            profiles: HashMap::new(),
            gemini: RawModeConfig {
                model: StringOrObject::Object(dummy_model_config(
                    "inline-gemini",
                    ModelProvider::Gemini,
                )),
                profile: Some(StringOrObject::Object(GenerationConfig {
                    top_k: 10,
                    ..Default::default()
                })),
            },
            ollama: RawModeConfig {
                model: StringOrObject::Object(dummy_model_config(
                    "inline-ollama",
                    ModelProvider::Ollama,
                )),
                profile: None,
            },
        };

        let config = raw_config.to_config().unwrap();

        assert_eq!(config.gemini.model.name, "inline-gemini");
        assert_eq!(config.gemini.profile.top_k, 10);
        assert_eq!(config.ollama.model.name, "inline-ollama");
        assert_eq!(config.ollama.profile.max_tokens, 1000);
    }

    #[test]
    fn test_raw_config_rejects_out_of_range_profile() {
        let mut profiles = HashMap::new();
        profiles.insert(
            "broken".to_string(),
            GenerationConfig {
                max_tokens: 50,
                ..Default::default()
            },
        );
        let raw_config = RawConfig {
            models: test_models(),
            profiles,
            gemini: raw_mode("flash", None),
            ollama: raw_mode("llama2", None),
        };

        let err = raw_config.to_config().unwrap_err();
        assert!(matches!(&err, ConfigError::Profile { profile, .. } if profile == "broken"));
        assert!(err.to_string().contains("max_tokens must be between 100 and 4000"));
    }

    #[test]
    fn test_create_or_get_config_file_when_exists() {
        let config_path = create_temp_config(DUMMY_CONFIG_CONTENT);

        let (exists, file_path) = create_or_get_config_file(Some(config_path.clone())).unwrap();

        assert!(exists);
        assert_eq!(file_path, config_path);
    }

    #[test]
    fn test_create_or_get_config_file_when_not_exist() {
        let config_dir = tempdir().unwrap();
        let config_file = config_dir.path().join("nested").join("twinchat.yml");

        let (exists, file_path) = create_or_get_config_file(Some(config_file.clone())).unwrap();

        assert!(!exists);
        assert_eq!(file_path, config_file);
        assert_eq!(
            fs::read_to_string(&file_path).unwrap(),
            get_default_config()
        );
    }

    #[test]
    fn test_get_config_return_config_for_valid_schema() {
        let config_file = create_temp_config(DUMMY_CONFIG_CONTENT);
        let config = get_config(Some(config_file)).unwrap();

        assert_eq!(config.models.len(), 3);
        assert_eq!(config.profiles.len(), 2);
        assert_eq!(config.gemini.model.name, "models/gemini-2.5-flash");
        assert_eq!(config.gemini.profile.temperature, 0.1);
        assert_eq!(config.gemini.profile.max_tokens, 800);
        assert_eq!(config.ollama.model.name, "llama2");
        assert_eq!(config.ollama.profile.max_tokens, 1000);

        assert_eq!(
            config.model_names(ModelProvider::Ollama),
            vec!["llama2", "mistral"]
        );
        assert_eq!(config.model_names(ModelProvider::Gemini), vec!["flash"]);
        assert_eq!(config.mode(ModelProvider::Gemini).model.name, "models/gemini-2.5-flash");

        let llama2 = config.models.get("llama2").unwrap();
        assert_eq!(
            llama2.get_setting::<String>("base_url").as_deref(),
            Some("http://localhost:11434")
        );
    }

    #[test]
    fn test_default_config_is_valid() {
        let config_dir = tempdir().unwrap();
        let config_file = config_dir.path().join("twinchat.yml");
        let config = get_config(Some(config_file)).unwrap();

        assert_eq!(config.gemini.model.name, "models/gemini-2.5-flash");
        assert_eq!(config.gemini.model.display_name(), "Gemini 2.5 Flash");
        assert_eq!(config.gemini.profile, GenerationConfig::default());
        assert_eq!(config.ollama.model.name, "llama2");
        assert_eq!(config.ollama.profile, GenerationConfig::local_default());
        assert!(
            config
                .model_names(ModelProvider::Ollama)
                .contains(&"llama2:13b")
        );
    }

    #[test]
    fn test_get_config_throws_for_invalid_yaml() {
        let config_file = create_temp_config("invalid yaml content: - [");
        let err = get_config(Some(config_file)).unwrap_err();
        assert!(matches!(err, ConfigError::YAMLError(_)));
        assert!(format!("{err}").contains("YAML parsing error"));
    }

    #[test]
    fn test_get_config_throws_for_missing_referenced_model() {
        let invalid_config_content = r#"
models: {}
profiles: {}
gemini:
  model: non-existent-model
ollama:
  model: non-existent-model
"#;
        let config_file = create_temp_config(invalid_config_content);
        let err = get_config(Some(config_file)).unwrap_err();
        assert!(
            matches!(err, ConfigError::Config(msg) if msg.contains("Model 'non-existent-model' not found"))
        );
    }
}
