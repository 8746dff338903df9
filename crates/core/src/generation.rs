//! User tunable generation parameters.
//!
//! A [`GenerationConfig`] is read once per request as a snapshot of the current settings.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const TEMPERATURE_RANGE: (f32, f32) = (0.0, 1.0);
pub const MAX_TOKENS_RANGE: (u32, u32) = (100, 4000);
pub const TOP_P_RANGE: (f32, f32) = (0.0, 1.0);
pub const TOP_K_RANGE: (u32, u32) = (1, 100);

#[derive(Error, Debug, PartialEq)]
pub enum GenerationConfigError {
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        min: String,
        max: String,
        value: String,
    },
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: String, value: String },
    #[error("Unknown parameter '{0}', expected one of: temperature, max_tokens, top_p, top_k")]
    UnknownParameter(String),
    #[error("Unknown safety category '{0}'")]
    UnknownCategory(String),
    #[error("Unknown safety threshold '{0}'")]
    UnknownThreshold(String),
}

/// Harm categories a safety threshold can be set for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyCategory {
    Harassment,
    HateSpeech,
    Sexual,
    Dangerous,
}

impl SafetyCategory {
    pub const ALL: [SafetyCategory; 4] = [
        SafetyCategory::Harassment,
        SafetyCategory::HateSpeech,
        SafetyCategory::Sexual,
        SafetyCategory::Dangerous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyCategory::Harassment => "HARASSMENT",
            SafetyCategory::HateSpeech => "HATE_SPEECH",
            SafetyCategory::Sexual => "SEXUAL",
            SafetyCategory::Dangerous => "DANGEROUS",
        }
    }

    /// Category name understood by the hosted API.
    pub fn api_name(&self) -> &'static str {
        match self {
            SafetyCategory::Harassment => "HARM_CATEGORY_HARASSMENT",
            SafetyCategory::HateSpeech => "HARM_CATEGORY_HATE_SPEECH",
            SafetyCategory::Sexual => "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            SafetyCategory::Dangerous => "HARM_CATEGORY_DANGEROUS_CONTENT",
        }
    }

    fn default_threshold(&self) -> SafetyThreshold {
        match self {
            SafetyCategory::Sexual => SafetyThreshold::BlockMediumAndAbove,
            _ => SafetyThreshold::BlockLowAndAbove,
        }
    }
}

impl fmt::Display for SafetyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SafetyCategory {
    type Err = GenerationConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_identifier(s);
        SafetyCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| GenerationConfigError::UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyThreshold {
    BlockNone,
    BlockLowAndAbove,
    BlockMediumAndAbove,
}

impl SafetyThreshold {
    pub const ALL: [SafetyThreshold; 3] = [
        SafetyThreshold::BlockNone,
        SafetyThreshold::BlockLowAndAbove,
        SafetyThreshold::BlockMediumAndAbove,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyThreshold::BlockNone => "BLOCK_NONE",
            SafetyThreshold::BlockLowAndAbove => "BLOCK_LOW_AND_ABOVE",
            SafetyThreshold::BlockMediumAndAbove => "BLOCK_MEDIUM_AND_ABOVE",
        }
    }
}

impl fmt::Display for SafetyThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SafetyThreshold {
    type Err = GenerationConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_identifier(s);
        SafetyThreshold::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| GenerationConfigError::UnknownThreshold(s.to_string()))
    }
}

fn normalize_identifier(s: &str) -> String {
    s.trim().to_uppercase().replace('-', "_")
}

fn default_safety() -> BTreeMap<SafetyCategory, SafetyThreshold> {
    SafetyCategory::ALL
        .into_iter()
        .map(|c| (c, c.default_threshold()))
        .collect()
}

/// Sampling and safety parameters for one request.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
    pub safety: BTreeMap<SafetyCategory, SafetyThreshold>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1500,
            top_p: 0.95,
            top_k: 40,
            safety: default_safety(),
        }
    }
}

impl GenerationConfig {
    /// Defaults used by the local server front end.
    pub fn local_default() -> Self {
        Self {
            max_tokens: 1000,
            ..Default::default()
        }
    }

    /// Checks every parameter against its allowed range.
    pub fn validate(&self) -> Result<(), GenerationConfigError> {
        check_f32("temperature", self.temperature, TEMPERATURE_RANGE)?;
        check_u32("max_tokens", self.max_tokens, MAX_TOKENS_RANGE)?;
        check_f32("top_p", self.top_p, TOP_P_RANGE)?;
        check_u32("top_k", self.top_k, TOP_K_RANGE)?;
        Ok(())
    }

    /// Updates a single parameter from its textual value.
    ///
    /// The config is left untouched when the value does not parse or is out of range.
    pub fn set(&mut self, param: &str, value: &str) -> Result<(), GenerationConfigError> {
        match param.trim().to_lowercase().replace('-', "_").as_str() {
            "temperature" => {
                let v = parse_value("temperature", value)?;
                check_f32("temperature", v, TEMPERATURE_RANGE)?;
                self.temperature = v;
            }
            "max_tokens" => {
                let v = parse_value("max_tokens", value)?;
                check_u32("max_tokens", v, MAX_TOKENS_RANGE)?;
                self.max_tokens = v;
            }
            "top_p" => {
                let v = parse_value("top_p", value)?;
                check_f32("top_p", v, TOP_P_RANGE)?;
                self.top_p = v;
            }
            "top_k" => {
                let v = parse_value("top_k", value)?;
                check_u32("top_k", v, TOP_K_RANGE)?;
                self.top_k = v;
            }
            _ => return Err(GenerationConfigError::UnknownParameter(param.to_string())),
        }
        Ok(())
    }

    pub fn set_safety(&mut self, category: SafetyCategory, threshold: SafetyThreshold) {
        self.safety.insert(category, threshold);
    }

    /// Threshold for a category, falling back to its default when unset.
    pub fn safety_threshold(&self, category: SafetyCategory) -> SafetyThreshold {
        self.safety
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_threshold())
    }
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T, GenerationConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| GenerationConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        })
}

fn check_f32(name: &'static str, value: f32, range: (f32, f32)) -> Result<(), GenerationConfigError> {
    // NaN fails `contains` as well
    if (range.0..=range.1).contains(&value) {
        Ok(())
    } else {
        Err(GenerationConfigError::OutOfRange {
            name,
            min: range.0.to_string(),
            max: range.1.to_string(),
            value: value.to_string(),
        })
    }
}

fn check_u32(name: &'static str, value: u32, range: (u32, u32)) -> Result<(), GenerationConfigError> {
    if (range.0..=range.1).contains(&value) {
        Ok(())
    } else {
        Err(GenerationConfigError::OutOfRange {
            name,
            min: range.0.to_string(),
            max: range.1.to_string(),
            value: value.to_string(),
        })
    }
}
