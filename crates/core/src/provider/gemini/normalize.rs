//! Extraction of displayable text from a `generateContent` response.
//!
//! The response shape is inspected once, when the body is parsed into a [`RawResponse`]. The
//! extraction rules then work on that tag alone.
use super::types::{FinishReason, GenerateContentResponse};
use crate::completion::BackendResult;
use anyhow::{Context, Result};
use serde_json::Value;

pub const BLOCKED_REASON: &str = "blocked for safety";
pub const UNEXTRACTABLE: &str = "could not extract response";
pub const NO_TEXT_CONTENT: &str = "no text content in response";

/// A response body, tagged by the shape it was found to have.
#[derive(Debug, Clone)]
pub enum RawResponse {
    /// The body carries a `candidates` list, possibly empty.
    Structured(GenerateContentResponse),
    /// No structured result; holds the top level `text` field when it is a string.
    Plain(Option<String>),
}

impl RawResponse {
    /// Classifies a response body. Fails only when `candidates` is present but malformed.
    pub fn from_json(value: Value) -> Result<Self> {
        let has_candidates = value.get("candidates").is_some_and(|c| !c.is_null());
        if has_candidates {
            let response = serde_json::from_value(value)
                .context("Malformed candidates in Gemini response")?;
            Ok(RawResponse::Structured(response))
        } else {
            let text = value
                .get("text")
                .and_then(Value::as_str)
                .map(str::to_owned);
            Ok(RawResponse::Plain(text))
        }
    }
}

/// Turns a classified response into a [`BackendResult`]; first applicable rule wins.
pub fn normalize(raw: RawResponse) -> BackendResult {
    match raw {
        RawResponse::Structured(response) => {
            let Some(candidate) = response.candidates.first() else {
                return BackendResult::Empty;
            };
            let reason = candidate
                .finish_reason
                .clone()
                .unwrap_or(FinishReason::Unspecified);
            match reason {
                // Any first part counts, even one without text
                FinishReason::Stop => match candidate.first_part() {
                    Some(part) => BackendResult::Success(part.text.clone().unwrap_or_default()),
                    None => BackendResult::Failure(NO_TEXT_CONTENT.to_string()),
                },
                FinishReason::Safety => BackendResult::Blocked(BLOCKED_REASON.to_string()),
                other => BackendResult::Failure(format!("unknown finish reason {other}")),
            }
        }
        RawResponse::Plain(Some(text)) => BackendResult::Success(text),
        RawResponse::Plain(None) => BackendResult::Failure(UNEXTRACTABLE.to_string()),
    }
}
