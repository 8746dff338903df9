//! Connectivity check against the local model server.
use crate::cli::ux::{ChatMessageType, GenerationSpinner, style_chat_text};
use anyhow::Result;
use twinchat_core::provider::ollama::{LocalModel, list_models};

pub const TROUBLESHOOTING: &str = "Troubleshooting steps:
  1. Make sure Ollama is installed
  2. Run `ollama serve` in a terminal and keep it running
  3. Download a model: `ollama pull llama2`";

fn format_size(bytes: u64) -> String {
    format!("{:.1} GB", bytes as f64 / 1_000_000_000.0)
}

/// Human readable report for the outcome of listing the models at `base_url`.
pub fn format_report(base_url: &str, models: &Result<Vec<LocalModel>>) -> String {
    match models {
        Ok(models) => {
            let mut out = style_chat_text(
                &format!("Ollama is running at {base_url}"),
                ChatMessageType::Assistant,
            )
            .to_string();
            if models.is_empty() {
                out.push_str("\nNo models installed. Try `ollama pull llama2`.");
            } else {
                out.push_str("\nInstalled models:");
                for model in models {
                    out.push_str(&format!("\n  {} ({})", model.name, format_size(model.size)));
                }
            }
            out
        }
        Err(e) => format!(
            "{}\n{TROUBLESHOOTING}",
            style_chat_text(
                &format!("Ollama not reachable at {base_url}: {e:#}"),
                ChatMessageType::Error
            )
        ),
    }
}

/// Checks the server at `base_url` and returns the report.
pub async fn check(base_url: &str) -> String {
    let spinner = GenerationSpinner::new(format!("Checking {base_url}..."));
    let models = list_models(base_url).await;
    spinner.clear();
    format_report(base_url, &models)
}

pub async fn execute(base_url: &str) -> Result<()> {
    println!("{}", check(base_url).await);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[tokio::test]
    async fn test_check_lists_installed_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [
                    {"name": "llama2:latest", "size": 3_800_000_000u64},
                    {"name": "mistral:latest", "size": 4_100_000_000u64}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let report = console::strip_ansi_codes(&check(&server.uri()).await).to_string();

        assert!(report.starts_with(&format!("Ollama is running at {}", server.uri())));
        assert!(report.contains("  llama2:latest (3.8 GB)"));
        assert!(report.contains("  mistral:latest (4.1 GB)"));
    }

    #[tokio::test]
    async fn test_check_without_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
            .mount(&server)
            .await;

        let report = check(&server.uri()).await;
        assert!(report.contains("No models installed."));
    }

    #[tokio::test]
    async fn test_check_server_error_shows_troubleshooting() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let report = console::strip_ansi_codes(&check(&server.uri()).await).to_string();

        assert!(report.contains("Ollama not reachable at"));
        assert!(report.contains("boom"));
        assert!(report.contains("ollama serve"));
    }
}
