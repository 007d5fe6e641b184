//! Generation backend trait for producing answers

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Error, Result};

/// Trait for answer generation over a prepared context
///
/// Implementations:
/// - `OpenAiChatBackend`: OpenAI-compatible chat completions
/// - `HuggingFaceBackend`: Hugging Face hosted inference
/// - `OllamaBackend`: Local Ollama server (phi3, llama3, etc.)
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate an answer to `query` grounded in `context`
    async fn generate(&self, query: &str, context: &str) -> Result<String>;

    /// Get backend name for logging and reasoning traces
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}

/// Build the shared HTTP client for remote providers
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(5)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a non-success response into a provider error carrying status and body
pub(crate) async fn error_from_response(provider: &str, response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let body = crate::generation::citation::truncate_snippet(&body, 300);
    Error::provider(provider, format!("HTTP {} - {}", status, body))
}
