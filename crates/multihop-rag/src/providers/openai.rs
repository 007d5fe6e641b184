//! OpenAI-compatible providers for embeddings and chat generation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::resolve_api_key;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;

use super::embedding::EmbeddingProvider;
use super::llm::{error_from_response, http_client, GenerationBackend};

/// Maximum inputs per embeddings request
const EMBED_BATCH_SIZE: usize = 100;

/// OpenAI embedding provider (text-embedding-ada-002 and compatible APIs)
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
    api_key: Option<String>,
}

impl OpenAiEmbedder {
    /// Create a new OpenAI embedder
    ///
    /// A missing key is not an error here; `embed` reports
    /// `ProviderUnavailable` so the cascade can move on.
    pub fn new(
        base_url: &str,
        model: &str,
        dimensions: usize,
        api_key: Option<&str>,
        api_key_env: &str,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions,
            api_key: resolve_api_key(api_key, api_key_env),
        })
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::unavailable(self.name(), "API key not configured"))
    }

    async fn embed_batch(&self, key: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::provider(self.name(), format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(self.name(), response).await);
        }

        let mut parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| Error::provider(self.name(), format!("malformed response: {}", e)))?;

        if parsed.data.len() != texts.len() {
            return Err(Error::provider(
                self.name(),
                format!("expected {} embeddings, got {}", texts.len(), parsed.data.len()),
            ));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let key = self.api_key()?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            embeddings.extend(self.embed_batch(key, batch).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn similarity_threshold(&self) -> f32 {
        0.7
    }

    fn name(&self) -> &str {
        "openai-embeddings"
    }
}

/// OpenAI chat completions backend
pub struct OpenAiChatBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiChatBackend {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<&str>,
        api_key_env: &str,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: resolve_api_key(api_key, api_key_env),
            temperature,
            max_tokens,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[async_trait]
impl GenerationBackend for OpenAiChatBackend {
    async fn generate(&self, query: &str, context: &str) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::unavailable(self.name(), "API key not configured"))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: PromptBuilder::system_instruction().to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: PromptBuilder::build_rag_prompt(query, context),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::info!("Generating answer with model: {}", self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::provider(self.name(), format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(self.name(), response).await);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::provider(self.name(), format!("malformed response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::provider(self.name(), "no choices in response"))
    }

    fn name(&self) -> &str {
        "openai-chat"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
