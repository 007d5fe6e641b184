//! Ollama-based providers for embeddings and generation
//!
//! Both providers share one `OllamaClient`. Calls fail fast: the synthesizer
//! moves to the next backend instead of retrying in place.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::generation::PromptBuilder;

use super::embedding::EmbeddingProvider;
use super::llm::{error_from_response, http_client, GenerationBackend};

/// Ollama API client
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Generate an embedding for one text
    pub async fn embed(&self, provider: &str, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest { model, prompt: text })
            .send()
            .await
            .map_err(|e| Error::provider(provider, format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(provider, response).await);
        }

        let embed_response: EmbedResponse = response.json().await.map_err(|e| {
            Error::provider(provider, format!("Failed to parse embedding response: {}", e))
        })?;

        if embed_response.embedding.is_empty() {
            return Err(Error::provider(provider, "empty embedding in response"));
        }

        Ok(embed_response.embedding)
    }

    /// Generate a completion for a prompt
    pub async fn generate(
        &self,
        provider: &str,
        model: &str,
        prompt: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature,
                num_predict: max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::provider(provider, format!("Generation request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(provider, response).await);
        }

        let generate_response: GenerateResponse = response.json().await.map_err(|e| {
            Error::provider(provider, format!("Failed to parse generation response: {}", e))
        })?;

        Ok(generate_response.response)
    }
}

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create from an existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: &str, dimensions: usize) -> Self {
        Self {
            client,
            model: model.to_string(),
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Ollama doesn't have native batch support, so we call sequentially
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.client.embed(self.name(), &self.model, text).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn similarity_threshold(&self) -> f32 {
        0.5
    }

    fn name(&self) -> &str {
        "ollama-embeddings"
    }
}

/// Ollama backend for answer generation
pub struct OllamaBackend {
    client: Arc<OllamaClient>,
    model: String,
    name: String,
    temperature: f32,
    max_tokens: u32,
}

impl OllamaBackend {
    /// Create from an existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: &str, temperature: f32, max_tokens: u32) -> Self {
        Self {
            client,
            model: model.to_string(),
            name: format!("ollama:{}", model),
            temperature,
            max_tokens,
        }
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    async fn generate(&self, query: &str, context: &str) -> Result<String> {
        tracing::info!("Generating answer with model: {}", self.model);
        let prompt = format!(
            "{}\n\n{}",
            PromptBuilder::system_instruction(),
            PromptBuilder::build_rag_prompt(query, context)
        );
        self.client
            .generate(&self.name, &self.model, prompt, self.temperature, self.max_tokens)
            .await
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::json;

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_embed_and_generate() {
        let router = Router::new()
            .route(
                "/api/embeddings",
                post(|| async { Json(json!({"embedding": [0.5, 0.5]})) }),
            )
            .route(
                "/api/generate",
                post(|| async { Json(json!({"response": "grounded answer", "done": true})) }),
            );
        let base = spawn_stub(router).await;
        let client = Arc::new(OllamaClient::new(&base, Duration::from_secs(5)).unwrap());

        let embedder = OllamaEmbedder::from_client(Arc::clone(&client), "nomic-embed-text", 2);
        let vectors = embedder.embed(&["a".to_string(), "b".to_string()]).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.5, 0.5]);

        let backend = OllamaBackend::from_client(client, "phi3", 0.3, 100);
        assert_eq!(backend.name(), "ollama:phi3");
        let answer = backend.generate("question", "context").await.unwrap();
        assert_eq!(answer, "grounded answer");
    }

    #[tokio::test]
    async fn test_server_error_is_provider_error() {
        let router = Router::new().route(
            "/api/generate",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model not loaded") }),
        );
        let base = spawn_stub(router).await;
        let client = Arc::new(OllamaClient::new(&base, Duration::from_secs(5)).unwrap());

        let backend = OllamaBackend::from_client(client, "phi3", 0.3, 100);
        let result = backend.generate("question", "context").await;
        assert!(matches!(result, Err(Error::Provider { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let client = Arc::new(OllamaClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap());
        assert!(!client.health_check().await);

        let embedder = OllamaEmbedder::from_client(client, "nomic-embed-text", 768);
        assert!(embedder.embed_query("hello").await.is_err());
    }
}
