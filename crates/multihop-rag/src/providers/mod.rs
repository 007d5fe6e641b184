//! Provider abstractions for embeddings and answer generation
//!
//! Providers are built once from configuration at startup and injected into
//! the retrieval and synthesis components.

pub mod embedding;
pub mod hash;
pub mod huggingface;
pub mod llm;
pub mod ollama;
pub mod openai;

pub use embedding::{embed_chunks, EmbeddingProvider};
pub use hash::HashEmbedder;
pub use huggingface::HuggingFaceBackend;
pub use llm::GenerationBackend;
pub use ollama::{OllamaBackend, OllamaClient, OllamaEmbedder};
pub use openai::{OpenAiChatBackend, OpenAiEmbedder};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{EmbeddingProviderConfig, GenerationBackendConfig, RagConfig};
use crate::error::Result;

/// Build the embedding cascade, in configured order
pub fn build_embedding_providers(config: &RagConfig) -> Result<Vec<Arc<dyn EmbeddingProvider>>> {
    let timeout = Duration::from_secs(config.generation.timeout_secs);
    let mut ollama_clients = OllamaClients::default();

    config
        .embeddings
        .providers
        .iter()
        .map(|provider| -> Result<Arc<dyn EmbeddingProvider>> {
            Ok(match provider {
                EmbeddingProviderConfig::OpenAi {
                    base_url,
                    model,
                    dimensions,
                    api_key,
                    api_key_env,
                } => Arc::new(OpenAiEmbedder::new(
                    base_url,
                    model,
                    *dimensions,
                    api_key.as_deref(),
                    api_key_env,
                    timeout,
                )?),
                EmbeddingProviderConfig::Ollama {
                    base_url,
                    model,
                    dimensions,
                } => Arc::new(OllamaEmbedder::from_client(
                    ollama_clients.get(base_url, timeout)?,
                    model,
                    *dimensions,
                )),
                EmbeddingProviderConfig::Hash { dimensions } => {
                    Arc::new(HashEmbedder::new(*dimensions)?)
                }
            })
        })
        .collect()
}

/// Build the generation cascade, in configured order
pub fn build_generation_backends(config: &RagConfig) -> Result<Vec<Arc<dyn GenerationBackend>>> {
    let generation = &config.generation;
    let timeout = Duration::from_secs(generation.timeout_secs);
    let mut ollama_clients = OllamaClients::default();

    generation
        .backends
        .iter()
        .map(|backend| -> Result<Arc<dyn GenerationBackend>> {
            Ok(match backend {
                GenerationBackendConfig::OpenAi {
                    base_url,
                    model,
                    api_key,
                    api_key_env,
                } => Arc::new(OpenAiChatBackend::new(
                    base_url,
                    model,
                    api_key.as_deref(),
                    api_key_env,
                    generation.temperature,
                    generation.max_tokens,
                    timeout,
                )?),
                GenerationBackendConfig::HuggingFace {
                    base_url,
                    model,
                    api_key,
                    api_key_env,
                } => Arc::new(HuggingFaceBackend::new(
                    base_url,
                    model,
                    api_key.as_deref(),
                    api_key_env,
                    generation.temperature,
                    generation.max_tokens,
                    timeout,
                )?),
                GenerationBackendConfig::Ollama { base_url, model } => {
                    Arc::new(OllamaBackend::from_client(
                        ollama_clients.get(base_url, timeout)?,
                        model,
                        generation.temperature,
                        generation.max_tokens,
                    ))
                }
            })
        })
        .collect()
}

/// One shared client per Ollama base URL
#[derive(Default)]
struct OllamaClients {
    clients: HashMap<String, Arc<OllamaClient>>,
}

impl OllamaClients {
    fn get(&mut self, base_url: &str, timeout: Duration) -> Result<Arc<OllamaClient>> {
        if let Some(client) = self.clients.get(base_url) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(OllamaClient::new(base_url, timeout)?);
        self.clients.insert(base_url.to_string(), Arc::clone(&client));
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_default_cascades() {
        let config = RagConfig::default();

        let embedders = build_embedding_providers(&config).unwrap();
        assert_eq!(embedders.len(), 1);
        assert_eq!(embedders[0].name(), "hash-embeddings");
        assert!(embedders[0].is_local());

        let backends = build_generation_backends(&config).unwrap();
        assert_eq!(backends.len(), 1);
        assert_eq!(backends[0].name(), "ollama:phi3");
    }

    #[test]
    fn test_build_preserves_order() {
        let mut config = RagConfig::default();
        config.embeddings.providers = vec![
            EmbeddingProviderConfig::OpenAi {
                base_url: "http://127.0.0.1:9".to_string(),
                model: "text-embedding-ada-002".to_string(),
                dimensions: 1536,
                api_key: None,
                api_key_env: "MULTIHOP_RAG_TEST_NEVER_SET".to_string(),
            },
            EmbeddingProviderConfig::Hash { dimensions: 384 },
        ];
        config.generation.backends = vec![
            GenerationBackendConfig::HuggingFace {
                base_url: "http://127.0.0.1:9".to_string(),
                model: "google/flan-t5-large".to_string(),
                api_key: None,
                api_key_env: "MULTIHOP_RAG_TEST_NEVER_SET".to_string(),
            },
            GenerationBackendConfig::Ollama {
                base_url: "http://127.0.0.1:9".to_string(),
                model: "llama3".to_string(),
            },
        ];

        let names: Vec<String> = build_embedding_providers(&config)
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["openai-embeddings", "hash-embeddings"]);

        let names: Vec<String> = build_generation_backends(&config)
            .unwrap()
            .iter()
            .map(|b| b.name().to_string())
            .collect();
        assert_eq!(names, vec!["huggingface:google/flan-t5-large", "ollama:llama3"]);
    }
}
