//! Configuration for the retrieval system

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Smallest dimensionality accepted for the hash embedder
pub const MIN_HASH_DIMENSIONS: usize = 64;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Embedding providers, in cascade order
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Generation backends, in cascade order
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Ranking and fusion parameters
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Content analysis fallback parameters
    #[serde(default)]
    pub fallback: FallbackConfig,
    /// Chunk store configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if self.embeddings.providers.is_empty() {
            return Err(Error::Config("at least one embedding provider is required".into()));
        }
        for provider in &self.embeddings.providers {
            if let EmbeddingProviderConfig::Hash { dimensions } = provider {
                if *dimensions < MIN_HASH_DIMENSIONS {
                    return Err(Error::Config(format!(
                        "hash embedder needs at least {} dimensions, got {}",
                        MIN_HASH_DIMENSIONS, dimensions
                    )));
                }
            }
        }
        let r = &self.retrieval;
        if r.transcript_top_k == 0 || r.policy_top_k == 0 || r.fused_top_n == 0 {
            return Err(Error::Config("top-k values must be positive".into()));
        }
        if r.max_query_chars == 0 {
            return Err(Error::Config("max_query_chars must be positive".into()));
        }
        if self.generation.timeout_secs == 0 {
            return Err(Error::Config("generation.timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

/// Embedding provider cascade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Providers tried in order; the first is used for ingestion
    pub providers: Vec<EmbeddingProviderConfig>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            providers: vec![EmbeddingProviderConfig::Hash { dimensions: 384 }],
        }
    }
}

/// One embedding provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EmbeddingProviderConfig {
    /// OpenAI-compatible `/embeddings` API
    OpenAi {
        #[serde(default = "default_openai_base_url")]
        base_url: String,
        #[serde(default = "default_openai_embed_model")]
        model: String,
        #[serde(default = "default_openai_dimensions")]
        dimensions: usize,
        /// Inline API key (takes precedence over `api_key_env`)
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
    },
    /// Ollama `/api/embeddings`
    Ollama {
        #[serde(default = "default_ollama_base_url")]
        base_url: String,
        #[serde(default = "default_ollama_embed_model")]
        model: String,
        #[serde(default = "default_ollama_dimensions")]
        dimensions: usize,
    },
    /// Deterministic local hash embedder
    Hash {
        #[serde(default = "default_hash_dimensions")]
        dimensions: usize,
    },
}

impl EmbeddingProviderConfig {
    /// Name the provider reports, used as the threshold override key
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAi { .. } => "openai-embeddings",
            Self::Ollama { .. } => "ollama-embeddings",
            Self::Hash { .. } => "hash-embeddings",
        }
    }
}

/// Generation backend cascade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Backends tried in order
    pub backends: Vec<GenerationBackendConfig>,
    /// Per-call timeout applied to every embedding and generation call
    pub timeout_secs: u64,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backends: vec![GenerationBackendConfig::Ollama {
                base_url: default_ollama_base_url(),
                model: "phi3".to_string(),
            }],
            timeout_secs: 60,
            temperature: 0.3, // Lower for more factual answers
            max_tokens: 800,
        }
    }
}

/// One generation backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GenerationBackendConfig {
    /// OpenAI-compatible chat completions
    OpenAi {
        #[serde(default = "default_openai_base_url")]
        base_url: String,
        #[serde(default = "default_openai_chat_model")]
        model: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
    },
    /// Hugging Face hosted inference (text generation)
    HuggingFace {
        #[serde(default = "default_hf_base_url")]
        base_url: String,
        model: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_hf_key_env")]
        api_key_env: String,
    },
    /// Ollama `/api/generate`
    Ollama {
        #[serde(default = "default_ollama_base_url")]
        base_url: String,
        model: String,
    },
}

/// Ranking and fusion parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Transcript chunks kept per query
    pub transcript_top_k: usize,
    /// Policy chunks kept per query
    pub policy_top_k: usize,
    /// Fused candidates handed to generation
    pub fused_top_n: usize,
    /// Longest accepted query, in characters
    pub max_query_chars: usize,
    /// Excerpt length for cited sources
    pub excerpt_chars: usize,
    /// Per-provider threshold overrides keyed by provider name
    #[serde(default)]
    pub thresholds: HashMap<String, f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            transcript_top_k: 3,
            policy_top_k: 3,
            fused_top_n: 8,
            max_query_chars: 2000,
            excerpt_chars: 300,
            thresholds: HashMap::new(),
        }
    }
}

/// Content analysis fallback parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Excerpt length for fallback sources
    pub excerpt_chars: usize,
    /// Maximum sources returned by the analyzer
    pub max_sources: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            excerpt_chars: 200,
            max_sources: 5,
        }
    }
}

/// Chunk store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding the chunk snapshot (loaded at startup if present)
    pub chunks_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let chunks_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("multihop-rag")
            .join("chunks.json");

        Self { chunks_path }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_embed_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_openai_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_dimensions() -> usize {
    1536
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_hf_base_url() -> String {
    "https://api-inference.huggingface.co/models".to_string()
}

fn default_hf_key_env() -> String {
    "HUGGINGFACE_API_KEY".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_embed_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_ollama_dimensions() -> usize {
    768
}

fn default_hash_dimensions() -> usize {
    384
}

/// Resolve an API key: inline value first, then the named environment variable.
///
/// Blank values count as missing.
pub fn resolve_api_key(inline: Option<&str>, env_var: &str) -> Option<String> {
    let present = |k: &str| !k.trim().is_empty();
    inline
        .filter(|k| present(k))
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok().filter(|k| present(k)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval.fused_top_n, 8);
        assert_eq!(config.retrieval.transcript_top_k, 3);
    }

    #[test]
    fn test_from_file_with_cascades() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 9000
enable_cors = false

[embeddings]
providers = [
    {{ kind = "openai", api_key_env = "TEST_KEY_UNSET" }},
    {{ kind = "hash", dimensions = 128 }},
]

[generation]
timeout_secs = 10
temperature = 0.2
max_tokens = 256
backends = [
    {{ kind = "openai" }},
    {{ kind = "huggingface", model = "mistralai/Mistral-7B-Instruct-v0.2" }},
]

[retrieval]
transcript_top_k = 4
policy_top_k = 2
fused_top_n = 6
max_query_chars = 500
excerpt_chars = 120

[retrieval.thresholds]
hash-embeddings = 0.05
"#
        )
        .unwrap();

        let config = RagConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.embeddings.providers.len(), 2);
        assert_eq!(
            config.embeddings.providers[1],
            EmbeddingProviderConfig::Hash { dimensions: 128 }
        );
        match &config.embeddings.providers[0] {
            EmbeddingProviderConfig::OpenAi { dimensions, model, .. } => {
                assert_eq!(*dimensions, 1536);
                assert_eq!(model, "text-embedding-ada-002");
            }
            other => panic!("unexpected provider {:?}", other),
        }
        assert_eq!(config.generation.backends.len(), 2);
        assert_eq!(config.retrieval.thresholds.get("hash-embeddings"), Some(&0.05));
        // Sections left out fall back to defaults
        assert_eq!(config.fallback.max_sources, 5);
    }

    #[test]
    fn test_validate_rejects_small_hash_dimensions() {
        let mut config = RagConfig::default();
        config.embeddings.providers = vec![EmbeddingProviderConfig::Hash { dimensions: 16 }];
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_provider_list() {
        let mut config = RagConfig::default();
        config.embeddings.providers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_api_key_prefers_inline() {
        assert_eq!(
            resolve_api_key(Some("sk-inline"), "MULTIHOP_RAG_TEST_NEVER_SET"),
            Some("sk-inline".to_string())
        );
        assert_eq!(resolve_api_key(Some("  "), "MULTIHOP_RAG_TEST_NEVER_SET"), None);
        assert_eq!(resolve_api_key(None, "MULTIHOP_RAG_TEST_NEVER_SET"), None);
    }

    #[test]
    fn test_resolve_api_key_blank_inline_falls_back_to_env() {
        let var = "MULTIHOP_RAG_TEST_BLANK_INLINE_KEY";
        std::env::set_var(var, "sk-from-env");
        assert_eq!(resolve_api_key(Some(""), var), Some("sk-from-env".to_string()));
        assert_eq!(resolve_api_key(Some("   "), var), Some("sk-from-env".to_string()));

        std::env::set_var(var, " ");
        assert_eq!(resolve_api_key(Some(""), var), None);
        std::env::remove_var(var);
    }
}
