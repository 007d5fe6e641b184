//! Application state for the query server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::ResponseSynthesizer;
use crate::providers::EmbeddingProvider;
use crate::storage::{ChunkStore, InMemoryChunkStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Chunk corpus
    store: Arc<InMemoryChunkStore>,
    /// Query pipeline
    synthesizer: ResponseSynthesizer,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Load the chunk snapshot and build the pipeline from configuration
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing query server state...");

        let store = Arc::new(InMemoryChunkStore::load_json(&config.storage.chunks_path)?);
        let stats = store.stats();
        tracing::info!(
            "Corpus: {} documents, {} transcript chunks, {} policy chunks ({} embedded)",
            stats.documents,
            stats.transcript_chunks,
            stats.policy_chunks,
            stats.embedded_chunks
        );

        let synthesizer =
            ResponseSynthesizer::from_config(&config, Arc::clone(&store) as Arc<dyn ChunkStore>)?;
        let state = Self::from_parts(config, store, synthesizer);
        state.set_ready(true);

        tracing::info!("Query server state initialized");
        Ok(state)
    }

    /// Assemble state from prebuilt parts; starts not ready
    pub fn from_parts(
        config: RagConfig,
        store: Arc<InMemoryChunkStore>,
        synthesizer: ResponseSynthesizer,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                synthesizer,
                ready: RwLock::new(false),
            }),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<InMemoryChunkStore> {
        &self.inner.store
    }

    pub fn synthesizer(&self) -> &ResponseSynthesizer {
        &self.inner.synthesizer
    }

    /// Provider used for ingestion embeddings
    pub fn primary_provider(&self) -> Result<&Arc<dyn EmbeddingProvider>> {
        self.inner
            .synthesizer
            .primary_provider()
            .ok_or_else(|| Error::Config("no embedding provider configured".into()))
    }

    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
