//! Multi-hop retrieval: one query probes the transcript and policy partitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::providers::EmbeddingProvider;
use crate::types::{Category, Chunk, RankedChunk};

use super::ranker::{fuse, rank_by_category};

/// Ranked matches from both partitions for one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Transcript matches, best first
    pub transcript_chunks: Vec<RankedChunk>,
    /// Policy matches, best first
    pub policy_chunks: Vec<RankedChunk>,
    /// Query vector both rankings used
    pub query_embedding: Vec<f32>,
}

impl RetrievalResult {
    /// Merge both partitions into one list of at most `top_n`
    pub fn fuse(&self, top_n: usize) -> Vec<RankedChunk> {
        fuse(&[&self.transcript_chunks, &self.policy_chunks], top_n)
    }

    pub fn is_empty(&self) -> bool {
        self.transcript_chunks.is_empty() && self.policy_chunks.is_empty()
    }
}

/// Retriever bound to one embedding provider
pub struct MultiHopRetriever {
    provider: Arc<dyn EmbeddingProvider>,
    threshold: f32,
}

impl MultiHopRetriever {
    /// Create a retriever using the provider's own threshold
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let threshold = provider.similarity_threshold();
        Self { provider, threshold }
    }

    /// Create a retriever, taking the threshold from `overrides` when the
    /// provider's name is present
    pub fn with_overrides(provider: Arc<dyn EmbeddingProvider>, overrides: &HashMap<String, f32>) -> Self {
        let threshold = overrides
            .get(provider.name())
            .copied()
            .unwrap_or_else(|| provider.similarity_threshold());
        Self { provider, threshold }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Embed `query` once and rank both partitions against it.
    ///
    /// Embedding failures propagate; the caller decides how to fall back.
    pub async fn retrieve(
        &self,
        query: &str,
        chunks: &[Chunk],
        transcript_top_k: usize,
        policy_top_k: usize,
    ) -> Result<RetrievalResult> {
        let query_embedding = self.provider.embed_query(query).await?;

        let transcript_chunks = rank_by_category(
            &query_embedding,
            chunks,
            Category::Transcript,
            transcript_top_k,
            self.threshold,
        );
        let policy_chunks = rank_by_category(
            &query_embedding,
            chunks,
            Category::Policy,
            policy_top_k,
            self.threshold,
        );

        tracing::debug!(
            "{} retrieved {} transcript and {} policy chunks (threshold {})",
            self.provider.name(),
            transcript_chunks.len(),
            policy_chunks.len(),
            self.threshold
        );

        Ok(RetrievalResult {
            transcript_chunks,
            policy_chunks,
            query_embedding,
        })
    }
}
