//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OpenAiEmbedder`: OpenAI-compatible `/embeddings` API
/// - `OllamaEmbedder`: Local Ollama server (nomic-embed-text)
/// - `HashEmbedder`: Deterministic feature hashing, no network
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate one embedding per input text, in input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate the embedding for a single query
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::provider(self.name(), "no embedding returned for query"))
    }

    /// Embedding dimensions (e.g. 1536 for ada-002, 384 for the hash embedder)
    fn dimensions(&self) -> usize;

    /// Minimum similarity a chunk needs to be considered relevant
    /// when both vectors come from this provider
    fn similarity_threshold(&self) -> f32;

    /// Whether the provider runs without any network access
    fn is_local(&self) -> bool {
        false
    }

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Fill `embedding` on every chunk using one batch call.
///
/// Used by the ingestion side; chunks are returned in the same order.
pub async fn embed_chunks(
    provider: &dyn EmbeddingProvider,
    mut chunks: Vec<Chunk>,
) -> Result<Vec<Chunk>> {
    if chunks.is_empty() {
        return Ok(chunks);
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = provider.embed(&texts).await?;

    if embeddings.len() != chunks.len() {
        return Err(Error::provider(
            provider.name(),
            format!("expected {} embeddings, got {}", chunks.len(), embeddings.len()),
        ));
    }

    for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
        chunk.embedding = embedding;
    }

    tracing::debug!("Embedded {} chunks with {}", chunks.len(), provider.name());
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashEmbedder;
    use crate::types::Category;

    #[tokio::test]
    async fn test_embed_chunks_fills_vectors_in_order() {
        let embedder = HashEmbedder::new(128).unwrap();
        let chunks = vec![
            Chunk::new("a", "Grievance procedure for staff", "d1", "policy.pdf", Category::Policy, 0),
            Chunk::new("b", "Supervision notes from Monday", "d2", "session.txt", Category::Transcript, 0),
        ];

        let embedded = embed_chunks(&embedder, chunks).await.unwrap();
        assert!(embedded.iter().all(|c| c.embedding.len() == 128));

        let direct = embedder.embed_query("Supervision notes from Monday").await.unwrap();
        assert_eq!(embedded[1].embedding, direct);
    }
}
