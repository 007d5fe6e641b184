//! In-memory chunk store keyed by document

use dashmap::DashMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Category, Chunk, CorpusStats};

use super::ChunkStore;

/// Chunk store holding each document's chunks in `chunk_index` order
#[derive(Debug, Default)]
pub struct InMemoryChunkStore {
    documents: DashMap<String, Vec<Chunk>>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a flat chunk list, grouping by document
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        let store = Self::new();
        for chunk in chunks {
            store
                .documents
                .entry(chunk.metadata.document_id.clone())
                .or_default()
                .push(chunk);
        }
        for mut entry in store.documents.iter_mut() {
            entry.value_mut().sort_by_key(|c| c.metadata.chunk_index);
        }
        store
    }

    /// Replace every chunk of `document_id` with `chunks`.
    ///
    /// Chunks belonging to another document are rejected. Existing chunks
    /// are dropped, never edited.
    pub fn replace_document(&self, document_id: &str, mut chunks: Vec<Chunk>) -> Result<usize> {
        if let Some(stray) = chunks.iter().find(|c| c.metadata.document_id != document_id) {
            return Err(Error::storage(format!(
                "chunk {} belongs to document {}, not {}",
                stray.id, stray.metadata.document_id, document_id
            )));
        }

        chunks.sort_by_key(|c| c.metadata.chunk_index);
        let count = chunks.len();

        self.documents.remove(document_id);
        if !chunks.is_empty() {
            self.documents.insert(document_id.to_string(), chunks);
        }

        tracing::debug!("Stored {} chunks for document {}", count, document_id);
        Ok(count)
    }

    /// Remove a document and all its chunks; returns how many chunks went
    pub fn delete_document(&self, document_id: &str) -> usize {
        self.documents
            .remove(document_id)
            .map(|(_, chunks)| chunks.len())
            .unwrap_or(0)
    }

    /// Total number of chunks
    pub fn len(&self) -> usize {
        self.documents.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn stats(&self) -> CorpusStats {
        let mut stats = CorpusStats {
            documents: self.documents.len(),
            ..Default::default()
        };
        for entry in self.documents.iter() {
            for chunk in entry.value() {
                match chunk.category() {
                    Category::Transcript => stats.transcript_chunks += 1,
                    Category::Policy => stats.policy_chunks += 1,
                }
                if chunk.is_embedded() {
                    stats.embedded_chunks += 1;
                }
            }
        }
        stats
    }

    /// Load a JSON array of chunks; a missing file yields an empty store
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No chunk snapshot at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let raw = std::fs::read_to_string(path)?;
        let chunks: Vec<Chunk> = serde_json::from_str(&raw)?;
        tracing::info!("Loaded {} chunks from {}", chunks.len(), path.display());
        Ok(Self::from_chunks(chunks))
    }

    /// Write every chunk as a JSON array, creating parent directories
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.all_chunks())?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl ChunkStore for InMemoryChunkStore {
    /// Snapshot ordered by document id, then chunk index
    fn all_chunks(&self) -> Vec<Chunk> {
        let mut documents: Vec<(String, Vec<Chunk>)> = self
            .documents
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        documents.sort_by(|a, b| a.0.cmp(&b.0));
        documents.into_iter().flat_map(|(_, chunks)| chunks).collect()
    }
}
