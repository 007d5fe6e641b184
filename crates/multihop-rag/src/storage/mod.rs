//! Chunk storage collaborator
//!
//! The answer pipeline only reads snapshots through `ChunkStore`; ingestion
//! replaces whole documents.

mod memory;

pub use memory::InMemoryChunkStore;

use crate::types::{Category, Chunk};

/// Read access to the chunk corpus
pub trait ChunkStore: Send + Sync {
    /// Owned snapshot of every chunk
    fn all_chunks(&self) -> Vec<Chunk>;

    /// Owned snapshot of the chunks in one partition
    fn chunks_by_category(&self, category: Category) -> Vec<Chunk> {
        self.all_chunks()
            .into_iter()
            .filter(|c| c.category() == category)
            .collect()
    }
}
