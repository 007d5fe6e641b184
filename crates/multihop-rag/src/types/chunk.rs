//! Chunk types shared by the storage, retrieval and synthesis layers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Partition label of a chunk's source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Conversational transcript (e.g. a supervision session)
    Transcript,
    /// Policy document
    Policy,
}

impl Category {
    /// Both partitions, in retrieval order
    pub const ALL: [Category; 2] = [Category::Transcript, Category::Policy];

    /// Lowercase label used in prompts and serialized output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transcript => "transcript",
            Self::Policy => "policy",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "transcript" | "transcripts" => Ok(Self::Transcript),
            "policy" | "policies" => Ok(Self::Policy),
            other => Err(Error::storage(format!("unknown category '{}'", other))),
        }
    }
}

/// Source document information carried by every chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    /// Owning document ID
    pub document_id: String,
    /// Display name of the owning document (used in citations)
    pub document_name: String,
    /// Partition of the owning document
    pub category: Category,
    /// Position within the source document (0-based)
    pub chunk_index: u32,
}

/// A retrievable unit of source text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Opaque unique chunk ID
    pub id: String,
    /// Extracted text content
    pub text: String,
    /// Embedding vector; empty means "not yet embedded"
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Source information
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a chunk without an embedding
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        document_id: impl Into<String>,
        document_name: impl Into<String>,
        category: Category,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            embedding: Vec::new(),
            metadata: ChunkMetadata {
                document_id: document_id.into(),
                document_name: document_name.into(),
                category,
                chunk_index,
            },
        }
    }

    /// Attach an embedding (builder style)
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    /// Whether the chunk carries a vector
    pub fn is_embedded(&self) -> bool {
        !self.embedding.is_empty()
    }

    pub fn category(&self) -> Category {
        self.metadata.category
    }

    pub fn document_name(&self) -> &str {
        &self.metadata.document_name
    }
}

/// A chunk scored against one query. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedChunk {
    /// The scored chunk
    pub chunk: Chunk,
    /// Relevance score for the query
    pub similarity: f32,
}

impl RankedChunk {
    pub fn new(chunk: Chunk, similarity: f32) -> Self {
        Self { chunk, similarity }
    }
}

/// Embedding dimensionality shared by every embedded chunk, if consistent.
///
/// Returns `None` when no chunk is embedded or when dimensionalities differ.
pub fn corpus_dimensions(chunks: &[Chunk]) -> Option<usize> {
    let mut dims = chunks.iter().filter(|c| c.is_embedded()).map(|c| c.embedding.len());
    let first = dims.next()?;
    dims.all(|d| d == first).then_some(first)
}
