//! Response types for answered queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chunk::{Category, RankedChunk};
use crate::generation::citation::truncate_snippet;

/// A cited source passage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    /// Display name of the source document
    pub document_name: String,
    /// Chunk ID
    pub chunk_id: String,
    /// Bounded excerpt of the chunk text
    pub excerpt_text: String,
    /// Partition of the source document
    pub category: Category,
    /// Relevance score that selected this passage
    pub similarity: f32,
}

impl SourceRef {
    /// Build a source reference from a ranked chunk, excerpting to `max_chars`
    pub fn from_ranked(ranked: &RankedChunk, max_chars: usize) -> Self {
        Self {
            document_name: ranked.chunk.metadata.document_name.clone(),
            chunk_id: ranked.chunk.id.clone(),
            excerpt_text: truncate_snippet(&ranked.chunk.text, max_chars),
            category: ranked.chunk.metadata.category,
            similarity: ranked.similarity,
        }
    }
}

/// Terminal state that produced an answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerPath {
    /// A generation backend answered over ranked context
    Generated { backend: String },
    /// The rule-based content analyzer answered
    ContentAnalysis,
    /// The corpus holds no chunks at all
    NothingIndexed,
    /// Vector search ran but nothing passed the threshold
    NoRelevantInformation,
}

/// Answer returned to the API layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    /// Query ID for log correlation
    pub query_id: Uuid,
    /// Answer text
    pub answer: String,
    /// Cited sources, most relevant first
    pub sources: Vec<SourceRef>,
    /// Diagnostic trace of the path that produced the answer
    pub reasoning: String,
    /// Which terminal state answered
    pub path: AnswerPath,
    /// When the answer was produced
    pub generated_at: DateTime<Utc>,
}

impl AnswerResponse {
    pub fn new(answer: String, sources: Vec<SourceRef>, reasoning: String, path: AnswerPath) -> Self {
        Self {
            query_id: Uuid::new_v4(),
            answer,
            sources,
            reasoning,
            path,
            generated_at: Utc::now(),
        }
    }

    /// Answer for an empty corpus
    pub fn nothing_indexed(reasoning: String) -> Self {
        Self::new(
            "No documents have been indexed yet. Please upload transcripts or policy documents \
             first, then ask your question again."
                .to_string(),
            Vec::new(),
            reasoning,
            AnswerPath::NothingIndexed,
        )
    }

    /// Answer when vector search found nothing above the threshold
    pub fn no_relevant_information(reasoning: String) -> Self {
        Self::new(
            "I couldn't find relevant information in the transcripts or policy documents to \
             answer this question. Try rephrasing it or uploading related documents."
                .to_string(),
            Vec::new(),
            reasoning,
            AnswerPath::NoRelevantInformation,
        )
    }

    /// Whether the answer came from a generation backend
    pub fn is_generated(&self) -> bool {
        matches!(self.path, AnswerPath::Generated { .. })
    }
}

/// Response from the embedding endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    /// One vector per input text, same order
    pub embeddings: Vec<Vec<f32>>,
    /// Provider that produced the vectors
    pub provider: String,
    /// Vector dimensionality
    pub dimensions: usize,
}

/// Corpus statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorpusStats {
    pub documents: usize,
    pub transcript_chunks: usize,
    pub policy_chunks: usize,
    pub embedded_chunks: usize,
}
