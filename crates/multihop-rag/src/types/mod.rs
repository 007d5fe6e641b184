//! Core types for the retrieval system

pub mod chunk;
pub mod query;
pub mod response;

pub use chunk::{corpus_dimensions, Category, Chunk, ChunkMetadata, RankedChunk};
pub use query::{validate_query, EmbedRequest, QueryRequest};
pub use response::{AnswerPath, AnswerResponse, CorpusStats, EmbedResponse, SourceRef};
