//! multihop-rag: multi-hop retrieval over transcript and policy corpora
//!
//! One query is embedded once and ranked against both partitions, the two
//! ranked lists are fused, and an ordered cascade of generation backends
//! answers over the fused context. When embedding or every backend fails, a
//! rule-based content analyzer still answers with cited sources.

pub mod config;
pub mod error;
pub mod generation;
pub mod lexicon;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use generation::{FallbackContentAnalyzer, ResponseSynthesizer, SynthesisState};
pub use providers::{EmbeddingProvider, GenerationBackend};
pub use retrieval::{MultiHopRetriever, RetrievalResult};
pub use storage::{ChunkStore, InMemoryChunkStore};
pub use types::{AnswerResponse, Category, Chunk, RankedChunk, SourceRef};
