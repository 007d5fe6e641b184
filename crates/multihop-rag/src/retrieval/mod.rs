//! Similarity scoring, ranking and multi-hop retrieval

pub mod multihop;
pub mod ranker;
pub mod similarity;

pub use multihop::{MultiHopRetriever, RetrievalResult};
pub use ranker::{fuse, rank, rank_by_category};
pub use similarity::{cosine_similarity, cosine_similarity_lenient};
