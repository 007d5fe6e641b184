//! Threshold filtering and top-K selection over a chunk snapshot

use crate::types::{Category, Chunk, RankedChunk};

use super::similarity::cosine_similarity_lenient;

/// Rank `chunks` against `query`.
///
/// Chunks without an embedding are skipped. Scores come from the lenient
/// cosine, so a chunk of the wrong dimensionality scores 0 and only survives
/// a non-positive threshold. Ties keep input order.
pub fn rank(query: &[f32], chunks: &[Chunk], top_k: usize, threshold: f32) -> Vec<RankedChunk> {
    rank_iter(query, chunks.iter(), top_k, threshold)
}

/// Rank only the chunks in `category`
pub fn rank_by_category(
    query: &[f32],
    chunks: &[Chunk],
    category: Category,
    top_k: usize,
    threshold: f32,
) -> Vec<RankedChunk> {
    rank_iter(
        query,
        chunks.iter().filter(|c| c.category() == category),
        top_k,
        threshold,
    )
}

fn rank_iter<'a>(
    query: &[f32],
    chunks: impl Iterator<Item = &'a Chunk>,
    top_k: usize,
    threshold: f32,
) -> Vec<RankedChunk> {
    let mut scored: Vec<(f32, &Chunk)> = chunks
        .filter(|c| c.is_embedded())
        .map(|c| (cosine_similarity_lenient(query, &c.embedding), c))
        .filter(|(score, _)| *score >= threshold)
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(score, chunk)| RankedChunk::new(chunk.clone(), score))
        .collect()
}

/// Merge ranked lists into one, highest similarity first, ties by list order
pub fn fuse(lists: &[&[RankedChunk]], top_n: usize) -> Vec<RankedChunk> {
    let mut fused: Vec<RankedChunk> = lists.iter().flat_map(|l| l.iter().cloned()).collect();
    fused.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    fused.truncate(top_n);
    fused
}
