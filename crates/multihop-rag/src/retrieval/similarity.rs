//! Cosine similarity between embedding vectors
//!
//! Two contracts are offered. `cosine_similarity` is strict and rejects
//! vectors of different length. `cosine_similarity_lenient` scores such pairs
//! as 0 and is what ranking uses, so a stray vector never aborts a query.

use crate::error::{Error, Result};

/// Cosine similarity of two equal-length vectors, in [-1, 1].
///
/// Returns 0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(cosine(a, b))
}

/// Cosine similarity that scores mismatched lengths as 0
pub fn cosine_similarity_lenient(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    cosine(a, b)
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_nan() {
        0.0
    } else {
        // Rounding can push parallel vectors just past 1.0
        score.clamp(-1.0, 1.0)
    }
}
