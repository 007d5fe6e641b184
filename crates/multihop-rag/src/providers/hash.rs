//! Deterministic hash-based embedder
//!
//! Produces stable vectors without any model or network access. Words are
//! folded into hashed dimensions, topic keywords light up reserved leading
//! dimensions and capitalised names get an extra boost, so vectors from this
//! provider still separate "who" and "what" reasonably well for demos and tests.

use async_trait::async_trait;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::MIN_HASH_DIMENSIONS;
use crate::error::{Error, Result};
use crate::lexicon;

use super::embedding::EmbeddingProvider;

/// Leading dimensions reserved for topic features
const TOPIC_DIMS: usize = 16;

/// Weight of a plain word feature
const WORD_WEIGHT: f32 = 1.0;

/// Extra weight on the hashed dimension of a named entity
const ENTITY_BOOST: f32 = 1.5;

/// Weight added to a topic dimension per matching word
const TOPIC_BOOST: f32 = 2.0;

/// Topic keyword groups; the index is the reserved dimension
const TOPICS: &[&[&str]] = &[
    lexicon::STRESS,
    lexicon::FINANCIAL,
    lexicon::EMPLOYMENT,
    lexicon::GRIEVANCE,
    lexicon::POLICY,
    lexicon::SUPERVISION,
    lexicon::FAMILY,
    lexicon::HEALTH,
    lexicon::COMPARISON,
];

/// Capitalised words that are sentence starters rather than names
const COMMON_CAPITALISED: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "but", "can", "could", "did", "do", "does", "for",
    "he", "her", "his", "how", "i", "if", "in", "is", "it", "my", "of", "on", "or", "our",
    "she", "so", "that", "the", "their", "then", "there", "they", "this", "to", "we", "what",
    "when", "where", "which", "who", "why", "will", "with", "would", "you", "your",
];

/// Deterministic local embedding provider
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Create a hash embedder producing `dimensions`-long vectors
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions < MIN_HASH_DIMENSIONS {
            return Err(Error::Config(format!(
                "hash embedder needs at least {} dimensions, got {}",
                MIN_HASH_DIMENSIONS, dimensions
            )));
        }
        Ok(Self { dimensions })
    }

    /// Embed a single text (pure function of the input)
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let feature_space = (self.dimensions - TOPIC_DIMS) as u32;

        for word in text.unicode_words() {
            let folded = word.to_lowercase();
            let lower = lexicon::strip_possessive(&folded);
            let dim = TOPIC_DIMS + (rolling_hash(lower) % feature_space) as usize;

            vector[dim] += WORD_WEIGHT;
            if is_entity(word, lower) {
                vector[dim] += ENTITY_BOOST;
            }

            for topic in topics_of(lower) {
                vector[topic] += TOPIC_BOOST;
            }
        }

        normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn similarity_threshold(&self) -> f32 {
        // Hashed word overlap yields low cosine values even for good matches
        0.05
    }

    fn is_local(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "hash-embeddings"
    }
}

/// Rolling 31-multiplier hash over the UTF-8 bytes
pub fn rolling_hash(s: &str) -> u32 {
    s.bytes()
        .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)))
}

fn is_entity(original: &str, lower: &str) -> bool {
    original.chars().next().is_some_and(char::is_uppercase)
        && lower.chars().count() > 1
        && !COMMON_CAPITALISED.contains(&lower)
}

fn topics_of(lower: &str) -> impl Iterator<Item = usize> + '_ {
    TOPICS.iter().enumerate().filter_map(move |(i, keywords)| {
        lexicon::in_group(lower, keywords).then_some(i)
    })
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}
