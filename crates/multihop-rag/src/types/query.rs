//! Query request types

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Query request for the answer pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,
}

impl QueryRequest {
    /// Create a new query
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }
}

/// Validate a raw query before it enters the pipeline.
///
/// Returns the trimmed query. Blank queries and queries longer than
/// `max_chars` characters are rejected.
pub fn validate_query(query: &str, max_chars: usize) -> Result<&str> {
    let trimmed = query.trim();

    if trimmed.is_empty() {
        return Err(Error::invalid_query("query must not be empty"));
    }

    let len = trimmed.chars().count();
    if len > max_chars {
        return Err(Error::invalid_query(format!(
            "query is {} characters, maximum is {}",
            len, max_chars
        )));
    }

    Ok(trimmed)
}

/// Request body for the embedding endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRequest {
    /// Texts to embed, in order
    pub texts: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_query() {
        assert_eq!(validate_query("  What is the policy? ", 100).unwrap(), "What is the policy?");
        assert!(matches!(validate_query("   ", 100), Err(Error::InvalidQuery(_))));
        assert!(matches!(validate_query("abcdef", 5), Err(Error::InvalidQuery(_))));
    }
}
