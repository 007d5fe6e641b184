//! Excerpt helpers for cited passages

/// Truncate snippet to a maximum length while preserving word boundaries
pub fn truncate_snippet(snippet: &str, max_len: usize) -> String {
    let snippet = snippet.trim();
    if snippet.len() <= max_len {
        return snippet.to_string();
    }

    // Find a char boundary at or before max_len
    let mut end = max_len;
    while end > 0 && !snippet.is_char_boundary(end) {
        end -= 1;
    }

    // Try to end at a word boundary
    if let Some(pos) = snippet[..end].rfind(char::is_whitespace) {
        if pos > 0 {
            return format!("{}...", snippet[..pos].trim_end());
        }
    }

    format!("{}...", &snippet[..end])
}

/// Split text into sentences, keeping terminal punctuation
pub fn split_sentences(text: &str) -> Vec<&str> {
    static SENTENCE: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| {
        regex::Regex::new(r"[^.!?\n]+[.!?]*").expect("Invalid regex")
    });

    SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Sentences of `text` that mention any of `terms` (case-insensitive)
pub fn sentences_mentioning<'a>(text: &'a str, terms: &[&str]) -> Vec<&'a str> {
    split_sentences(text)
        .into_iter()
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            terms.iter().any(|t| lower.contains(t))
        })
        .collect()
}
