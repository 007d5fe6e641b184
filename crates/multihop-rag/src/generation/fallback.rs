//! Rule-based content analysis used when vector search or every generation
//! backend is unavailable.
//!
//! Pure and infallible: keyword and entity scoring picks at most a handful of
//! chunks, then one of three answer templates is filled from their sentences.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::FallbackConfig;
use crate::lexicon;
use crate::types::{AnswerPath, AnswerResponse, Category, Chunk, RankedChunk, SourceRef};

use super::citation::{sentences_mentioning, split_sentences};

/// Score per query keyword found in the chunk text
const KEYWORD_SCORE: f32 = 0.3;

/// Boost for stress/financial content when the query asks about it
const TOPIC_SCORE: f32 = 0.4;

/// Boost when a named entity from the query appears in the document name
const ENTITY_SCORE: f32 = 0.5;

/// Fallback scores never claim near-certainty
const MAX_SCORE: f32 = 0.95;

/// Chunks must score above this to be cited
const MIN_SCORE: f32 = 0.2;

/// Sentences quoted in a templated answer
const MAX_SENTENCES: usize = 6;

const STOP_WORDS: &[&str] = &[
    "a", "about", "an", "and", "any", "are", "as", "at", "be", "been", "but", "by", "can",
    "could", "did", "do", "does", "for", "from", "had", "has", "have", "he", "her", "him",
    "his", "how", "i", "if", "in", "into", "is", "it", "its", "me", "my", "of", "on", "or",
    "our", "said", "say", "says", "she", "should", "so", "tell", "that", "the", "their",
    "them", "then", "there", "they", "this", "to", "us", "was", "we", "were", "what", "when",
    "where", "which", "who", "why", "will", "with", "would", "you", "your",
];

/// Topics the analyzer has dedicated templates for, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Stress,
    Employment,
    Grievance,
    Comparison,
}

impl Topic {
    const ALL: [Topic; 4] = [Topic::Stress, Topic::Employment, Topic::Grievance, Topic::Comparison];

    /// Word groups marking the topic in a query or chunk.
    ///
    /// Stress covers financial strain, and grievance covers policy terms, since
    /// the analyzer has one template for each pair.
    fn groups(self) -> &'static [&'static [&'static str]] {
        match self {
            Topic::Stress => &[lexicon::STRESS, lexicon::FINANCIAL],
            Topic::Employment => &[lexicon::EMPLOYMENT],
            Topic::Grievance => &[lexicon::GRIEVANCE, lexicon::POLICY],
            Topic::Comparison => &[lexicon::COMPARISON],
        }
    }

    fn matches(self, word: &str) -> bool {
        self.groups().iter().any(|group| lexicon::in_group(word, group))
    }

    fn label(self) -> &'static str {
        match self {
            Topic::Stress => "stress",
            Topic::Employment => "employment",
            Topic::Grievance => "grievance/policy",
            Topic::Comparison => "comparison",
        }
    }
}

/// Query reduced to the features the analyzer scores on
#[derive(Debug, Clone)]
struct QueryTerms {
    /// Lowercased content words
    keywords: Vec<String>,
    /// Keywords that look like names
    entities: Vec<String>,
    /// Topics the query mentions, in priority order
    topics: Vec<Topic>,
}

impl QueryTerms {
    fn parse(query: &str) -> Self {
        let mut keywords: Vec<String> = Vec::new();
        let mut entities: Vec<String> = Vec::new();

        for word in query.unicode_words() {
            let folded = word.to_lowercase();
            let lower = lexicon::strip_possessive(&folded).to_string();
            if lower.chars().count() < 3 || STOP_WORDS.contains(&lower.as_str()) {
                continue;
            }
            let capitalised = word.chars().next().is_some_and(char::is_uppercase);
            let topical = Topic::ALL.iter().any(|t| t.matches(&lower));
            if capitalised && !topical && !entities.contains(&lower) {
                entities.push(lower.clone());
            }
            if !keywords.contains(&lower) {
                keywords.push(lower);
            }
        }

        let topics = Topic::ALL
            .into_iter()
            .filter(|t| keywords.iter().any(|k| t.matches(k)))
            .collect();

        Self {
            keywords,
            entities,
            topics,
        }
    }

    fn asks_about_stress(&self) -> bool {
        self.topics.contains(&Topic::Stress)
    }
}

/// Keyword/entity content analyzer
#[derive(Debug, Clone)]
pub struct FallbackContentAnalyzer {
    excerpt_chars: usize,
    max_sources: usize,
}

impl Default for FallbackContentAnalyzer {
    fn default() -> Self {
        Self::new(&FallbackConfig::default())
    }
}

impl FallbackContentAnalyzer {
    pub fn new(config: &FallbackConfig) -> Self {
        Self {
            excerpt_chars: config.excerpt_chars,
            max_sources: config.max_sources,
        }
    }

    /// Score every chunk and keep the best matches, highest first
    pub fn select(&self, query: &str, chunks: &[Chunk]) -> Vec<RankedChunk> {
        let terms = QueryTerms::parse(query);
        self.select_with(&terms, chunks)
    }

    fn select_with(&self, terms: &QueryTerms, chunks: &[Chunk]) -> Vec<RankedChunk> {
        let mut scored: Vec<RankedChunk> = chunks
            .iter()
            .map(|c| RankedChunk::new(c.clone(), score(terms, c)))
            .filter(|r| r.similarity > MIN_SCORE)
            .collect();

        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(self.max_sources);
        scored
    }

    /// Produce an answer from `chunks` without any external call.
    ///
    /// `entry` describes how the pipeline got here and is prefixed to the
    /// reasoning trace.
    pub fn analyze(&self, query: &str, chunks: &[Chunk], entry: &str) -> AnswerResponse {
        let terms = QueryTerms::parse(query);
        let selected = self.select_with(&terms, chunks);
        self.respond(&terms, selected, chunks.len(), entry)
    }

    /// Like `analyze`, over chunks that vector search already ranked.
    ///
    /// When no chunk matches by keyword, the best vector-ranked chunks with a
    /// positive score are used instead, so semantic ranking still shapes the
    /// answer.
    pub fn analyze_ranked(&self, query: &str, ranked: &[RankedChunk], entry: &str) -> AnswerResponse {
        let terms = QueryTerms::parse(query);
        let chunks: Vec<Chunk> = ranked.iter().map(|r| r.chunk.clone()).collect();
        let mut selected = self.select_with(&terms, &chunks);

        if selected.is_empty() {
            selected = ranked
                .iter()
                .filter(|r| r.similarity > 0.0)
                .take(self.max_sources)
                .map(|r| RankedChunk::new(r.chunk.clone(), r.similarity.min(MAX_SCORE)))
                .collect();
        }

        self.respond(&terms, selected, ranked.len(), entry)
    }

    fn respond(
        &self,
        terms: &QueryTerms,
        selected: Vec<RankedChunk>,
        total: usize,
        entry: &str,
    ) -> AnswerResponse {
        if selected.is_empty() {
            let reasoning = format!(
                "{}; content analysis fallback found no passage matching the query among {} chunks",
                entry, total
            );
            return AnswerResponse::new(
                "I couldn't find content matching your question in the indexed transcripts or \
                 policy documents. Try rephrasing with specific names, topics or policy terms."
                    .to_string(),
                Vec::new(),
                reasoning,
                AnswerPath::ContentAnalysis,
            );
        }

        let (template, answer) = entity_answer(terms, &selected)
            .map(|a| ("entity".to_string(), a))
            .or_else(|| {
                terms.topics.iter().find_map(|topic| {
                    topic_answer(*topic, terms, &selected)
                        .map(|a| (format!("{} topic", topic.label()), a))
                })
            })
            .unwrap_or_else(|| ("generic summary".to_string(), summary_answer(&selected)));

        tracing::debug!("Content analysis used the {} template", template);

        let sources = selected
            .iter()
            .map(|r| SourceRef::from_ranked(r, self.excerpt_chars))
            .collect();
        let reasoning = format!(
            "{}; content analysis fallback ({} template) matched {} of {} chunks",
            entry,
            template,
            selected.len(),
            total
        );

        AnswerResponse::new(answer, sources, reasoning, AnswerPath::ContentAnalysis)
    }
}

fn score(terms: &QueryTerms, chunk: &Chunk) -> f32 {
    let text = chunk.text.to_lowercase();
    let mut score = 0.0f32;

    for keyword in &terms.keywords {
        if text.contains(keyword.as_str()) {
            score += KEYWORD_SCORE;
        }
    }

    if terms.asks_about_stress() && text.unicode_words().any(|w| Topic::Stress.matches(w)) {
        score += TOPIC_SCORE;
    }

    let document = chunk.document_name().to_lowercase();
    if terms.entities.iter().any(|e| document.contains(e.as_str())) {
        score += ENTITY_SCORE;
    }

    score.min(MAX_SCORE)
}

fn entity_answer(terms: &QueryTerms, selected: &[RankedChunk]) -> Option<String> {
    let entity = terms.entities.iter().find(|e| {
        selected
            .iter()
            .any(|r| r.chunk.document_name().to_lowercase().contains(e.as_str()))
    })?;

    let from_entity: Vec<&RankedChunk> = selected
        .iter()
        .filter(|r| r.chunk.document_name().to_lowercase().contains(entity.as_str()))
        .collect();

    let others: Vec<&str> = terms
        .keywords
        .iter()
        .filter(|k| *k != entity)
        .map(String::as_str)
        .collect();

    let mut lines = Vec::new();
    for ranked in &from_entity {
        let mut sentences = sentences_mentioning(&ranked.chunk.text, &others);
        if sentences.is_empty() {
            sentences = split_sentences(&ranked.chunk.text).into_iter().take(2).collect();
        }
        lines.extend(
            sentences
                .into_iter()
                .map(|s| format!("- {} ({})", s, ranked.chunk.document_name())),
        );
    }
    lines.truncate(MAX_SENTENCES);

    Some(format!(
        "Here is what the documents record about {}:\n{}",
        capitalise(entity),
        lines.join("\n")
    ))
}

fn topic_answer(topic: Topic, terms: &QueryTerms, selected: &[RankedChunk]) -> Option<String> {
    if topic == Topic::Comparison {
        let side = |category: Category| -> Vec<String> {
            selected
                .iter()
                .filter(|r| r.chunk.category() == category)
                .filter_map(|r| {
                    let keywords: Vec<&str> = terms.keywords.iter().map(String::as_str).collect();
                    sentences_mentioning(&r.chunk.text, &keywords)
                        .into_iter()
                        .next()
                        .or_else(|| split_sentences(&r.chunk.text).into_iter().next())
                        .map(|s| format!("- {} ({})", s, r.chunk.document_name()))
                })
                .collect()
        };
        let transcripts = side(Category::Transcript);
        let policies = side(Category::Policy);
        if transcripts.is_empty() || policies.is_empty() {
            return None;
        }
        return Some(format!(
            "Comparing what was discussed with what policy requires:\n\nIn the transcripts:\n{}\n\nIn the policy documents:\n{}",
            transcripts.join("\n"),
            policies.join("\n")
        ));
    }

    let mut lines: Vec<String> = selected
        .iter()
        .flat_map(|r| {
            split_sentences(&r.chunk.text)
                .into_iter()
                .filter(|s| mentions_topic(s, topic))
                .map(move |s| format!("- {} ({})", s, r.chunk.document_name()))
        })
        .collect();
    if lines.is_empty() {
        return None;
    }
    lines.truncate(MAX_SENTENCES);

    Some(format!(
        "The documents mention the following about {}:\n{}",
        topic.label(),
        lines.join("\n")
    ))
}

fn mentions_topic(sentence: &str, topic: Topic) -> bool {
    sentence
        .unicode_words()
        .any(|w| topic.matches(lexicon::strip_possessive(&w.to_lowercase())))
}

fn summary_answer(selected: &[RankedChunk]) -> String {
    let transcripts = selected
        .iter()
        .filter(|r| r.chunk.category() == Category::Transcript)
        .count();
    let policies = selected.len() - transcripts;

    let highlights: Vec<String> = selected
        .iter()
        .filter_map(|r| {
            split_sentences(&r.chunk.text)
                .into_iter()
                .next()
                .map(|s| format!("- {} ({})", s, r.chunk.document_name()))
        })
        .collect();

    format!(
        "I found {} relevant passage{} ({} from transcripts, {} from policy documents):\n{}",
        selected.len(),
        if selected.len() == 1 { "" } else { "s" },
        transcripts,
        policies,
        highlights.join("\n")
    )
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(id: &str, text: &str, doc: &str) -> Chunk {
        Chunk::new(id, text, id, doc, Category::Transcript, 0)
    }

    fn policy(id: &str, text: &str, doc: &str) -> Chunk {
        Chunk::new(id, text, id, doc, Category::Policy, 0)
    }

    #[test]
    fn test_nathan_stress_scenario() {
        let chunks = vec![transcript(
            "c1",
            "Nathan discussed stress about property taxes",
            "session-04.txt",
        )];

        let analyzer = FallbackContentAnalyzer::default();
        let response = analyzer.analyze("What did Nathan say about stress?", &chunks, "no embeddings");

        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].chunk_id, "c1");
        assert!(response.sources[0].similarity <= MAX_SCORE);
        assert!(response.sources[0].similarity > MIN_SCORE);
        assert_eq!(response.path, AnswerPath::ContentAnalysis);
        assert!(response.reasoning.contains("content analysis"));
        assert!(response.answer.contains("property taxes"));
    }

    #[test]
    fn test_entity_template_wins() {
        let chunks = vec![
            transcript("n", "We talked about his mortgage. He felt supported.", "Nathan - supervision.txt"),
            transcript("o", "Mortgage stress came up for the team.", "Team meeting.txt"),
        ];

        let analyzer = FallbackContentAnalyzer::default();
        let response = analyzer.analyze("What did Nathan say about his mortgage?", &chunks, "entry");

        assert!(response.reasoning.contains("entity template"));
        assert!(response.answer.starts_with("Here is what the documents record about Nathan"));
        assert_eq!(response.sources[0].chunk_id, "n");
    }

    #[test]
    fn test_possessive_names_count_as_entities() {
        for query in ["What was Nathan's main concern?", "What was Nathan\u{2019}s main concern?"] {
            let terms = QueryTerms::parse(query);
            assert_eq!(terms.keywords, vec!["nathan", "main", "concern"]);
            assert_eq!(terms.entities, vec!["nathan"]);
        }
    }

    #[test]
    fn test_possessive_query_uses_entity_template() {
        let chunks = vec![
            transcript(
                "n",
                "His main concern was the overtime rota. He felt supported.",
                "Nathan - supervision.txt",
            ),
            transcript("o", "The team discussed the overtime rota.", "Team meeting.txt"),
        ];

        let analyzer = FallbackContentAnalyzer::default();
        let response = analyzer.analyze("What was Nathan's main concern?", &chunks, "entry");

        assert!(response.reasoning.contains("entity template"));
        assert!(response.answer.starts_with("Here is what the documents record about Nathan"));
        assert!(response.answer.contains("main concern was the overtime rota"));
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].chunk_id, "n");
        assert_eq!(response.sources[0].similarity, MAX_SCORE);
    }

    #[test]
    fn test_topic_sentences_match_whole_stems() {
        let chunks = vec![transcript(
            "r",
            "The rent went up again. The current rota is fine.",
            "Session.txt",
        )];

        let analyzer = FallbackContentAnalyzer::default();
        let response = analyzer.analyze("worried about rent", &chunks, "entry");

        assert!(response.reasoning.contains("stress topic template"));
        assert!(response.answer.contains("The rent went up again."));
        assert!(!response.answer.contains("current rota"));
    }

    #[test]
    fn test_topic_template() {
        let chunks = vec![
            policy(
                "g",
                "Staff may raise a grievance in writing. The manager replies within ten days.",
                "Grievance policy.pdf",
            ),
            transcript("t", "The grievance was discussed briefly.", "Session.txt"),
        ];

        let analyzer = FallbackContentAnalyzer::default();
        let response = analyzer.analyze("how do I file a grievance", &chunks, "entry");

        assert!(response.reasoning.contains("grievance/policy topic template"));
        assert!(response.answer.contains("raise a grievance in writing"));
        assert!(!response.answer.contains("ten days"));
    }

    #[test]
    fn test_comparison_template_needs_both_sides() {
        let chunks = vec![
            transcript("t", "Overtime was expected every weekend.", "Session.txt"),
            policy("p", "Overtime must be voluntary and approved in advance.", "Hours policy.pdf"),
        ];

        let analyzer = FallbackContentAnalyzer::default();
        let response = analyzer.analyze("compare overtime practice", &chunks, "entry");
        assert!(response.reasoning.contains("comparison topic template"));
        assert!(response.answer.contains("In the transcripts"));
        assert!(response.answer.contains("In the policy documents"));
    }

    #[test]
    fn test_generic_summary_counts_categories() {
        let chunks = vec![
            transcript("t", "The rota was changed in March.", "Session.txt"),
            policy("p", "Rota changes need two weeks notice.", "Scheduling.pdf"),
        ];

        let analyzer = FallbackContentAnalyzer::default();
        let response = analyzer.analyze("rota", &chunks, "entry");

        assert!(response.reasoning.contains("generic summary"));
        assert!(response.answer.contains("1 from transcripts, 1 from policy documents"));
    }

    #[test]
    fn test_no_match_suggests_rephrasing() {
        let chunks = vec![transcript("t", "Quarterly parking allocation", "Admin.txt")];

        let analyzer = FallbackContentAnalyzer::default();
        let response = analyzer.analyze("holiday entitlement", &chunks, "entry");

        assert!(response.sources.is_empty());
        assert!(response.answer.contains("rephras"));
        assert!(!response.answer.is_empty());
    }

    #[test]
    fn test_selection_is_bounded_and_clamped() {
        let chunks: Vec<Chunk> = (0..10)
            .map(|i| transcript(&i.to_string(), "stress stress money taxes Nathan", "Nathan.txt"))
            .collect();

        let analyzer = FallbackContentAnalyzer::default();
        let selected = analyzer.select("Nathan stress money taxes", &chunks);
        assert_eq!(selected.len(), 5);
        assert!(selected.iter().all(|r| r.similarity <= MAX_SCORE));
        assert_eq!(selected[0].chunk.id, "0");
    }

    #[test]
    fn test_excerpts_are_bounded() {
        let long = "Nathan mentioned stress. ".repeat(40);
        let chunks = vec![transcript("t", &long, "Nathan.txt")];

        let analyzer = FallbackContentAnalyzer::default();
        let response = analyzer.analyze("Nathan stress", &chunks, "entry");
        let excerpt = &response.sources[0].excerpt_text;
        assert!(excerpt.ends_with("..."));
        assert!(excerpt.len() <= 203);
    }

    #[test]
    fn test_analyze_ranked_falls_back_to_vector_order() {
        let ranked = vec![
            RankedChunk::new(transcript("a", "The rota moved to Tuesdays.", "Session.txt"), 0.6),
            RankedChunk::new(policy("b", "Shift swaps need approval.", "Rota.pdf"), 0.4),
            RankedChunk::new(policy("c", "Unrelated text.", "Other.pdf"), 0.0),
        ];

        let analyzer = FallbackContentAnalyzer::default();
        let response = analyzer.analyze_ranked("weekly schedule", &ranked, "backends exhausted");

        let ids: Vec<&str> = response.sources.iter().map(|s| s.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(response.reasoning.starts_with("backends exhausted"));
        assert!(response.reasoning.contains("generic summary"));
    }
}
