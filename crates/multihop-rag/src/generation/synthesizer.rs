//! Answer synthesis over two fallback cascades
//!
//! Retrieval walks the configured embedding providers until one ranks the
//! corpus, generation walks the configured backends until one answers, and
//! content analysis closes both cascades. Each step of the walk is a
//! `SynthesisState` so the transitions can be driven and inspected one at a
//! time.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{RagConfig, RetrievalConfig};
use crate::error::{Error, Result};
use crate::providers::{
    build_embedding_providers, build_generation_backends, embed_chunks, EmbeddingProvider,
    GenerationBackend,
};
use crate::retrieval::{MultiHopRetriever, RetrievalResult};
use crate::storage::ChunkStore;
use crate::types::{
    corpus_dimensions, validate_query, AnswerPath, AnswerResponse, Chunk, RankedChunk, SourceRef,
};

use super::fallback::FallbackContentAnalyzer;
use super::prompt::PromptBuilder;

/// One state of the synthesis state machine
#[derive(Debug, Clone)]
pub enum SynthesisState {
    /// Snapshot taken, nothing decided yet
    Start,
    /// The corpus is empty
    NoChunks,
    /// Chunks exist but none carries a vector
    NoEmbeddings,
    /// Trying the retriever at this index
    VectorSearch(usize),
    /// A retriever succeeded
    Ranked(RetrievalResult),
    /// Trying the backend at `index` over the fused chunks
    Generate {
        index: usize,
        fused: Vec<RankedChunk>,
        context: String,
    },
    /// Rule-based analysis over these candidates
    ContentAnalysis(Vec<RankedChunk>),
    /// Terminal
    Done(AnswerResponse),
}

impl SynthesisState {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// Per-query data threaded through the state machine
#[derive(Debug, Clone)]
pub struct SynthesisContext {
    /// Validated query text
    pub query: String,
    /// Immutable chunk snapshot taken at query start
    pub chunks: Vec<Chunk>,
    /// Transitions taken so far, joined into the answer's reasoning
    pub trace: Vec<String>,
}

impl SynthesisContext {
    pub fn new(query: impl Into<String>, chunks: Vec<Chunk>) -> Self {
        Self {
            query: query.into(),
            chunks,
            trace: Vec::new(),
        }
    }

    fn note(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        tracing::debug!("synthesis: {}", entry);
        self.trace.push(entry);
    }

    fn reasoning(&self) -> String {
        self.trace.join("; ")
    }
}

/// Drives retrieval, generation and fallback for each query
pub struct ResponseSynthesizer {
    store: Arc<dyn ChunkStore>,
    retrievers: Vec<MultiHopRetriever>,
    backends: Vec<Arc<dyn GenerationBackend>>,
    analyzer: FallbackContentAnalyzer,
    retrieval: RetrievalConfig,
    timeout: Duration,
}

impl ResponseSynthesizer {
    /// Create a synthesizer from already-built providers and backends
    pub fn new(
        store: Arc<dyn ChunkStore>,
        providers: Vec<Arc<dyn EmbeddingProvider>>,
        backends: Vec<Arc<dyn GenerationBackend>>,
        config: &RagConfig,
    ) -> Self {
        let retrievers = providers
            .into_iter()
            .map(|p| MultiHopRetriever::with_overrides(p, &config.retrieval.thresholds))
            .collect();

        Self {
            store,
            retrievers,
            backends,
            analyzer: FallbackContentAnalyzer::new(&config.fallback),
            retrieval: config.retrieval.clone(),
            timeout: Duration::from_secs(config.generation.timeout_secs),
        }
    }

    /// Build providers and backends from configuration
    pub fn from_config(config: &RagConfig, store: Arc<dyn ChunkStore>) -> Result<Self> {
        let providers = build_embedding_providers(config)?;
        let backends = build_generation_backends(config)?;

        tracing::info!(
            "Synthesizer ready: embeddings [{}], generation [{}]",
            providers.iter().map(|p| p.name()).collect::<Vec<_>>().join(", "),
            backends.iter().map(|b| b.name()).collect::<Vec<_>>().join(", ")
        );

        Ok(Self::new(store, providers, backends, config))
    }

    /// Override the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Provider used for ingestion and the embed endpoint
    pub fn primary_provider(&self) -> Option<&Arc<dyn EmbeddingProvider>> {
        self.retrievers.first().map(|r| r.provider())
    }

    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    /// Answer a raw query against the current store snapshot.
    ///
    /// Only malformed queries are errors; backend failures end in a
    /// content-analysis answer.
    pub async fn process_query(&self, query: &str) -> Result<AnswerResponse> {
        let query = validate_query(query, self.retrieval.max_query_chars)?;
        let chunks = self.store.all_chunks();

        tracing::info!("Processing query over {} chunks: {}", chunks.len(), query);
        let response = self.synthesize(query, chunks).await;
        tracing::info!(
            "Query {} answered via {:?} with {} sources",
            response.query_id,
            response.path,
            response.sources.len()
        );

        Ok(response)
    }

    /// Run the state machine to completion over `chunks`
    pub async fn synthesize(&self, query: &str, chunks: Vec<Chunk>) -> AnswerResponse {
        let mut ctx = SynthesisContext::new(query, chunks);
        let mut state = SynthesisState::Start;

        loop {
            match self.step(&mut ctx, state).await {
                SynthesisState::Done(response) => return response,
                next => state = next,
            }
        }
    }

    /// Perform one transition
    pub async fn step(&self, ctx: &mut SynthesisContext, state: SynthesisState) -> SynthesisState {
        match state {
            SynthesisState::Start => {
                if ctx.chunks.is_empty() {
                    SynthesisState::NoChunks
                } else if !ctx.chunks.iter().any(Chunk::is_embedded) {
                    SynthesisState::NoEmbeddings
                } else {
                    SynthesisState::VectorSearch(0)
                }
            }

            SynthesisState::NoChunks => {
                ctx.note("no chunks indexed");
                SynthesisState::Done(AnswerResponse::nothing_indexed(ctx.reasoning()))
            }

            SynthesisState::NoEmbeddings => {
                ctx.note(format!("none of {} chunks carry embeddings", ctx.chunks.len()));
                SynthesisState::ContentAnalysis(unranked(&ctx.chunks))
            }

            SynthesisState::VectorSearch(index) => {
                let Some(retriever) = self.retrievers.get(index) else {
                    ctx.note("vector search unavailable with every embedding provider");
                    return SynthesisState::ContentAnalysis(unranked(&ctx.chunks));
                };

                match self.vector_search(retriever, ctx).await {
                    Ok(result) => {
                        ctx.note(format!(
                            "vector search with {} found {} transcript and {} policy chunks",
                            retriever.provider().name(),
                            result.transcript_chunks.len(),
                            result.policy_chunks.len()
                        ));
                        SynthesisState::Ranked(result)
                    }
                    Err(e) => {
                        log_failure("Vector search", retriever.provider().name(), &e);
                        ctx.note(format!("{} failed: {}", retriever.provider().name(), e));
                        SynthesisState::VectorSearch(index + 1)
                    }
                }
            }

            SynthesisState::Ranked(result) => {
                let fused = result.fuse(self.retrieval.fused_top_n);
                if fused.is_empty() {
                    ctx.note("no chunk passed the similarity threshold");
                    return SynthesisState::Done(AnswerResponse::no_relevant_information(
                        ctx.reasoning(),
                    ));
                }
                let context = PromptBuilder::build_context(&fused);
                SynthesisState::Generate {
                    index: 0,
                    fused,
                    context,
                }
            }

            SynthesisState::Generate {
                index,
                fused,
                context,
            } => {
                let Some(backend) = self.backends.get(index) else {
                    ctx.note("every generation backend failed");
                    return SynthesisState::ContentAnalysis(fused);
                };

                let name = backend.name().to_string();
                let outcome = self
                    .timed(&name, backend.generate(&ctx.query, &context))
                    .await
                    .and_then(|text| {
                        let text = text.trim().to_string();
                        if text.is_empty() {
                            Err(Error::provider(&name, "empty answer"))
                        } else {
                            Ok(text)
                        }
                    });

                match outcome {
                    Ok(answer) => {
                        ctx.note(format!("answered by {} over {} chunks", name, fused.len()));
                        let sources = fused
                            .iter()
                            .map(|r| SourceRef::from_ranked(r, self.retrieval.excerpt_chars))
                            .collect();
                        SynthesisState::Done(AnswerResponse::new(
                            answer,
                            sources,
                            ctx.reasoning(),
                            AnswerPath::Generated { backend: name },
                        ))
                    }
                    Err(e) => {
                        log_failure("Generation", &name, &e);
                        ctx.note(format!("{} failed: {}", name, e));
                        SynthesisState::Generate {
                            index: index + 1,
                            fused,
                            context,
                        }
                    }
                }
            }

            SynthesisState::ContentAnalysis(candidates) => SynthesisState::Done(
                self.analyzer
                    .analyze_ranked(&ctx.query, &candidates, &ctx.reasoning()),
            ),

            done @ SynthesisState::Done(_) => done,
        }
    }

    /// Retrieve with one provider, reconciling vector dimensionality first.
    ///
    /// A local provider re-embeds a mismatched snapshot for this query only;
    /// a remote provider fails with `DimensionMismatch`.
    async fn vector_search(
        &self,
        retriever: &MultiHopRetriever,
        ctx: &SynthesisContext,
    ) -> Result<RetrievalResult> {
        let provider = retriever.provider();
        let dims = provider.dimensions();

        let reembedded;
        let chunks: &[Chunk] = match corpus_dimensions(&ctx.chunks) {
            Some(corpus) if corpus == dims => &ctx.chunks,
            corpus if provider.is_local() => {
                tracing::info!(
                    "Re-embedding {} chunks with {} (corpus dims {:?}, provider dims {})",
                    ctx.chunks.len(),
                    provider.name(),
                    corpus,
                    dims
                );
                reembedded = self
                    .timed(provider.name(), embed_chunks(provider.as_ref(), ctx.chunks.clone()))
                    .await?;
                &reembedded
            }
            corpus => {
                return Err(Error::DimensionMismatch {
                    left: corpus.unwrap_or(0),
                    right: dims,
                })
            }
        };

        self.timed(
            provider.name(),
            retriever.retrieve(
                &ctx.query,
                chunks,
                self.retrieval.transcript_top_k,
                self.retrieval.policy_top_k,
            ),
        )
        .await
    }

    /// Await a backend call under the per-call timeout
    async fn timed<T>(&self, provider: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                provider: provider.to_string(),
                elapsed: self.timeout,
            }),
        }
    }
}

fn log_failure(stage: &str, name: &str, error: &Error) {
    if error.is_backend_failure() {
        tracing::warn!("{} with {} failed: {}", stage, name, error);
    } else {
        tracing::error!("{} with {} failed unexpectedly: {}", stage, name, error);
    }
}

/// Wrap chunks with a placeholder score for content analysis
fn unranked(chunks: &[Chunk]) -> Vec<RankedChunk> {
    chunks.iter().map(|c| RankedChunk::new(c.clone(), 0.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashEmbedder;
    use crate::storage::InMemoryChunkStore;
    use crate::types::Category;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Answer(&'static str),
        Fail,
        Hang,
    }

    struct FakeBackend {
        name: String,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl FakeBackend {
        fn new(name: &str, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl GenerationBackend for FakeBackend {
        async fn generate(&self, _query: &str, context: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Answer(text) => {
                    assert!(context.contains("[1]"));
                    Ok(text.to_string())
                }
                Behaviour::Fail => Err(Error::unavailable(&self.name, "no credentials")),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok("too late".to_string())
                }
            }
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn model(&self) -> &str {
            "fake"
        }
    }

    /// Remote-looking provider that always fails
    struct DownEmbedder {
        dims: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for DownEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(Error::unavailable("down-embeddings", "API key not configured"))
        }

        fn dimensions(&self) -> usize {
            self.dims
        }

        fn similarity_threshold(&self) -> f32 {
            0.7
        }

        fn name(&self) -> &str {
            "down-embeddings"
        }
    }

    fn raw_corpus() -> Vec<Chunk> {
        vec![
            Chunk::new("t1", "Nathan discussed stress about property taxes", "d1", "Nathan session.txt", Category::Transcript, 0),
            Chunk::new("t2", "We reviewed the quarterly parking allocation", "d2", "Admin meeting.txt", Category::Transcript, 0),
            Chunk::new("p1", "Employees experiencing stress may request support from their supervisor", "d3", "Wellbeing policy.pdf", Category::Policy, 0),
        ]
    }

    async fn embedded_corpus(dims: usize) -> Vec<Chunk> {
        let embedder = HashEmbedder::new(dims).unwrap();
        embed_chunks(&embedder, raw_corpus()).await.unwrap()
    }

    fn synthesizer(
        chunks: Vec<Chunk>,
        providers: Vec<Arc<dyn EmbeddingProvider>>,
        backends: Vec<Arc<dyn GenerationBackend>>,
    ) -> ResponseSynthesizer {
        let store: Arc<dyn ChunkStore> = Arc::new(InMemoryChunkStore::from_chunks(chunks));
        ResponseSynthesizer::new(store, providers, backends, &RagConfig::default())
            .with_timeout(Duration::from_millis(200))
    }

    fn hash(dims: usize) -> Arc<dyn EmbeddingProvider> {
        Arc::new(HashEmbedder::new(dims).unwrap())
    }

    const QUERY: &str = "What did Nathan say about stress?";

    #[tokio::test]
    async fn test_empty_corpus() {
        let synth = synthesizer(Vec::new(), vec![hash(384)], Vec::new());
        let response = synth.process_query("anything").await.unwrap();

        assert!(response.sources.is_empty());
        assert!(response.answer.to_lowercase().contains("upload"));
        assert_eq!(response.path, AnswerPath::NothingIndexed);
    }

    #[tokio::test]
    async fn test_invalid_query_is_rejected() {
        let synth = synthesizer(raw_corpus(), vec![hash(384)], Vec::new());
        assert!(matches!(
            synth.process_query("   ").await,
            Err(Error::InvalidQuery(_))
        ));
        let long = "x".repeat(5000);
        assert!(matches!(
            synth.process_query(&long).await,
            Err(Error::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_state_transitions_for_unembedded_corpus() {
        let backend = FakeBackend::new("primary", Behaviour::Answer("unused"));
        let synth = synthesizer(raw_corpus(), vec![hash(384)], vec![backend.clone()]);
        let mut ctx = SynthesisContext::new(QUERY, raw_corpus());

        let state = synth.step(&mut ctx, SynthesisState::Start).await;
        assert!(matches!(state, SynthesisState::NoEmbeddings));
        let state = synth.step(&mut ctx, state).await;
        assert!(matches!(state, SynthesisState::ContentAnalysis(ref c) if c.len() == 3));
        let state = synth.step(&mut ctx, state).await;

        let SynthesisState::Done(response) = state else {
            panic!("expected a terminal state");
        };
        assert_eq!(response.path, AnswerPath::ContentAnalysis);
        assert!(response.reasoning.contains("carry embeddings"));
        assert_eq!(response.sources[0].chunk_id, "t1");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_first_successful_backend_answers() {
        let failing = FakeBackend::new("primary", Behaviour::Fail);
        let working = FakeBackend::new("secondary", Behaviour::Answer("  Nathan was worried about taxes.  "));
        let unused = FakeBackend::new("tertiary", Behaviour::Answer("unused"));
        let synth = synthesizer(
            embedded_corpus(384).await,
            vec![hash(384)],
            vec![failing.clone(), working.clone(), unused.clone()],
        );

        let response = synth.process_query(QUERY).await.unwrap();

        assert_eq!(response.answer, "Nathan was worried about taxes.");
        assert_eq!(
            response.path,
            AnswerPath::Generated {
                backend: "secondary".to_string()
            }
        );
        assert_eq!(response.sources[0].chunk_id, "t1");
        assert!(response.reasoning.contains("primary failed"));
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(unused.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cascade_exhaustion_uses_content_analysis() {
        let synth = synthesizer(
            embedded_corpus(384).await,
            vec![hash(384)],
            vec![
                FakeBackend::new("a", Behaviour::Fail),
                FakeBackend::new("b", Behaviour::Answer("   ")),
                FakeBackend::new("c", Behaviour::Hang),
            ],
        );

        let response = synth.process_query(QUERY).await.unwrap();

        assert!(!response.answer.is_empty());
        assert_eq!(response.path, AnswerPath::ContentAnalysis);
        assert!(response.reasoning.contains("content analysis"));
        assert!(response.reasoning.contains("timed out after 200ms"));
        assert!(response.reasoning.contains("every generation backend failed"));
        assert!(response.sources.iter().all(|s| s.similarity <= 0.95));
    }

    #[tokio::test]
    async fn test_failed_provider_advances_to_next() {
        let down: Arc<dyn EmbeddingProvider> = Arc::new(DownEmbedder { dims: 384 });
        let synth = synthesizer(
            embedded_corpus(384).await,
            vec![down, hash(384)],
            vec![FakeBackend::new("llm", Behaviour::Answer("answer"))],
        );

        let response = synth.process_query(QUERY).await.unwrap();
        assert!(response.is_generated());
        assert!(response.reasoning.contains("down-embeddings failed"));
        assert!(response.reasoning.contains("vector search with hash-embeddings"));
    }

    #[tokio::test]
    async fn test_every_provider_down_analyzes_all_chunks() {
        let down: Arc<dyn EmbeddingProvider> = Arc::new(DownEmbedder { dims: 384 });
        let backend = FakeBackend::new("llm", Behaviour::Answer("unused"));
        let synth = synthesizer(embedded_corpus(384).await, vec![down], vec![backend.clone()]);

        let response = synth.process_query(QUERY).await.unwrap();
        assert_eq!(response.path, AnswerPath::ContentAnalysis);
        assert!(response.reasoning.contains("vector search unavailable"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_policy() {
        // Remote provider with the wrong dimensionality is skipped
        let remote: Arc<dyn EmbeddingProvider> = Arc::new(DownEmbedder { dims: 1536 });
        let synth = synthesizer(
            embedded_corpus(128).await,
            vec![remote, hash(384)],
            vec![FakeBackend::new("llm", Behaviour::Answer("answer"))],
        );
        let response = synth.process_query(QUERY).await.unwrap();
        assert!(response.reasoning.contains("Dimension mismatch: 128 vs 1536"));

        // The local provider re-embedded the 128-dim corpus at 384 dims
        assert!(response.is_generated());
        assert_eq!(response.sources[0].chunk_id, "t1");
    }

    #[tokio::test]
    async fn test_nothing_above_threshold() {
        let mut config = RagConfig::default();
        config.retrieval.thresholds.insert("hash-embeddings".to_string(), 0.99);
        let store: Arc<dyn ChunkStore> =
            Arc::new(InMemoryChunkStore::from_chunks(embedded_corpus(384).await));
        let synth = ResponseSynthesizer::new(
            store,
            vec![hash(384)],
            vec![FakeBackend::new("llm", Behaviour::Answer("unused"))],
            &config,
        );

        let response = synth.process_query("holiday entitlement").await.unwrap();
        assert_eq!(response.path, AnswerPath::NoRelevantInformation);
        assert!(response.sources.is_empty());
    }
}
