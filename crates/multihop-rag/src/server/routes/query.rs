//! Query, embedding and corpus statistics endpoints

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{AnswerResponse, CorpusStats, EmbedRequest, EmbedResponse, QueryRequest};

/// POST /api/query - Answer a question over both corpora
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<AnswerResponse>> {
    let start = Instant::now();

    let response = state.synthesizer().process_query(&request.question).await?;

    tracing::info!(
        "Query answered in {}ms ({} sources)",
        start.elapsed().as_millis(),
        response.sources.len()
    );
    Ok(Json(response))
}

/// POST /api/embed - Embed texts with the primary provider
pub async fn embed(
    State(state): State<AppState>,
    Json(request): Json<EmbedRequest>,
) -> Result<Json<EmbedResponse>> {
    let provider = state.primary_provider()?;
    let embeddings = provider.embed(&request.texts).await?;

    Ok(Json(EmbedResponse {
        dimensions: provider.dimensions(),
        provider: provider.name().to_string(),
        embeddings,
    }))
}

/// GET /api/stats - Corpus statistics
pub async fn stats(State(state): State<AppState>) -> Json<CorpusStats> {
    Json(state.store().stats())
}
