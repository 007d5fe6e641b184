//! API routes for the query server

pub mod query;

use axum::{
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/query", post(query::query))
        .route("/embed", post(query::embed))
        .route("/stats", get(query::stats))
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "multihop-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Multi-hop retrieval over transcripts and policy documents",
        "endpoints": {
            "POST /api/query": "Answer a question with cited sources",
            "POST /api/embed": "Embed texts with the primary provider",
            "GET /api/stats": "Chunk counts per category"
        }
    }))
}
