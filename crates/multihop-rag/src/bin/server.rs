//! Query server binary
//!
//! Run with: cargo run -p multihop-rag --bin multihop-rag-server -- --config rag.toml

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use multihop_rag::{
    config::{EmbeddingProviderConfig, GenerationBackendConfig, RagConfig},
    providers::OllamaClient,
    server::RagServer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "multihop-rag-server", version, about = "Multi-hop RAG query server")]
struct Args {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON chunk snapshot, overrides storage.chunks_path
    #[arg(long)]
    chunks: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "multihop_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                     Multi-hop RAG                         ║
║         Transcripts + Policies, Cited Answers             ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let mut config = match &args.config {
        Some(path) => RagConfig::from_file(path)?,
        None => RagConfig::default(),
    };
    if let Some(chunks) = args.chunks {
        config.storage.chunks_path = chunks;
    }

    tracing::info!("Configuration loaded");
    for provider in &config.embeddings.providers {
        tracing::info!("  - Embedding provider: {}", provider.name());
    }
    tracing::info!("  - Generation backends: {}", config.generation.backends.len());
    tracing::info!("  - Per-call timeout: {}s", config.generation.timeout_secs);
    tracing::info!("  - Chunks: {}", config.storage.chunks_path.display());

    check_ollama(&config).await;

    let server = RagServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/query  - Ask questions");
    println!("  POST /api/embed  - Embed texts");
    println!("  GET  /api/stats  - Corpus statistics");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}

/// Warn early when a configured Ollama server is not reachable
async fn check_ollama(config: &RagConfig) {
    let mut urls: Vec<&str> = config
        .embeddings
        .providers
        .iter()
        .filter_map(|p| match p {
            EmbeddingProviderConfig::Ollama { base_url, .. } => Some(base_url.as_str()),
            _ => None,
        })
        .chain(config.generation.backends.iter().filter_map(|b| match b {
            GenerationBackendConfig::Ollama { base_url, .. } => Some(base_url.as_str()),
            _ => None,
        }))
        .collect();
    urls.sort_unstable();
    urls.dedup();

    for url in urls {
        tracing::info!("Checking Ollama at {}...", url);
        let healthy = match OllamaClient::new(url, Duration::from_secs(5)) {
            Ok(client) => client.health_check().await,
            Err(_) => false,
        };
        if healthy {
            tracing::info!("Ollama is running");
        } else {
            tracing::warn!("Ollama not available at {}", url);
            tracing::warn!("Answers will fall back to the next backend or to content analysis");
        }
    }
}
