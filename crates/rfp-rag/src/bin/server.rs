//! RFP RAG Server binary
//!
//! Run with: cargo run -p rfp-rag --bin rfp-rag-server

use rfp_rag::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rfp_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                      RFP RAG System                       ║
║      Hybrid Search, Q&A and Structured RFP Extraction     ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    // Load configuration
    let config = RagConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Answer model: {}", config.llm.answer_model);
    tracing::info!("  - Extraction model: {}", config.llm.extraction_model);
    tracing::info!(
        "  - Retrieval chunks: {}/{}",
        config.retrieval_chunking.chunk_size,
        config.retrieval_chunking.chunk_overlap
    );
    tracing::info!(
        "  - Fusion weights: semantic {} / lexical {}",
        config.retrieval.semantic_weight,
        config.retrieval.lexical_weight
    );

    // Create server
    let server = RagServer::new(config)?;

    // Check Ollama
    if let Some(ollama) = server.state().ollama() {
        tracing::info!("Checking Ollama at {}...", ollama.base_url());
        if ollama.health_check().await? {
            tracing::info!("Ollama is running");
        } else {
            tracing::warn!("Ollama not available at {}", ollama.base_url());
            tracing::warn!("Please start Ollama:");
            tracing::warn!("  1. Start: ollama serve");
            tracing::warn!("  2. Pull models: ollama pull nomic-embed-text && ollama pull mistral && ollama pull phi3:mini");
        }
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /upload              - Upload an RFP document");
    println!("  POST /query               - Ask a question");
    println!("  GET  /analyze-rfp-details - Structured RFP details");
    println!("  GET  /extract-entities    - Entities and requirement phrases");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
