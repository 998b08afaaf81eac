//! Chat server binary
//!
//! Run with: cargo run -p afrohistorian --bin afrohistorian-server

use afrohistorian::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "afrohistorian=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                       Afrohistorian                       ║
║          African history Q&A over HTTP and WebSocket      ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let config = RagConfig::load(None)?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - LLM model: {}", config.llm.model);
    tracing::info!("  - Vector index: {}", config.vector_db.index_name);
    tracing::info!(
        "  - Retrieval: top {} above {}",
        config.retrieval.top_k,
        config.retrieval.score_threshold
    );

    let server = RagServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("\nEndpoints:");
    println!("  GET  /                          - Health check");
    println!("  POST /ask                       - Ask a question");
    println!("  GET  /admin/connections         - Active WebSocket connections");
    println!("  WS   /ws/chat/{{user_id}}         - Chat with typing indicator");
    println!("  WS   /ws/chat-stream/{{user_id}}  - Streaming chat");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
