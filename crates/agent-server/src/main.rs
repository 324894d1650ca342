//! Market agent peer server
//!
//! Runs one agent of the market agent graph, chosen by `AGENT_ROLE`, at
//! `http://<host>:<port>/agent`.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_server::{build_agent, PeerServer, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    // Initialize LLM provider
    let provider = agent_runtime::provider_from_env()?;
    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ Connected to {}", provider.name()),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ {} not available - agent calls will fail", provider.name());
        }
    }

    let agent = build_agent(&config, provider)?;
    tracing::info!("Registered {} tools:", agent.tools().len());
    for name in agent.tools().names() {
        tracing::info!("  • {}", name);
    }

    // Always start a new session
    let session = agent.start_session().await;
    tracing::info!(role = %config.role, %session, "Session started");

    let server = PeerServer::start(Arc::new(agent), config.bind_addr()).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    server.stop().await?;

    Ok(())
}
