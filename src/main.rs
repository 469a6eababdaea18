mod completion;
mod models;
mod nutrition;
mod parser;
mod planner;
mod prompt;
mod regen;
mod routes;

use anyhow::Context;
use routes::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use crate::completion::{CompletionConfig, OpenAiClient};
use crate::planner::MealPlanner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = CompletionConfig::from_env();
    if config.is_demo() {
        tracing::info!("No OPENAI_API_KEY set, serving canned demo meals");
    } else {
        tracing::info!("Using API key: {}...", config.api_key.chars().take(6).collect::<String>());
    }
    let client = OpenAiClient::new(config).context("building completion client")?;
    let state = AppState {
        planner: Arc::new(MealPlanner::new(Arc::new(client))),
    };
    let app = routes::router(state);

    let port: u16 = std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);
    let addr = SocketAddr::from(([0,0,0,0], port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
