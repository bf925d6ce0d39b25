mod config;
mod errors;
mod generation;
mod llm_client;
mod models;
mod pipeline;
mod render;
mod routes;
mod state;
mod storage;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::generator::LlmContentGenerator;
use crate::llm_client::LlmClient;
use crate::pipeline::ResumePipeline;
use crate::render::compiler::LatexCompiler;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::s3_store::S3ArtifactStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={level},tower_http={level}",
                env!("CARGO_CRATE_NAME"),
                level = &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));
    info!("Debug mode: {}", config.debug);

    // Content Generator
    let llm = LlmClient::new(
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
        config.openai_model.clone(),
    )?;
    info!("LLM client initialized (model: {})", llm.model());
    let generator = Arc::new(LlmContentGenerator::new(llm));

    // Document Compiler
    let compiler = LatexCompiler::new(Duration::from_secs(config.latex_timeout_secs));
    info!("LaTeX compiler initialized (timeout: {:?})", compiler.timeout());

    // Artifact Store (S3 / MinIO)
    let store = S3ArtifactStore::connect(&config)
        .await
        .context("Failed to initialize S3 client")?;
    info!("S3 client initialized (bucket: {})", store.bucket());

    let pipeline = ResumePipeline::new(
        generator,
        Arc::new(compiler),
        Arc::new(store),
        config.max_resume_size_mb,
    );

    let state = AppState {
        pipeline,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host, config.port))?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
