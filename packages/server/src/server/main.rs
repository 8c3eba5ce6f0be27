// Main entry point for the recipe import API server

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use extraction::{
    offline_tiers, standard_tiers, ExtractionOrchestrator, HttpFetcher, OpenAiRecipeExtractor,
    OrchestratorConfig, RecipeAi,
};
use server_core::import::{MemoryRecipeSaver, UrlPostImporter};
use server_core::jobs::{
    BulkImportProcessor, CommandToolchain, MemoryJobStore, ToolchainConfig, VideoPipeline,
};
use server_core::server::{build_app, AppState};
use server_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Ladle recipe import API");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(port = config.port, "Configuration loaded");

    // AI seam: optional. Without a key the structured and heuristic
    // tiers still run; video synthesis jobs fail with a clear message.
    let ai: Option<Arc<dyn RecipeAi>> = config.openai_api_key.as_ref().map(|key| {
        Arc::new(OpenAiRecipeExtractor::new(key.as_str()).with_model(config.openai_model.as_str()))
            as Arc<dyn RecipeAi>
    });
    if ai.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; AI extraction tier disabled");
    }

    let tiers = match &ai {
        Some(ai) => standard_tiers(ai.clone()),
        None => offline_tiers(),
    };
    let orchestrator = Arc::new(
        ExtractionOrchestrator::new(Arc::new(HttpFetcher::new()), tiers).with_config(
            OrchestratorConfig::new().with_acceptance_threshold(config.acceptance_threshold),
        ),
    );

    // Shared in-memory job store backing both job kinds
    let store = Arc::new(MemoryJobStore::new());
    let saver = Arc::new(MemoryRecipeSaver::new());

    // Video pipeline
    let mut toolchain = CommandToolchain::new(ToolchainConfig {
        ytdlp_bin: config.ytdlp_bin.clone(),
        ffmpeg_bin: config.ffmpeg_bin.clone(),
        tesseract_bin: config.tesseract_bin.clone(),
        work_dir: config.work_dir.clone(),
        ..ToolchainConfig::default()
    });
    if let Some(key) = &config.openai_api_key {
        toolchain = toolchain.with_openai_api_key(key.as_str());
    }
    if let Some(ai) = &ai {
        toolchain = toolchain.with_ai(ai.clone());
    }
    let video = Arc::new(VideoPipeline::new(store.clone(), Arc::new(toolchain)));

    // Bulk import processor over the single-item import path
    let importer = Arc::new(UrlPostImporter::new(orchestrator.clone(), saver.clone()));
    let bulk = Arc::new(
        BulkImportProcessor::new(store.clone(), importer)
            .with_max_batch_size(config.max_bulk_batch),
    );

    let app = build_app(AppState {
        orchestrator,
        video,
        bulk,
        video_jobs: store.clone(),
        bulk_jobs: store,
        saver,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Listening on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
