//! Application state and router assembly.

use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use extraction::ExtractionOrchestrator;

use crate::import::RecipeSaver;
use crate::jobs::bulk::BulkImportProcessor;
use crate::jobs::store::{BulkJobStore, VideoJobStore};
use crate::jobs::video_worker::VideoPipeline;
use crate::server::routes;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ExtractionOrchestrator>,
    pub video: Arc<VideoPipeline>,
    pub bulk: Arc<BulkImportProcessor>,
    pub video_jobs: Arc<dyn VideoJobStore>,
    pub bulk_jobs: Arc<dyn BulkJobStore>,
    pub saver: Arc<dyn RecipeSaver>,
}

/// Build the Axum application router.
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    Router::new()
        // One-shot URL extraction
        .route("/url-import/extract", post(routes::import::extract))
        .route(
            "/url-import/detect-source",
            get(routes::import::detect_source),
        )
        // Video extraction jobs
        .route("/youtube/extract", post(routes::video::submit))
        .route("/youtube/jobs/:id", get(routes::video::get_job))
        .route("/youtube/jobs/:id", delete(routes::video::cancel))
        .route("/youtube/jobs/:id/result", get(routes::video::get_result))
        .route(
            "/youtube/jobs/:id/import",
            post(routes::video::import_candidate),
        )
        .route("/youtube/jobs/:id/retry", post(routes::video::retry))
        .route("/youtube/history", get(routes::video::history))
        .route(
            "/youtube/history/:id",
            delete(routes::video::delete_history),
        )
        // Bulk social import jobs
        .route("/instagram/import/bulk", post(routes::bulk::submit))
        .route("/instagram/import-jobs/:id", get(routes::bulk::get_job))
        // Health
        .route("/health", get(routes::health::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
