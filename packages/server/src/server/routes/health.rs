//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: String,
    active_video_jobs: usize,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let active_video_jobs = state
        .video_jobs
        .list()
        .await
        .map(|jobs| jobs.iter().filter(|j| !j.is_terminal()).count())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "ok".to_string(),
        active_video_jobs,
    })
}
