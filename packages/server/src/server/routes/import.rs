//! One-shot URL extraction endpoints.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use extraction::{ExtractionResult, SourceDetection};

use crate::server::app::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub url: String,
    pub fallback_content: Option<String>,
}

/// `POST /url-import/extract`
///
/// Always answers 200: every extraction-domain failure is encoded in
/// the result body (`success`, `requiresManualInput`, `error`).
pub async fn extract(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Json<ExtractionResult> {
    let result = state
        .orchestrator
        .extract(&request.url, request.fallback_content.as_deref())
        .await;
    Json(result)
}

#[derive(Deserialize)]
pub struct DetectQuery {
    pub url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    /// `null` when the URL is malformed or incomplete — "not enough
    /// input to classify yet", never an error.
    pub detection: Option<SourceDetection>,
}

/// `GET /url-import/detect-source?url=`
pub async fn detect_source(
    State(state): State<AppState>,
    Query(query): Query<DetectQuery>,
) -> Json<DetectResponse> {
    let detection = state.orchestrator.classifier().classify(&query.url);
    Json(DetectResponse { detection })
}
