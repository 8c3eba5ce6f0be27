//! Bulk import job endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::jobs::bulk::{BulkImportJob, SubmitError};
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub post_ids: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub total_posts: u32,
}

/// `POST /instagram/import/bulk`
///
/// The batch-size guardrail is enforced synchronously here; accepted
/// batches return immediately and process in the background.
pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    match state.bulk.submit(request.post_ids).await {
        Ok((job_id, total_posts)) => Ok(Json(SubmitResponse {
            job_id,
            total_posts,
        })),
        Err(e @ (SubmitError::BatchTooLarge { .. } | SubmitError::EmptyBatch)) => {
            Err(ApiError::BadRequest(e.to_string()))
        }
        Err(SubmitError::Store(e)) => Err(e.into()),
    }
}

/// `GET /instagram/import-jobs/:id` — idempotent status poll.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BulkImportJob>, ApiError> {
    let job = state
        .bulk_jobs
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("job not found: {id}")))?;
    Ok(Json(job))
}
