//! Video extraction job endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use extraction::{ContentSource, RecipeDraft};

use crate::jobs::video::{ExtractedRecipe, VideoJob, VideoJobStatus};
use crate::jobs::video_worker::RetryError;
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: Uuid,
}

/// `POST /youtube/extract`
pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let detection = state.orchestrator.classifier().classify(&request.url);
    match detection {
        Some(d) if d.source == ContentSource::Youtube => {}
        _ => {
            return Err(ApiError::BadRequest(
                "url is not a recognizable YouTube video".to_string(),
            ))
        }
    }

    let job_id = state.video.submit(&request.url).await?;
    Ok(Json(SubmitResponse { job_id }))
}

/// `GET /youtube/jobs/:id` — idempotent status poll.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<VideoJob>, ApiError> {
    let job = state
        .video_jobs
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("job not found: {id}")))?;
    Ok(Json(job))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultResponse {
    pub video_title: String,
    pub channel_name: String,
    pub extracted_recipes: Vec<ExtractedRecipe>,
    pub imported_recipe_ids: Vec<Uuid>,
}

/// `GET /youtube/jobs/:id/result`
pub async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResultResponse>, ApiError> {
    let job = state
        .video_jobs
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("job not found: {id}")))?;

    if job.status != VideoJobStatus::Completed {
        return Err(ApiError::Conflict(format!(
            "job is not completed (status {:?})",
            job.status
        )));
    }

    let meta = job.video_meta.clone();
    Ok(Json(ResultResponse {
        video_title: meta
            .as_ref()
            .map(|m| m.title.clone())
            .unwrap_or_else(|| "Untitled video".to_string()),
        channel_name: meta
            .map(|m| m.channel)
            .unwrap_or_else(|| "Unknown channel".to_string()),
        extracted_recipes: job.extracted_recipes,
        imported_recipe_ids: job.imported_recipe_ids,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportQuery {
    pub recipe_index: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub recipe_id: Uuid,
}

/// `POST /youtube/jobs/:id/import?recipeIndex=`
///
/// The body, when present, is the user-edited draft; it overrides the
/// stored candidate at `recipeIndex`. Importing never mutates the job's
/// status or candidates.
pub async fn import_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ImportQuery>,
    body: Option<Json<RecipeDraft>>,
) -> Result<Json<ImportResponse>, ApiError> {
    let job = state
        .video_jobs
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("job not found: {id}")))?;

    if job.status != VideoJobStatus::Completed {
        return Err(ApiError::Conflict(format!(
            "job is not completed (status {:?})",
            job.status
        )));
    }

    let candidate = job
        .extracted_recipes
        .get(query.recipe_index)
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "recipeIndex {} out of range ({} candidates)",
                query.recipe_index,
                job.extracted_recipes.len()
            ))
        })?;

    let draft = body
        .map(|Json(draft)| draft)
        .unwrap_or_else(|| candidate.recipe.clone());
    if !draft.is_complete() {
        return Err(ApiError::BadRequest(
            "recipe needs at least one ingredient and one step".to_string(),
        ));
    }

    let recipe_id = state.saver.save(&draft).await?;
    state.video_jobs.record_import(id, recipe_id).await?;

    Ok(Json(ImportResponse { recipe_id }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    /// False when the job was already terminal or already being
    /// cancelled (idempotent no-op).
    pub cancelled: bool,
}

/// `DELETE /youtube/jobs/:id` — cooperative cancel.
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelResponse>, ApiError> {
    let cancelled = state.video.cancel(id).await?;
    Ok(Json(CancelResponse { cancelled }))
}

/// `POST /youtube/jobs/:id/retry` — new job, same source URL.
pub async fn retry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmitResponse>, ApiError> {
    match state.video.retry(id).await {
        Ok(job_id) => Ok(Json(SubmitResponse { job_id })),
        Err(RetryError::NotFound(id)) => Err(ApiError::NotFound(format!("job not found: {id}"))),
        Err(e @ RetryError::NotFailed { .. }) => Err(ApiError::Conflict(e.to_string())),
        Err(RetryError::Store(e)) => Err(e.into()),
    }
}

/// `GET /youtube/history` — terminal jobs, newest first.
pub async fn history(
    State(state): State<AppState>,
) -> Result<Json<Vec<VideoJob>>, ApiError> {
    let jobs = state
        .video_jobs
        .list()
        .await?
        .into_iter()
        .filter(|j| j.is_terminal())
        .collect();
    Ok(Json(jobs))
}

/// `DELETE /youtube/history/:id`
pub async fn delete_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let job = state
        .video_jobs
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("job not found: {id}")))?;

    if !job.is_terminal() {
        return Err(ApiError::Conflict(
            "job is still running; cancel it before deleting".to_string(),
        ));
    }

    state.video_jobs.remove(id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
