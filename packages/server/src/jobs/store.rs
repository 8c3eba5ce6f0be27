//! Job storage traits and the in-memory implementation.
//!
//! Server-side job records are the single source of truth that clients
//! mirror. All mutations funnel through these traits so the state
//! machine rules in [`crate::jobs::video`] hold at every observation
//! point; a database-backed store could be slotted in without touching
//! the workers.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

use crate::jobs::bulk::{BulkImportJob, BulkImportStatus};
use crate::jobs::video::{ExtractedRecipe, TransitionError, VideoJob, VideoJobStatus, VideoMeta};

#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("storage error: {0}")]
    Backend(String),
}

/// Storage for video extraction jobs.
#[async_trait]
pub trait VideoJobStore: Send + Sync {
    async fn insert(&self, job: VideoJob) -> Result<(), JobStoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<VideoJob>, JobStoreError>;
    async fn list(&self) -> Result<Vec<VideoJob>, JobStoreError>;
    async fn remove(&self, id: Uuid) -> Result<bool, JobStoreError>;

    /// Advance the state machine.
    async fn advance(&self, id: Uuid, to: VideoJobStatus) -> Result<VideoJob, JobStoreError>;

    /// Update the step label, optionally observing intra-stage progress.
    async fn set_step(
        &self,
        id: Uuid,
        label: String,
        progress: Option<u8>,
    ) -> Result<(), JobStoreError>;

    async fn set_meta(&self, id: Uuid, meta: VideoMeta) -> Result<(), JobStoreError>;

    async fn set_frames(
        &self,
        id: Uuid,
        extracted: u32,
        with_text: u32,
    ) -> Result<(), JobStoreError>;

    /// Transition to `Completed` and attach the recipe candidates.
    async fn finish(
        &self,
        id: Uuid,
        recipes: Vec<ExtractedRecipe>,
    ) -> Result<VideoJob, JobStoreError>;

    /// Transition to `Failed` with a message.
    async fn fail(&self, id: Uuid, message: String) -> Result<VideoJob, JobStoreError>;

    /// Ask the job to stop at its next checkpoint. `Ok(true)` when the
    /// request is new; `Ok(false)` when the job is already terminal or
    /// a cancel was already requested (idempotent no-op).
    async fn request_cancel(&self, id: Uuid) -> Result<bool, JobStoreError>;

    async fn cancel_requested(&self, id: Uuid) -> Result<bool, JobStoreError>;

    /// Record that a candidate was imported as a stored recipe.
    async fn record_import(&self, id: Uuid, recipe_id: Uuid) -> Result<(), JobStoreError>;
}

/// Storage for bulk import jobs.
#[async_trait]
pub trait BulkJobStore: Send + Sync {
    async fn insert(&self, job: BulkImportJob) -> Result<(), JobStoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<BulkImportJob>, JobStoreError>;
    async fn mark_processing(&self, id: Uuid) -> Result<(), JobStoreError>;

    /// Count one item outcome; counters update atomically under the
    /// store lock so the invariant holds at every read.
    async fn record_item(&self, id: Uuid, success: bool) -> Result<BulkImportJob, JobStoreError>;

    async fn finish(&self, id: Uuid) -> Result<BulkImportJob, JobStoreError>;
    async fn fail(&self, id: Uuid, message: String) -> Result<(), JobStoreError>;
}

/// In-memory store for both job kinds.
///
/// Data is lost on restart; job records are deliberately ephemeral
/// here, persistence being out of scope.
#[derive(Default)]
pub struct MemoryJobStore {
    video_jobs: RwLock<HashMap<Uuid, VideoJob>>,
    bulk_jobs: RwLock<HashMap<Uuid, BulkImportJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_video<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut VideoJob) -> Result<R, JobStoreError>,
    ) -> Result<R, JobStoreError> {
        let mut jobs = self.video_jobs.write().unwrap();
        let job = jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;
        f(job)
    }

    fn with_bulk<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut BulkImportJob) -> Result<R, JobStoreError>,
    ) -> Result<R, JobStoreError> {
        let mut jobs = self.bulk_jobs.write().unwrap();
        let job = jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;
        f(job)
    }
}

#[async_trait]
impl VideoJobStore for MemoryJobStore {
    async fn insert(&self, job: VideoJob) -> Result<(), JobStoreError> {
        self.video_jobs.write().unwrap().insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<VideoJob>, JobStoreError> {
        Ok(self.video_jobs.read().unwrap().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<VideoJob>, JobStoreError> {
        let mut jobs: Vec<VideoJob> = self.video_jobs.read().unwrap().values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn remove(&self, id: Uuid) -> Result<bool, JobStoreError> {
        Ok(self.video_jobs.write().unwrap().remove(&id).is_some())
    }

    async fn advance(&self, id: Uuid, to: VideoJobStatus) -> Result<VideoJob, JobStoreError> {
        self.with_video(id, |job| {
            job.transition(to)?;
            Ok(job.clone())
        })
    }

    async fn set_step(
        &self,
        id: Uuid,
        label: String,
        progress: Option<u8>,
    ) -> Result<(), JobStoreError> {
        self.with_video(id, |job| {
            if job.is_terminal() {
                // Late progress reports after completion/failure are dropped.
                return Ok(());
            }
            job.set_step(label);
            if let Some(value) = progress {
                job.observe_progress(value);
            }
            Ok(())
        })
    }

    async fn set_meta(&self, id: Uuid, meta: VideoMeta) -> Result<(), JobStoreError> {
        self.with_video(id, |job| {
            job.video_meta = Some(meta);
            Ok(())
        })
    }

    async fn set_frames(
        &self,
        id: Uuid,
        extracted: u32,
        with_text: u32,
    ) -> Result<(), JobStoreError> {
        self.with_video(id, |job| {
            job.frames_extracted = extracted;
            job.frames_with_text = with_text;
            Ok(())
        })
    }

    async fn finish(
        &self,
        id: Uuid,
        recipes: Vec<ExtractedRecipe>,
    ) -> Result<VideoJob, JobStoreError> {
        self.with_video(id, |job| {
            job.transition(VideoJobStatus::Completed)?;
            job.extracted_recipes = recipes;
            Ok(job.clone())
        })
    }

    async fn fail(&self, id: Uuid, message: String) -> Result<VideoJob, JobStoreError> {
        self.with_video(id, |job| {
            job.fail(message)?;
            Ok(job.clone())
        })
    }

    async fn request_cancel(&self, id: Uuid) -> Result<bool, JobStoreError> {
        self.with_video(id, |job| {
            if job.is_terminal() || job.cancel_requested {
                return Ok(false);
            }
            job.cancel_requested = true;
            Ok(true)
        })
    }

    async fn cancel_requested(&self, id: Uuid) -> Result<bool, JobStoreError> {
        self.with_video(id, |job| Ok(job.cancel_requested))
    }

    async fn record_import(&self, id: Uuid, recipe_id: Uuid) -> Result<(), JobStoreError> {
        self.with_video(id, |job| {
            if !job.imported_recipe_ids.contains(&recipe_id) {
                job.imported_recipe_ids.push(recipe_id);
            }
            Ok(())
        })
    }
}

#[async_trait]
impl BulkJobStore for MemoryJobStore {
    async fn insert(&self, job: BulkImportJob) -> Result<(), JobStoreError> {
        self.bulk_jobs.write().unwrap().insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<BulkImportJob>, JobStoreError> {
        Ok(self.bulk_jobs.read().unwrap().get(&id).cloned())
    }

    async fn mark_processing(&self, id: Uuid) -> Result<(), JobStoreError> {
        self.with_bulk(id, |job| {
            job.status = BulkImportStatus::Processing;
            job.started_at = Some(chrono::Utc::now());
            Ok(())
        })
    }

    async fn record_item(&self, id: Uuid, success: bool) -> Result<BulkImportJob, JobStoreError> {
        self.with_bulk(id, |job| {
            job.record_item(success)?;
            Ok(job.clone())
        })
    }

    async fn finish(&self, id: Uuid) -> Result<BulkImportJob, JobStoreError> {
        self.with_bulk(id, |job| {
            job.status = BulkImportStatus::Completed;
            job.completed_at = Some(chrono::Utc::now());
            Ok(job.clone())
        })
    }

    async fn fail(&self, id: Uuid, message: String) -> Result<(), JobStoreError> {
        self.with_bulk(id, |job| {
            job.status = BulkImportStatus::Failed;
            job.error_message = Some(message);
            job.completed_at = Some(chrono::Utc::now());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_request_is_idempotent() {
        let store = MemoryJobStore::new();
        let job = VideoJob::new("https://youtu.be/abc");
        let id = job.id;
        VideoJobStore::insert(&store, job).await.unwrap();

        assert!(store.request_cancel(id).await.unwrap());
        assert!(!store.request_cancel(id).await.unwrap());
        assert!(store.cancel_requested(id).await.unwrap());
    }

    #[tokio::test]
    async fn cancel_request_on_terminal_job_is_a_noop() {
        let store = MemoryJobStore::new();
        let job = VideoJob::new("https://youtu.be/abc");
        let id = job.id;
        VideoJobStore::insert(&store, job).await.unwrap();
        VideoJobStore::fail(&store, id, "boom".into()).await.unwrap();

        assert!(!store.request_cancel(id).await.unwrap());
    }

    #[tokio::test]
    async fn late_progress_after_terminal_is_dropped() {
        let store = MemoryJobStore::new();
        let job = VideoJob::new("https://youtu.be/abc");
        let id = job.id;
        VideoJobStore::insert(&store, job).await.unwrap();
        VideoJobStore::fail(&store, id, "boom".into()).await.unwrap();

        store
            .set_step(id, "Downloading 99%".into(), Some(90))
            .await
            .unwrap();
        let job = VideoJobStore::get(&store, id).await.unwrap().unwrap();
        assert_eq!(job.progress, 0);
        assert_eq!(job.current_step, None);
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let store = MemoryJobStore::new();
        let err = store.advance(Uuid::new_v4(), VideoJobStatus::Downloading).await;
        assert!(matches!(err, Err(JobStoreError::NotFound(_))));
    }
}
