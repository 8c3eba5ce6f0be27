//! Bulk import job model and batch processor.
//!
//! A batch iterates its items with bounded concurrency; one item's
//! failure is counted, never fatal. The whole job fails only on a
//! batch-level error (the worker itself breaking), so partial failures
//! still end `Completed` with a non-zero `failed_posts`.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::jobs::store::{BulkJobStore, JobStoreError};

/// Default cap on posts per batch; a guardrail against unbounded
/// resource consumption, enforced synchronously at submission.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkImportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A bulk import job record.
///
/// Invariants, held after every processed item:
/// `processed_posts == successful_posts + failed_posts`,
/// `processed_posts <= total_posts`, counters never decrease, and
/// `processed_posts == total_posts` once terminal (unless the batch
/// itself failed).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportJob {
    pub id: Uuid,
    pub status: BulkImportStatus,
    pub total_posts: u32,
    pub processed_posts: u32,
    pub successful_posts: u32,
    pub failed_posts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl BulkImportJob {
    pub fn new(total_posts: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: BulkImportStatus::Pending,
            total_posts,
            processed_posts: 0,
            successful_posts: 0,
            failed_posts: 0,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            BulkImportStatus::Completed | BulkImportStatus::Failed
        )
    }

    /// Count one item outcome. Panic-free: an over-count is refused.
    pub(crate) fn record_item(&mut self, success: bool) -> Result<(), JobStoreError> {
        if self.processed_posts >= self.total_posts {
            return Err(JobStoreError::Backend(format!(
                "job {} already processed all {} posts",
                self.id, self.total_posts
            )));
        }
        self.processed_posts += 1;
        if success {
            self.successful_posts += 1;
        } else {
            self.failed_posts += 1;
        }
        debug_assert_eq!(
            self.processed_posts,
            self.successful_posts + self.failed_posts
        );
        Ok(())
    }
}

/// Imports a single post; the seam the batch loop drives.
#[async_trait::async_trait]
pub trait PostImporter: Send + Sync {
    /// Import one post, returning the created recipe id.
    async fn import_post(&self, post_id: &str) -> anyhow::Result<Uuid>;
}

/// Errors reported synchronously at submission time.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("batch of {got} posts exceeds the {limit}-post limit")]
    BatchTooLarge { got: usize, limit: usize },

    #[error("batch contains no posts")]
    EmptyBatch,

    #[error(transparent)]
    Store(#[from] JobStoreError),
}

/// Runs bulk import batches in the background.
#[derive(Clone)]
pub struct BulkImportProcessor {
    store: Arc<dyn BulkJobStore>,
    importer: Arc<dyn PostImporter>,
    max_batch_size: usize,
    concurrency: usize,
}

impl BulkImportProcessor {
    pub fn new(store: Arc<dyn BulkJobStore>, importer: Arc<dyn PostImporter>) -> Self {
        Self {
            store,
            importer,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            concurrency: 1,
        }
    }

    /// Override the synchronous batch-size guardrail.
    pub fn with_max_batch_size(mut self, limit: usize) -> Self {
        self.max_batch_size = limit;
        self
    }

    /// Allow a small per-batch fan-out (default: sequential).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Validate and enqueue a batch. Returns immediately; processing is
    /// asynchronous.
    pub async fn submit(&self, post_ids: Vec<String>) -> Result<(Uuid, u32), SubmitError> {
        if post_ids.is_empty() {
            return Err(SubmitError::EmptyBatch);
        }
        if post_ids.len() > self.max_batch_size {
            return Err(SubmitError::BatchTooLarge {
                got: post_ids.len(),
                limit: self.max_batch_size,
            });
        }

        let total = post_ids.len() as u32;
        let job = BulkImportJob::new(total);
        let job_id = job.id;
        self.store.insert(job).await?;

        info!(job_id = %job_id, total_posts = total, "bulk import submitted");

        let processor = self.clone();
        tokio::spawn(async move {
            processor.run(job_id, post_ids).await;
        });

        Ok((job_id, total))
    }

    async fn run(&self, job_id: Uuid, post_ids: Vec<String>) {
        if let Err(e) = self.run_batch(job_id, &post_ids).await {
            error!(job_id = %job_id, error = %e, "bulk import batch failed");
            let _ = self.store.fail(job_id, e.to_string()).await;
        }
    }

    async fn run_batch(&self, job_id: Uuid, post_ids: &[String]) -> Result<(), JobStoreError> {
        self.store.mark_processing(job_id).await?;

        let mut outcomes = stream::iter(post_ids.iter().cloned())
            .map(|post_id| {
                let importer = self.importer.clone();
                async move {
                    let outcome = importer.import_post(&post_id).await;
                    (post_id, outcome)
                }
            })
            .buffer_unordered(self.concurrency);

        while let Some((post_id, outcome)) = outcomes.next().await {
            match outcome {
                Ok(recipe_id) => {
                    debug!(job_id = %job_id, post_id = %post_id, recipe_id = %recipe_id, "post imported");
                    self.store.record_item(job_id, true).await?;
                }
                Err(e) => {
                    warn!(job_id = %job_id, post_id = %post_id, error = %e, "post import failed");
                    self.store.record_item(job_id, false).await?;
                }
            }
        }

        let job = self.store.finish(job_id).await?;
        info!(
            job_id = %job_id,
            successful = job.successful_posts,
            failed = job.failed_posts,
            "bulk import completed"
        );
        Ok(())
    }
}
